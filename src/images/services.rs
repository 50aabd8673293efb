use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{extract::Upload, state::AppState};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Only `image/*` uploads are accepted.
pub fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Extension for the stored object: from the mime type, else the original
/// file name, else `bin`.
fn extension(upload: &Upload) -> String {
    if let Some(ext) = upload.content_type.as_deref().and_then(ext_from_mime) {
        return ext.to_string();
    }
    upload
        .file_name
        .as_deref()
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

pub fn object_key(product_id: i32, upload: &Upload) -> String {
    format!("{}{}.{}", key_prefix(product_id), Uuid::new_v4(), extension(upload))
}

/// Writes the image to the object store and returns its public URL.
pub async fn store_product_image(
    st: &AppState,
    product_id: i32,
    upload: Upload,
) -> anyhow::Result<String> {
    let key = object_key(product_id, &upload);
    let content_type = upload
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    let size = upload.bytes.len();
    st.storage
        .put_object(&key, upload.bytes, &content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    info!(product_id, %key, size, "product image stored");
    Ok(st.storage.public_url(&key))
}

fn key_prefix(product_id: i32) -> String {
    format!("products/{product_id}/")
}

/// Deletes the object behind a previously issued image URL. Only objects
/// stored for `product_id` are touched. Failures are logged and swallowed.
pub async fn discard_image(st: &AppState, product_id: i32, image_url: &str) {
    let Some(key) = st.storage.key_for_url(image_url) else {
        warn!(%image_url, "image url not owned by storage; leaving it");
        return;
    };
    if !key.starts_with(&key_prefix(product_id)) {
        warn!(product_id, %key, "image belongs to another product; leaving it");
        return;
    }
    if let Err(e) = st.storage.delete_object(&key).await {
        warn!(error = %e, %key, "failed to delete image object");
    }
}
