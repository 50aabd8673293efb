use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{ImageResponse, MessageResponse},
    repo_types::{NewProduct, Product, ProductPatch},
};
use crate::{
    auth::MaybeAuthUser,
    bulk::{export_xlsx, import_rows, xlsx_download, MAX_IMPORT_BYTES},
    error::{AppError, AppResult},
    extract::{take_file, AppJson, AppMultipart, AppPath},
    images,
    spreadsheet::read_sheet,
    state::AppState,
    validation::Validate,
};

const NOT_FOUND: &str = "Product not found";

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/export", get(export_products))
        .route(
            "/products/import",
            post(import_products).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/products/:id/image",
            post(upload_image)
                .delete(delete_image)
                .layer(DefaultBodyLimit::max(images::MAX_IMAGE_BYTES)),
        )
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(Product::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<Product>> {
    let product = Product::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;
    Ok(Json(product))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    AppJson(mut payload): AppJson<NewProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    payload.normalize();
    payload
        .validate()
        .map_err(|details| AppError::invalid("Invalid product data", details))?;

    let product = Product::create(&state.db, &payload, user_id).await?;
    info!(product_id = product.id, ?user_id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(mut payload): AppJson<ProductPatch>,
) -> AppResult<Json<Product>> {
    payload.normalize();
    payload
        .validate()
        .map_err(|details| AppError::invalid("Invalid product data", details))?;

    let product = Product::update(&state.db, id, payload)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;
    info!(product_id = id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    if !Product::delete(&state.db, id).await? {
        return Err(AppError::NotFound(NOT_FOUND));
    }
    info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn export_products(State(state): State<AppState>) -> AppResult<Response> {
    let products = Product::list(&state.db).await?;
    let bytes = export_xlsx(&products)?;
    Ok(xlsx_download("products.xlsx", bytes))
}

#[instrument(skip(state, mp))]
pub async fn import_products(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    AppMultipart(mut mp): AppMultipart,
) -> AppResult<Response> {
    let upload = take_file(&mut mp, "file")
        .await?
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let sheet = read_sheet(
        upload.file_name.as_deref(),
        upload.content_type.as_deref(),
        &upload.bytes,
    )?;

    let db = &state.db;
    let summary = import_rows(&sheet, |product: NewProduct| async move {
        Product::create(db, &product, user_id).await
    })
    .await;

    Ok(Json(summary.to_json("products")?).into_response())
}

#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppMultipart(mut mp): AppMultipart,
) -> AppResult<Json<ImageResponse>> {
    let upload = take_file(&mut mp, "image")
        .await?
        .ok_or_else(|| AppError::BadRequest("No image file provided".into()))?;
    if !images::is_image(upload.content_type.as_deref()) {
        warn!(product_id = id, content_type = ?upload.content_type, "rejected non-image upload");
        return Err(AppError::BadRequest(
            "Not an image! Please upload only images.".into(),
        ));
    }

    let product = Product::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    let image_url = images::store_product_image(&state, id, upload).await?;
    if Product::set_image_url(&state.db, id, Some(&image_url))
        .await?
        .is_none()
    {
        // Deleted while the upload was in flight.
        images::discard_image(&state, id, &image_url).await;
        return Err(AppError::NotFound(NOT_FOUND));
    }
    if let Some(old) = product.image_url.as_deref() {
        images::discard_image(&state, id, old).await;
    }

    Ok(Json(ImageResponse {
        image_url,
        message: "Image uploaded successfully",
    }))
}

#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<MessageResponse>> {
    let product = Product::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    if let Some(old) = product.image_url.as_deref() {
        images::discard_image(&state, id, old).await;
    }
    Product::set_image_url(&state.db, id, None)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    Ok(Json(MessageResponse {
        message: "Image deleted successfully",
    }))
}
