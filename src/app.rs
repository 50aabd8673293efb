use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    auth,
    config::StorageConfig,
    ingredients, products,
    state::AppState,
    storage::LOCAL_PUBLIC_PREFIX,
};

pub fn build_app(state: AppState) -> Router {
    let mut app = Router::new().nest(
        "/api",
        Router::new()
            .merge(auth::router())
            .merge(products::router())
            .merge(ingredients::router())
            .route("/health", get(health)),
    );

    if let StorageConfig::Local { dir } = &state.config.storage {
        app = app.nest_service(LOCAL_PUBLIC_PREFIX, ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "----elabel-test-boundary";

    async fn call(req: Request<Body>) -> (StatusCode, Value) {
        let res = build_app(AppState::fake()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(
        uri: &str,
        field: &str,
        file_name: &str,
        content_type: &str,
        data: &str,
    ) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             {data}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let req = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn me_requires_token() {
        let req = Request::get("/api/auth/me").body(Body::empty()).unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing Authorization header");
    }

    #[tokio::test]
    async fn register_rejects_mismatched_passwords() {
        let req = json_request(
            "POST",
            "/api/auth/register",
            json!({
                "username": "cellar",
                "email": "cellar@domaine.fr",
                "password": "secret1",
                "confirmPassword": "secret2"
            }),
        );
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "confirmPassword");
        assert_eq!(body["details"][0]["message"], "Passwords don't match");
    }

    #[tokio::test]
    async fn confirm_email_without_token_is_bad_request() {
        let req = Request::get("/api/auth/confirm-email").body(Body::empty()).unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Token is required");
    }

    #[tokio::test]
    async fn create_product_requires_name() {
        let req = json_request("POST", "/api/products", json!({ "name": "  ", "sku": "R-1" }));
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid product data");
        assert_eq!(body["details"][0]["message"], "Name is required");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = Request::post("/api/ingredients")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn update_ingredient_rejects_blank_name() {
        let req = json_request("PUT", "/api/ingredients/1", json!({ "name": "" }));
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid ingredient data");
    }

    #[tokio::test]
    async fn import_without_file_field() {
        let req = multipart_request(
            "/api/products/import",
            "other",
            "a.csv",
            "text/csv",
            "name\nx",
        );
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn import_rejects_non_spreadsheet() {
        let req = multipart_request(
            "/api/ingredients/import",
            "file",
            "label.pdf",
            "application/pdf",
            "%PDF-1.4",
        );
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Please upload only Excel or CSV files"));
    }

    #[tokio::test]
    async fn import_reports_rows_without_name() {
        let req = multipart_request(
            "/api/products/import",
            "file",
            "products.csv",
            "text/csv",
            "Name,SKU\n,R-1\n\n  ,R-2",
        );
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["imported"], 0);
        assert_eq!(
            body["errors"],
            json!(["Row 2: Name is required", "Row 3: Name is required"])
        );
        assert_eq!(body["products"], json!([]));
    }

    #[tokio::test]
    async fn non_numeric_id_is_json_bad_request() {
        let req = Request::get("/api/products/abc").body(Body::empty()).unwrap();
        let res = build_app(AppState::fake()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("Cannot parse"));
    }

    #[tokio::test]
    async fn import_without_multipart_body_is_json_bad_request() {
        let req = json_request("POST", "/api/products/import", json!({ "name": "Rosé" }));
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn image_upload_without_body_is_json_bad_request() {
        let req = Request::post("/api/products/1/image").body(Body::empty()).unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn image_upload_rejects_non_image() {
        let req = multipart_request(
            "/api/products/1/image",
            "image",
            "a.pdf",
            "application/pdf",
            "%PDF-1.4",
        );
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Not an image! Please upload only images.");
    }

    #[tokio::test]
    async fn image_upload_requires_image_field() {
        let req = multipart_request(
            "/api/products/1/image",
            "photo",
            "label.png",
            "image/png",
            "png",
        );
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image file provided");
    }

    #[tokio::test]
    async fn oversized_image_is_rejected() {
        let data = "x".repeat(6 * 1024 * 1024);
        let req = multipart_request("/api/products/1/image", "image", "big.png", "image/png", &data);
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Uploaded file is too large");
    }

    #[tokio::test]
    async fn oversized_import_is_rejected() {
        let data = format!("Name\n{}", "x".repeat(11 * 1024 * 1024));
        let req = multipart_request("/api/ingredients/import", "file", "big.csv", "text/csv", &data);
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Uploaded file is too large");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let req = Request::get("/api/wines").body(Body::empty()).unwrap();
        let (status, _) = call(req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
