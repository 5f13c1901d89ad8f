#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use waterbowl_api::config::ServerConfig;
use waterbowl_api::router::build_app_router;
use waterbowl_api::state::AppState;

const BOUNDARY: &str = "waterbowl-test-boundary";

/// Build a test `ServerConfig` storing crops under `pictures_dir`.
pub fn test_config(pictures_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8080".to_string()],
        request_timeout_secs: 30,
        pictures_dir: pictures_dir.to_path_buf(),
        json_logs: false,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and picture directory.
pub fn build_test_app(pool: PgPool, pictures_dir: &Path) -> Router {
    let config = test_config(pictures_dir);
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn patch_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a multipart form. `picture` is sent as a file part when present.
pub async fn post_capture(
    app: Router,
    picture: Option<&[u8]>,
    timestamp: Option<&str>,
) -> Response<Body> {
    let mut body = Vec::new();
    if let Some(bytes) = picture {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"picture\"; \
                 filename=\"capture.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(ts) = timestamp {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"timestamp\"\r\n\r\n{ts}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/pictures")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// A PNG capture large enough for both bowl crop windows.
pub fn capture_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(1920, 1300, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Upload a capture and return the new picture id.
pub async fn upload(pool: &PgPool, pictures_dir: &Path, timestamp: &str) -> i64 {
    let app = build_test_app(pool.clone(), pictures_dir);
    let response = post_capture(app, Some(&capture_png()), Some(timestamp)).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}
