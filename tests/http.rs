//! Router-level tests that exercise the HTTP surface without a live database:
//! the pool is constructed lazily, and every request here is rejected before a
//! connection would be needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use lostfound_api::routes::{router, AppState};
use lostfound_api::services::auth_service::Claims;
use lostfound_api::services::{AuthService, ItemsService};
use lostfound_api::storage::{LocalImageStore, MAX_IMAGE_BYTES};

const JWT_SECRET: &str = "test-secret";

fn bearer_token(user_id: uuid::Uuid) -> String {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn test_router() -> (Router, std::path::PathBuf) {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/lostfound_test")
        .unwrap();
    let upload_dir =
        std::env::temp_dir().join(format!("lostfound-http-{}", uuid::Uuid::new_v4()));
    let store = LocalImageStore::new(&upload_dir).await.unwrap();

    let state = AppState {
        items: ItemsService::new(pool.clone(), Arc::new(store)),
        auth: AuthService::new(pool, JWT_SECRET.to_string()),
        jwt_secret: JWT_SECRET.to_string(),
    };
    (router(state, &upload_dir), upload_dir)
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_without_token_is_401() {
    let (app, dir) = test_router().await;

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/items")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);
    let body = json_body(res).await;
    assert_eq!(body["message"], "Authentication required");

    tokio::fs::remove_dir_all(dir).await.unwrap();
}

#[tokio::test]
async fn status_update_with_garbage_token_is_401() {
    let (app, dir) = test_router().await;

    let res = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/items/8c2f6f0a-2c1a-4a3b-9a57-2f6a1f1b0c0d/status")
                .header("authorization", "Bearer not-a-jwt")
                .header("content-type", "application/json")
                .body(Body::from("{\"status\":\"resolved\"}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);
    let body = json_body(res).await;
    assert_eq!(body["message"], "Invalid or expired token");

    tokio::fs::remove_dir_all(dir).await.unwrap();
}

#[tokio::test]
async fn my_items_without_token_is_401() {
    let (app, dir) = test_router().await;

    let res = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/items/mine")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);

    tokio::fs::remove_dir_all(dir).await.unwrap();
}

#[tokio::test]
async fn delete_without_token_is_401() {
    let (app, dir) = test_router().await;

    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/items/8c2f6f0a-2c1a-4a3b-9a57-2f6a1f1b0c0d")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);

    tokio::fs::remove_dir_all(dir).await.unwrap();
}

#[tokio::test]
async fn oversized_upload_reports_size_limit_as_json() {
    let (app, dir) = test_router().await;
    let token = bearer_token(uuid::Uuid::new_v4());

    // A single image part large enough to blow through the request body limit
    let boundary = "X-LOSTFOUND-TEST";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"image\"; \
             filename=\"big.png\"\r\ncontent-type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&vec![b'a'; MAX_IMAGE_BYTES + 128 * 1024]);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/items")
                .header("authorization", format!("Bearer {}", token))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["message"], "Image exceeds the 5MB size limit");

    tokio::fs::remove_dir_all(dir).await.unwrap();
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, dir) = test_router().await;

    let res = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 404);

    tokio::fs::remove_dir_all(dir).await.unwrap();
}
