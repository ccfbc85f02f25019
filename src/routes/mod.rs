pub mod auth;
pub mod items;

use std::path::Path;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::{AuthService, ItemsService};
use crate::storage::MAX_IMAGE_BYTES;

#[derive(Clone)]
pub struct AppState {
    pub items: ItemsService,
    pub auth: AuthService,
    pub jwt_secret: String,
}

pub fn router(state: AppState, upload_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/items", get(items::list).post(items::create))
        .route("/items/mine", get(items::list_mine))
        .route("/items/{id}", get(items::get).delete(items::delete))
        .route("/items/{id}/status", patch(items::update_status))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        // Multipart bodies carry up to a 5 MiB image plus the form fields
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
