use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::PublicUser;
use crate::services::auth_service::AuthSession;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: String,
    pub user: PublicUser,
}

impl From<AuthSession> for AuthResponse {
    fn from(s: AuthSession) -> Self {
        AuthResponse {
            token: s.token,
            expires_at: s.expires_at.to_rfc3339(),
            user: s.user,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let session = state
        .auth
        .register(&body.name, &body.email, &body.phone, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(session.into()))
}
