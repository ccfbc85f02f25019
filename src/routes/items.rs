use std::str::FromStr;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthenticatedUser;
use crate::models::{Category, ItemKind, ItemResponse, ItemStatus};
use crate::services::items_service::{ItemFilter, NewItemParams, UploadedImage};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ItemResponse>>> {
    let mut filter = ItemFilter {
        search: query.search,
        ..Default::default()
    };

    // Filter values outside the enums can never match a stored row
    if let Some(kind) = query.kind.as_deref().filter(|s| !s.is_empty()) {
        match ItemKind::from_str(kind) {
            Ok(k) => filter.kind = Some(k),
            Err(()) => return Ok(Json(Vec::new())),
        }
    }
    if let Some(category) = query.category.as_deref().filter(|s| !s.is_empty()) {
        match Category::from_str(category) {
            Ok(c) => filter.category = Some(c),
            Err(()) => return Ok(Json(Vec::new())),
        }
    }

    let items = state.items.list(&filter).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ItemResponse>> {
    let item = state.items.get(id).await?;
    Ok(Json(item.into()))
}

pub async fn list_mine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ItemResponse>>> {
    let items = state.items.list_mine(user.id).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let mut params = NewItemParams::default();
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => params.title = Some(read_text(field).await?),
            "description" => params.description = Some(read_text(field).await?),
            "category" => params.category = Some(read_text(field).await?),
            "kind" => params.kind = Some(read_text(field).await?),
            "location" => params.location = Some(read_text(field).await?),
            "date" => params.date = Some(read_text(field).await?),
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?.to_vec();
                // An empty file input submitted without a selection is not an attachment
                if !filename.is_empty() {
                    image = Some(UploadedImage {
                        filename,
                        content_type,
                        data,
                    });
                }
            }
            _ => {}
        }
    }

    let item = state.items.create(user.id, &params, image).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> AppResult<Json<ItemResponse>> {
    let status = ItemStatus::from_str(&body.status)
        .map_err(|_| AppError::Validation("status must be 'active' or 'resolved'".to_string()))?;
    let item = state.items.update_status(id, user.id, status).await?;
    Ok(Json(item.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.items.delete(id, user.id).await?;
    Ok(Json(json!({ "message": "Item deleted successfully" })))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}

/// A body blowing through the request size limit surfaces mid-read; report it
/// with the same error shape as the per-image size check.
fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation("Image exceeds the 5MB size limit".to_string())
    } else {
        AppError::Validation(format!("Malformed form data: {}", e))
    }
}
