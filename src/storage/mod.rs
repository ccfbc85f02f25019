// Blob storage for uploaded item images.

pub mod local;

pub use local::LocalImageStore;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Hard cap on uploaded image size (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Storage backend abstraction for image blobs.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Write a blob under the given stored filename.
    async fn save(&self, filename: &str, data: &[u8]) -> AppResult<()>;

    /// Remove a stored blob.
    async fn delete(&self, filename: &str) -> AppResult<()>;
}

/// Extension of an uploaded filename, lowercased. None if there is no extension.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Reject uploads that are not images in an allowed format or exceed the size cap.
pub fn check_image(filename: &str, content_type: &str, len: usize) -> AppResult<()> {
    let ext = file_extension(filename)
        .ok_or_else(|| AppError::Validation("Only image files are allowed".to_string()))?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str())
        || !ALLOWED_CONTENT_TYPES.contains(&content_type.to_ascii_lowercase().as_str())
    {
        return Err(AppError::Validation(
            "Only image files are allowed".to_string(),
        ));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(AppError::Validation(
            "Image exceeds the 5MB size limit".to_string(),
        ));
    }
    Ok(())
}

/// Stored filename for an upload: millisecond timestamp prefix plus a random
/// suffix, keeping the original extension. Unpredictable, collision-free.
pub fn generate_filename(original: &str) -> String {
    let ext = file_extension(original).unwrap_or_else(|| "bin".to_string());
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        ext
    )
}
