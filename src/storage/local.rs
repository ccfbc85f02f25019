use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

use super::ImageStore;

/// Disk-backed image store rooted at the uploads directory. Stored filenames
/// are generated server-side, so they never contain path separators.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub async fn new(root: impl AsRef<Path>) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create upload dir: {}", e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> AppResult<PathBuf> {
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(AppError::Storage(format!(
                "Invalid stored filename: {}",
                filename
            )));
        }
        Ok(self.root.join(filename))
    }
}

#[async_trait::async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, filename: &str, data: &[u8]) -> AppResult<()> {
        let path = self.path_for(filename)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", filename, e)))
    }

    async fn delete(&self, filename: &str) -> AppResult<()> {
        let path = self.path_for(filename)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete {}: {}", filename, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("lostfound-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let root = temp_root();
        let store = LocalImageStore::new(&root).await.unwrap();

        store.save("123-abc.png", b"pngdata").await.unwrap();
        let on_disk = tokio::fs::read(root.join("123-abc.png")).await.unwrap();
        assert_eq!(on_disk, b"pngdata");

        store.delete("123-abc.png").await.unwrap();
        assert!(tokio::fs::metadata(root.join("123-abc.png")).await.is_err());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_file_errors() {
        let root = temp_root();
        let store = LocalImageStore::new(&root).await.unwrap();
        assert!(store.delete("nope.png").await.is_err());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let root = temp_root();
        let store = LocalImageStore::new(&root).await.unwrap();
        assert!(store.save("../evil.png", b"x").await.is_err());
        assert!(store.delete("a/b.png").await.is_err());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
