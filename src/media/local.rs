use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    media::{classify_upload, MediaAsset, MediaKind, MediaStore},
};

/// Stores files on local disk. The router serves the directory at `/uploads`.
pub struct LocalMediaStore {
    uploads_dir: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub fn new(uploads_dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn uploads_dir(&self) -> &PathBuf {
        &self.uploads_dir
    }

    // Public ids are bare generated file names; anything else could escape
    // the uploads directory.
    fn resolve(&self, public_id: &str) -> Result<PathBuf> {
        let valid = !public_id.is_empty()
            && public_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !public_id.starts_with('.');
        if !valid {
            return Err(AppError::BadRequest("Invalid media id".to_string()));
        }
        Ok(self.uploads_dir.join(public_id))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn upload(&self, filename: &str, data: &[u8]) -> Result<MediaAsset> {
        let (kind, extension) = classify_upload(filename, data.len())?;

        fs::create_dir_all(&self.uploads_dir).await.map_err(|e| {
            AppError::Internal(format!("Failed to create uploads directory: {}", e))
        })?;

        let public_id = format!("{}.{}", Uuid::new_v4(), extension);
        let file_path = self.uploads_dir.join(&public_id);

        let mut file = fs::File::create(&file_path).await.map_err(|e| {
            AppError::Internal(format!("Failed to create file: {}", e))
        })?;

        file.write_all(data).await.map_err(|e| {
            AppError::Internal(format!("Failed to write file: {}", e))
        })?;

        tracing::debug!(public_id = %public_id, kind = kind.as_str(), "Stored upload on disk");

        Ok(MediaAsset {
            url: format!("{}/uploads/{}", self.base_url, public_id),
            public_id,
            kind,
        })
    }

    async fn delete(&self, public_id: &str, _kind: MediaKind) -> Result<()> {
        let path = self.resolve(public_id)?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            fs::remove_file(&path).await.map_err(|e| {
                AppError::Internal(format!("Failed to delete file: {}", e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalMediaStore {
        let dir = std::env::temp_dir().join(format!("lectern-media-{}", Uuid::new_v4()));
        LocalMediaStore::new(dir, "http://localhost:8080/")
    }

    #[tokio::test]
    async fn test_upload_then_delete() {
        let store = temp_store();
        let asset = store.upload("avatar.png", b"\x89PNG fake").await.unwrap();

        assert_eq!(asset.kind, MediaKind::Image);
        assert!(asset.public_id.ends_with(".png"));
        assert_eq!(asset.url, format!("http://localhost:8080/uploads/{}", asset.public_id));

        let path = store.uploads_dir().join(&asset.public_id);
        assert!(path.exists());

        store.delete(&asset.public_id, asset.kind).await.unwrap();
        assert!(!path.exists());

        // Deleting again is a no-op
        store.delete(&asset.public_id, asset.kind).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejects_path_traversal() {
        let store = temp_store();
        assert!(store.delete("../Cargo.toml", MediaKind::Image).await.is_err());
        assert!(store.delete("a/b.png", MediaKind::Image).await.is_err());
    }
}
