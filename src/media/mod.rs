use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub mod cloudinary;
pub mod local;

pub use cloudinary::CloudinaryStore;
pub use local::LocalMediaStore;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];

/// Maximum image size (10 MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum video size (100 MB)
pub const MAX_VIDEO_SIZE: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    pub fn max_size(self) -> usize {
        match self {
            MediaKind::Image => MAX_IMAGE_SIZE,
            MediaKind::Video => MAX_VIDEO_SIZE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub url: String,
    pub public_id: String,
    pub kind: MediaKind,
}

/// Checks extension and size. Returns the kind and the lowercased extension.
pub fn classify_upload(filename: &str, size: usize) -> Result<(MediaKind, String)> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or_else(|| AppError::Validation("Invalid filename".to_string()))?;

    let kind = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Image
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Video
    } else {
        return Err(AppError::Validation(format!(
            "Invalid file type. Allowed: {}, {}",
            IMAGE_EXTENSIONS.join(", "),
            VIDEO_EXTENSIONS.join(", ")
        )));
    };

    if size == 0 {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if size > kind.max_size() {
        return Err(AppError::Validation(format!(
            "File too large (max {} MB)",
            kind.max_size() / (1024 * 1024)
        )));
    }

    Ok((kind, extension))
}

/// Where uploaded images and lecture videos live.
#[async_trait]
pub trait MediaStore: Send + Sync {
    fn name(&self) -> &str;
    async fn upload(&self, filename: &str, data: &[u8]) -> Result<MediaAsset>;
    async fn delete(&self, public_id: &str, kind: MediaKind) -> Result<()>;
}
