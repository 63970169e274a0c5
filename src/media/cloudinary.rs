use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{
    config::CloudinaryConfig,
    error::{AppError, Result},
    media::{classify_upload, MediaAsset, MediaKind, MediaStore},
};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Signed uploads through Cloudinary's REST upload API.
pub struct CloudinaryStore {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, kind: MediaKind, action: &str) -> String {
        format!("{}/{}/{}/{}", API_BASE, self.config.cloud_name, kind.as_str(), action)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, the API secret appended, then SHA-256 hex.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, filename: &str, data: &[u8]) -> Result<MediaAsset> {
        let (kind, _) = classify_upload(filename, data.len())?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(&[("timestamp", timestamp.as_str())], &self.config.api_secret);

        let file = Part::bytes(data.to_vec()).file_name(filename.to_string());
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .http
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!("Cloudinary upload failed ({}): {}", status, body)));
        }

        let uploaded: UploadResponse = response.json().await?;
        tracing::debug!(public_id = %uploaded.public_id, kind = kind.as_str(), "Uploaded media to Cloudinary");

        Ok(MediaAsset {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            kind,
        })
    }

    async fn delete(&self, public_id: &str, kind: MediaKind) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let form = Form::new()
            .text("public_id", public_id.to_string())
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .http
            .post(self.endpoint(kind, "destroy"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::External(format!("Cloudinary destroy failed ({})", status)));
        }

        let destroyed: DestroyResponse = response.json().await?;
        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                tracing::warn!(public_id, "Cloudinary asset already gone");
                Ok(())
            }
            other => Err(AppError::External(format!("Cloudinary destroy returned {}", other))),
        }
    }
}
