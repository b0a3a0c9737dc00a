use async_trait::async_trait;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::config::CloudinaryConfig;
use crate::models::HostedAsset;
use crate::utils::{AppError, AppResult};

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Remote file storage for patient photos and QR codes.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// `file` is a data URI or a remote URL; the store fetches or decodes it.
    async fn upload(&self, file: &str, folder: &str) -> AppResult<HostedAsset>;
    async fn destroy(&self, public_id: &str) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct CloudinaryClient {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", CLOUDINARY_API_BASE, self.config.cloud_name, action)
    }

    fn ensure_configured(&self) -> AppResult<()> {
        if self.config.cloud_name.is_empty() || self.config.api_key.is_empty() || self.config.api_secret.is_empty() {
            return Err(AppError::Internal("Cloudinary credentials are not configured".into()));
        }
        Ok(())
    }
}

/// Signs request parameters: `k=v` pairs sorted by key, joined with `&`,
/// followed by the API secret, SHA-1 hex encoded.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Recovers the public id from a delivery URL such as
/// `https://res.cloudinary.com/demo/image/upload/v1712/asha/patients/abc.jpg`.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, after_upload) = url.split_once("/upload/")?;
    let mut segments: Vec<&str> = after_upload.split('/').collect();

    if let Some(first) = segments.first() {
        let is_version = first.len() > 1
            && first.starts_with('v')
            && first[1..].chars().all(|c| c.is_ascii_digit());
        if is_version {
            segments.remove(0);
        }
    }

    let path = segments.join("/");
    let without_ext = match path.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => path,
    };

    if without_ext.is_empty() {
        None
    } else {
        Some(without_ext)
    }
}

#[async_trait]
impl AssetStore for CloudinaryClient {
    async fn upload(&self, file: &str, folder: &str) -> AppResult<HostedAsset> {
        self.ensure_configured()?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        log::info!("☁️  Uploading asset to Cloudinary folder {}", folder);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .form(&[
                ("file", file),
                ("folder", folder),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Cloudinary upload failed: {} {}", status, body);
            return Err(AppError::Upstream(format!("Cloudinary upload failed: {}", status)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Cloudinary response: {}", e)))?;

        log::info!("✅ Uploaded asset {}", uploaded.public_id);

        Ok(HostedAsset {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> AppResult<()> {
        self.ensure_configured()?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Cloudinary destroy failed: {}",
                response.status()
            )));
        }

        let outcome: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Cloudinary response: {}", e)))?;

        match outcome.result.as_str() {
            "ok" => {
                log::info!("🗑️ Deleted asset {}", public_id);
                Ok(())
            }
            "not found" => {
                log::warn!("⚠️  Asset {} was already gone", public_id);
                Ok(())
            }
            other => Err(AppError::Upstream(format!("Cloudinary destroy returned {}", other))),
        }
    }
}
