//! CV and profile image uploads.

use std::sync::Arc;

use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use tracing::{info, warn};

use super::auth::require_actor;
use super::error::{MarketplaceError, ValidationErrors};
use super::listings::CV_LINK_TTL;
use super::repository::{Actor, Bucket, FileStore, MarketplaceStore};

pub const FILE_FIELD: &str = "file";
const MAX_NAME_CHARS: usize = 100;
const TOKEN_CHARS: usize = 12;

/// What a bucket accepts.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub bucket: Bucket,
    pub allowed_types: &'static [&'static str],
    pub max_bytes: usize,
}

pub const CV_POLICY: UploadPolicy = UploadPolicy {
    bucket: Bucket::Cvs,
    allowed_types: &["application/pdf"],
    max_bytes: 5 * 1024 * 1024,
};

pub const PROFILE_IMAGE_POLICY: UploadPolicy = UploadPolicy {
    bucket: Bucket::ProfileImages,
    allowed_types: &["image/jpeg", "image/png", "image/webp"],
    max_bytes: 2 * 1024 * 1024,
};

impl UploadPolicy {
    /// Content type must be allowlisted and the payload within the ceiling.
    /// Returns the normalized content type.
    pub fn check(&self, file: &UploadedFile) -> Result<String, UploadError> {
        let content_type = file.resolved_content_type();
        match content_type {
            Some(essence) if self.allowed_types.contains(&essence.as_str()) => {
                if file.bytes.is_empty() {
                    return Err(UploadError::Empty);
                }
                if file.bytes.len() > self.max_bytes {
                    return Err(UploadError::TooLarge {
                        size: file.bytes.len(),
                        limit_mb: self.max_bytes / (1024 * 1024),
                    });
                }
                Ok(essence)
            }
            other => Err(UploadError::UnsupportedType {
                found: other.unwrap_or_else(|| "unknown".to_string()),
                expected: self.allowed_types.join(", "),
            }),
        }
    }
}

/// Policy violations, reported to clients as field errors on `file`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("multipart body has no 'file' field")]
    MissingFile,
    #[error("content type {found} is not accepted (expected {expected})")]
    UnsupportedType { found: String, expected: String },
    #[error("file is {size} bytes; the limit is {limit_mb} MB")]
    TooLarge { size: usize, limit_mb: usize },
    #[error("file is empty")]
    Empty,
    #[error("unreadable multipart body: {0}")]
    Malformed(String),
}

impl From<UploadError> for ValidationErrors {
    fn from(value: UploadError) -> Self {
        ValidationErrors::single(FILE_FIELD, value.to_string())
    }
}

impl From<UploadError> for MarketplaceError {
    fn from(value: UploadError) -> Self {
        MarketplaceError::Validation(value.into())
    }
}

/// A single file taken from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Declared type without parameters, falling back to a guess from the
    /// file name when the client sent none.
    pub fn resolved_content_type(&self) -> Option<String> {
        let declared = self
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        match declared {
            Some(raw) => raw
                .parse::<mime::Mime>()
                .ok()
                .map(|mime| mime.essence_str().to_ascii_lowercase()),
            None => mime_guess::from_path(&self.file_name)
                .first()
                .map(|mime| mime.essence_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    pub bucket: Bucket,
    pub path: String,
    pub url: String,
}

/// Keeps `[A-Za-z0-9._-]`, replaces everything else with `_`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// `{unix_millis}-{random token}-{sanitized name}`.
pub fn storage_path(file_name: &str) -> String {
    let token = Alphanumeric.sample_string(&mut rand::rng(), TOKEN_CHARS);
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        token,
        sanitize_file_name(file_name)
    )
}

pub struct UploadService {
    store: Arc<dyn MarketplaceStore>,
    files: Arc<dyn FileStore>,
}

impl UploadService {
    pub fn new(store: Arc<dyn MarketplaceStore>, files: Arc<dyn FileStore>) -> Self {
        Self { store, files }
    }

    /// CVs land in the private bucket; the response carries a short-lived link
    /// and the path the application form should reference.
    pub async fn upload_cv(&self, file: UploadedFile) -> Result<StoredUpload, MarketplaceError> {
        let content_type = CV_POLICY.check(&file)?;
        let path = storage_path(&file.file_name);
        self.files
            .upload(CV_POLICY.bucket, &path, file.bytes, &content_type)
            .await?;
        let url = self
            .files
            .signed_url(CV_POLICY.bucket, &path, CV_LINK_TTL)
            .await?;
        info!(path = %path, "cv uploaded");
        Ok(StoredUpload {
            bucket: CV_POLICY.bucket,
            path,
            url,
        })
    }

    /// Profile images are public. When the caller already has a talent
    /// profile, it is pointed at the new image.
    pub async fn upload_profile_image(
        &self,
        file: UploadedFile,
        actor: Option<&Actor>,
    ) -> Result<StoredUpload, MarketplaceError> {
        let actor = require_actor(actor)?;
        let content_type = PROFILE_IMAGE_POLICY.check(&file)?;
        let path = format!(
            "{}/{}",
            sanitize_file_name(&actor.user_id),
            storage_path(&file.file_name)
        );
        self.files
            .upload(PROFILE_IMAGE_POLICY.bucket, &path, file.bytes, &content_type)
            .await?;
        let url = self.files.public_url(PROFILE_IMAGE_POLICY.bucket, &path)?;

        match self.store.talent_for_user(&actor.user_id).await {
            Ok(Some(talent)) => {
                self.store
                    .update_talent_profile_image(&talent.id, &url)
                    .await?;
                info!(talent_id = %talent.id, "profile image updated");
            }
            Ok(None) => info!(user_id = %actor.user_id, "profile image stored without a talent profile"),
            Err(err) => {
                warn!(user_id = %actor.user_id, error = %err, "talent lookup failed after image upload");
                return Err(err.into());
            }
        }

        Ok(StoredUpload {
            bucket: PROFILE_IMAGE_POLICY.bucket,
            path,
            url,
        })
    }
}
