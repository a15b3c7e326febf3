use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::domain::EntityKind;
use super::repository::{AuthError, StorageError, StoreError};
use crate::config::ConfigError;

/// Single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulates every field problem found in a request so callers see all of
/// them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("validation failed ({})", joined(.0))]
pub struct ValidationErrors(Vec<FieldError>);

fn joined(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.field, error.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Error raised by the marketplace services.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("authentication required")]
    Unauthorized,
    #[error("admin capability required")]
    Forbidden,
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
    #[error("storage failure: {0}")]
    Storage(StorageError),
    #[error("identity lookup failure: {0}")]
    Identity(AuthError),
    #[error(transparent)]
    Config(ConfigError),
}

impl MarketplaceError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable category keys a UI can map to localized messages.
    pub const fn category(&self) -> &'static str {
        match self {
            MarketplaceError::Unauthorized => "unauthorized",
            MarketplaceError::Forbidden => "forbidden",
            MarketplaceError::Validation(_) => "validation_failed",
            MarketplaceError::NotFound { .. } => "not_found",
            MarketplaceError::Persistence(_)
            | MarketplaceError::Storage(_)
            | MarketplaceError::Identity(_)
            | MarketplaceError::Config(_) => "internal_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::Unauthorized => StatusCode::UNAUTHORIZED,
            MarketplaceError::Forbidden => StatusCode::FORBIDDEN,
            MarketplaceError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketplaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketplaceError::Persistence(_)
            | MarketplaceError::Storage(_)
            | MarketplaceError::Identity(_)
            | MarketplaceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for MarketplaceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Config(err) => Self::Config(err),
            other => Self::Persistence(other),
        }
    }
}

impl From<StorageError> for MarketplaceError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Config(err) => Self::Config(err),
            other => Self::Storage(other),
        }
    }
}

impl From<AuthError> for MarketplaceError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Config(err) => Self::Config(err),
            other => Self::Identity(other),
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.category();

        let body = match &self {
            MarketplaceError::Validation(errors) => json!({
                "error": category,
                "message": "request failed validation",
                "fields": errors,
            }),
            MarketplaceError::Persistence(_)
            | MarketplaceError::Storage(_)
            | MarketplaceError::Identity(_)
            | MarketplaceError::Config(_) => {
                error!(error = %self, "request failed on a backing service");
                json!({
                    "error": category,
                    "message": "something went wrong, please try again later",
                })
            }
            other => json!({
                "error": category,
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
