use crate::ebay::FindingError;
use crate::llm::VisionError;
use crate::models::ApiError;
use crate::storage::StorageError;
use crate::store::StoreError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    InvalidInput,
    Unauthorized,
    NotFound,
    Conflict,
    MissingConfig,
    Upstream,
    Internal,
}

impl ServiceErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ServiceErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
            ServiceErrorKind::Conflict => StatusCode::CONFLICT,
            ServiceErrorKind::MissingConfig
            | ServiceErrorKind::Upstream
            | ServiceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Request-terminating failure. `message` is shown to the caller, `detail`
/// only reaches the server log.
#[derive(Debug, Error)]
#[error("{scope}: {message}")]
pub struct ServiceError {
    scope: &'static str,
    message: String,
    detail: Option<String>,
    kind: ServiceErrorKind,
}

impl ServiceError {
    fn new(scope: &'static str, kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            scope,
            message: message.into(),
            detail: None,
            kind,
        }
    }

    pub fn invalid_input(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ServiceErrorKind::InvalidInput, message)
    }

    pub fn unauthorized(scope: &'static str) -> Self {
        Self::new(scope, ServiceErrorKind::Unauthorized, "unauthorized")
    }

    pub fn not_found(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ServiceErrorKind::NotFound, message)
    }

    pub fn conflict(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ServiceErrorKind::Conflict, message)
    }

    pub fn missing_config(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ServiceErrorKind::MissingConfig, message)
    }

    pub fn upstream(
        scope: &'static str,
        message: impl Into<String>,
        detail: impl ToString,
    ) -> Self {
        Self {
            detail: Some(detail.to_string()),
            ..Self::new(scope, ServiceErrorKind::Upstream, message)
        }
    }

    pub fn internal(scope: &'static str, message: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            detail: Some(detail.to_string()),
            ..Self::new(scope, ServiceErrorKind::Internal, message)
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        match self.kind {
            ServiceErrorKind::Upstream | ServiceErrorKind::Internal => error!(
                target = "crosslist.api",
                scope = self.scope,
                detail = self.detail.as_deref().unwrap_or(""),
                "{}",
                self.message
            ),
            ServiceErrorKind::MissingConfig => {
                warn!(target = "crosslist.api", scope = self.scope, "{}", self.message)
            }
            _ => {}
        }
        let payload = ApiError {
            error: self.message,
            detail: Some(self.scope.to_string()),
        };
        (status, Json(payload)).into_response()
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::invalid_input(
            "request",
            format!("Invalid JSON body: {}", rejection.body_text()),
        )
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Exists(sku) => {
                ServiceError::conflict("batches", format!("Batch {sku} already exists"))
            }
            other => ServiceError::internal("batches", "Batch store failure", other),
        }
    }
}

impl From<VisionError> for ServiceError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::MissingKey => ServiceError::missing_config("listing", "Missing OpenAI API key"),
            other => ServiceError::upstream("listing", "AI generation failed", other),
        }
    }
}

impl From<FindingError> for ServiceError {
    fn from(err: FindingError) -> Self {
        match err {
            FindingError::MissingAppId => ServiceError::missing_config("comps", "Missing EBAY_APP_ID"),
            other => ServiceError::upstream("comps", "Failed to fetch comps", other),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingCredentials(name) => {
                warn!(target = "crosslist.storage", missing = name, "storage_unconfigured");
                ServiceError::missing_config("upload", "Missing storage credentials")
            }
            other => ServiceError::upstream("upload", "Upload failed", other),
        }
    }
}
