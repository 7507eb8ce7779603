//! Error taxonomy at the request boundary

use thiserror::Error;

use crate::http::UpstreamError;

/// Errors surfaced to callers of an upstream operation
#[derive(Error, Debug)]
pub enum ApiError {
    /// Required input missing or malformed; detected before any network call
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// HTTP status mirroring the outcome class
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::Upstream(_) => 500,
        }
    }

    /// Raw upstream response body, when the upstream answered
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            ApiError::Validation(_) => None,
            ApiError::Upstream(e) => e.body(),
        }
    }

    /// Short classification used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Upstream(e) => e.kind(),
        }
    }
}
