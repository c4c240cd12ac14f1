//! Error types for the caching engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the caching engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No provider is registered under the requested name
    #[error("Cache provider not found: {0}")]
    ProviderNotFound(String),

    /// The caller-supplied value factory failed on the foreground path
    #[error(transparent)]
    Factory(anyhow::Error),

    /// A wildcard or regular expression could not be compiled
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A value could not be converted to or from its cached form
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Engine or registry misconfiguration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend failure reported by a provider.
    ///
    /// The in-memory provider never fails; this is the error external
    /// [`CacheProvider`](crate::provider::CacheProvider) implementations
    /// return when their backend is unreachable. Served as 503.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl CacheError {
    /// Wraps a factory error without altering its message.
    pub fn factory(err: impl Into<anyhow::Error>) -> Self {
        CacheError::Factory(err.into())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::ProviderNotFound(_) | CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidPattern { .. }
            | CacheError::InvalidRequest(_)
            | CacheError::Configuration(_) => StatusCode::BAD_REQUEST,
            CacheError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Factory(_) | CacheError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching engine.
pub type Result<T> = std::result::Result<T, CacheError>;
