use thiserror::Error;

use crate::api::ApiError;
use crate::store::StorageError;

/// Outcome tag handed to consumers; transport and storage types stay inside
/// the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Network unavailable: {0}")]
    Network(String),

    #[error("Not signed in or session expired")]
    Auth,

    #[error("Unexpected data from server: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Unknown(String),
}

impl RepositoryError {
    /// Whether trying again later could succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Network(_))
    }
}

impl From<ApiError> for RepositoryError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => RepositoryError::Auth,
            ApiError::Network(e) => RepositoryError::Network(e.to_string()),
            ApiError::RateLimited => RepositoryError::Network(err.to_string()),
            ApiError::Decode { .. } => RepositoryError::Decode(err.to_string()),
            ApiError::NotFound(detail) => RepositoryError::NotFound(detail),
            ApiError::AccessDenied(_)
            | ApiError::ServerError(_)
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidRequest(_) => RepositoryError::Unknown(err.to_string()),
        }
    }
}

impl From<StorageError> for RepositoryError {
    fn from(err: StorageError) -> Self {
        RepositoryError::Unknown(err.to_string())
    }
}
