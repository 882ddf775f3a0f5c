//! Tencent Cloud adapter errors.

use thiserror::Error;

use shipyard_cert::AuthorityError;
use shipyard_release::ControlPlaneError;

#[derive(Debug, Error)]
pub enum TencentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{code}: {message} (request {request_id})")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type TencentResult<T> = Result<T, TencentError>;

impl From<TencentError> for ControlPlaneError {
    fn from(err: TencentError) -> Self {
        match err {
            TencentError::Api { code, message, .. } => ControlPlaneError::Rejected { code, message },
            TencentError::Http(e) => ControlPlaneError::Transport(e.to_string()),
            other => ControlPlaneError::Malformed(other.to_string()),
        }
    }
}

impl From<TencentError> for AuthorityError {
    fn from(err: TencentError) -> Self {
        match err {
            TencentError::Api { code, message, .. } => AuthorityError::Rejected { code, message },
            TencentError::Http(e) => AuthorityError::Transport(e.to_string()),
            other => AuthorityError::Malformed(other.to_string()),
        }
    }
}
