//! Certificate workflow errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by a [`CertificateAuthority`](crate::CertificateAuthority).
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("certificate service rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("certificate service unreachable: {0}")]
    Transport(String),

    #[error("unexpected certificate service response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum CertError {
    #[error("failed to read local certificate {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid domain configuration: {0}")]
    DomainConfig(#[from] serde_json::Error),

    #[error("failed to run acme.sh at {path}: {source}")]
    Acme {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("certificate service failed for {domain}: {source}")]
    Authority {
        domain: String,
        #[source]
        source: AuthorityError,
    },

    #[error("{failed} of {total} domain(s) failed to renew")]
    Incomplete { failed: usize, total: usize },
}

pub type CertResult<T> = Result<T, CertError>;
