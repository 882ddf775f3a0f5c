//! Upload error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by an [`ObjectStore`](crate::ObjectStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store rejected {key}: {message}")]
    Rejected { key: String, message: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that stop a batch upload before or after it runs.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("source path {0} is not a file or folder")]
    SourceNotFound(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{failed} of {total} file(s) failed to upload")]
    Incomplete { failed: usize, total: usize },
}

pub type UploadResult<T> = Result<T, UploadError>;
