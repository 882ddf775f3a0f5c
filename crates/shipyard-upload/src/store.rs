//! Object store abstraction.

use std::future::Future;
use std::path::Path;

use crate::error::StoreError;

/// A bucket that files are uploaded into.
pub trait ObjectStore: Send + Sync {
    /// Whether an object already exists under `key`.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Upload the file at `path` to `key`, replacing any existing object.
    fn put_file(
        &self,
        key: &str,
        path: &Path,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
