//! Batch upload of local files and folders to an object store.
//!
//! Files already present remotely are skipped. The rest are uploaded on a
//! bounded pool, each with a small retry budget, and the caller gets back
//! one report covering every file.

pub mod error;
pub mod plan;
pub mod store;
pub mod uploader;

pub use error::{StoreError, UploadError};
pub use plan::{UploadUnit, plan_uploads};
pub use store::ObjectStore;
pub use uploader::{UploadFailure, UploadReport, Uploader};
