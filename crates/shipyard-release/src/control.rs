//! The control plane a release runs against.

use std::future::Future;

use thiserror::Error;

use shipyard_core::{AliasRoute, Artifact, ConcurrencyAllocation, ReadinessState, RevisionId};

/// Any rejected or failed control-plane call.
#[derive(Debug, Clone, Error)]
pub enum ControlPlaneError {
    /// The control plane answered with an error.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type ControlPlaneResult<T> = Result<T, ControlPlaneError>;

/// Management operations on a single function.
///
/// Implementations are bound to one function identity; every call acts on
/// that function. Qualifiers are revision ids or `$LATEST`.
pub trait ControlPlane: Send + Sync {
    /// Replace the code of the mutable head.
    fn update_head_code(
        &self,
        artifact: &Artifact,
    ) -> impl Future<Output = ControlPlaneResult<()>> + Send;

    fn get_status(
        &self,
        qualifier: &str,
    ) -> impl Future<Output = ControlPlaneResult<ReadinessState>> + Send;

    /// Cut an immutable revision from the current head.
    fn publish_version(&self) -> impl Future<Output = ControlPlaneResult<RevisionId>> + Send;

    /// Create or replace the capacity reservation for a revision.
    fn put_concurrency(
        &self,
        qualifier: &str,
        units: u32,
    ) -> impl Future<Output = ControlPlaneResult<()>> + Send;

    fn get_concurrency(
        &self,
    ) -> impl Future<Output = ControlPlaneResult<Vec<ConcurrencyAllocation>>> + Send;

    fn delete_concurrency(
        &self,
        qualifier: &str,
    ) -> impl Future<Output = ControlPlaneResult<()>> + Send;

    /// Point an alias at a revision. Traffic follows immediately.
    fn update_alias(
        &self,
        alias: &str,
        qualifier: &str,
    ) -> impl Future<Output = ControlPlaneResult<()>> + Send;

    fn list_aliases(&self) -> impl Future<Output = ControlPlaneResult<Vec<AliasRoute>>> + Send;

    /// Every version of the function, `$LATEST` included.
    fn list_versions(&self) -> impl Future<Output = ControlPlaneResult<Vec<String>>> + Send;

    fn delete_version(
        &self,
        qualifier: &str,
    ) -> impl Future<Output = ControlPlaneResult<()>> + Send;
}
