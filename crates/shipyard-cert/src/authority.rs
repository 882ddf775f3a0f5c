//! Managed certificate store abstraction.

use std::future::Future;

use serde::Serialize;

use crate::error::AuthorityError;

/// Regions of one resource type that should pick up a replaced certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRegions {
    pub resource_type: String,
    pub regions: Vec<String>,
}

/// Replace `old_id` with a new certificate and rebind its resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceRequest {
    pub old_id: String,
    pub resource_types: Vec<String>,
    pub resource_regions: Vec<ResourceRegions>,
    pub private_key: String,
    pub public_cert: String,
}

pub trait CertificateAuthority: Send + Sync {
    /// Id of the most recently expiring uploaded certificate for `domain`.
    fn search_latest(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<Option<String>, AuthorityError>> + Send;

    /// Public certificate chain of `cert_id`.
    fn download(
        &self,
        cert_id: &str,
        domain: &str,
    ) -> impl Future<Output = Result<Vec<u8>, AuthorityError>> + Send;

    /// Upload a new certificate, returning its id.
    fn upload(
        &self,
        private_key: &str,
        public_cert: &str,
    ) -> impl Future<Output = Result<String, AuthorityError>> + Send;

    fn replace(
        &self,
        request: &ReplaceRequest,
    ) -> impl Future<Output = Result<(), AuthorityError>> + Send;
}
