//! Certificate renewal against a managed certificate store.
//!
//! Certificates are issued locally (typically by `acme.sh`), compared with the
//! most recently uploaded copy, and pushed only when the bytes differ. A
//! replacement rebinds every cloud resource that used the old certificate.

pub mod authority;
pub mod domain;
pub mod error;
pub mod local;
pub mod renew;

pub use authority::{CertificateAuthority, ReplaceRequest, ResourceRegions};
pub use domain::{DomainConfig, DomainSet};
pub use error::{AuthorityError, CertError, CertResult};
pub use local::{AcmeRunner, LocalCertificate, LocalStore};
pub use renew::{DomainFailure, RenewOutcome, RenewReport, Renewer};
