//! Tencent Cloud adapters.
//!
//! Every cloud API except COS is reached through [`TencentClient`], a small
//! JSON client that signs requests with TC3-HMAC-SHA256. COS is reached through
//! its S3-compatible endpoint.

pub mod client;
pub mod cos;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod scf;
pub mod signer;
pub mod ssl;

pub use client::{Service, TencentClient};
pub use cos::CosStore;
pub use credential::Credential;
pub use error::{TencentError, TencentResult};
pub use gateway::{ApiGateway, Protocol, TseGateway, TseService, Upstream};
pub use scf::ScfControlPlane;
pub use ssl::SslAuthority;
