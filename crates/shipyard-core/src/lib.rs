pub mod artifact;
pub mod config;
pub mod error;
pub mod types;

pub use artifact::{Artifact, MAX_PACKAGE_BYTES};
pub use config::{ShipyardConfig, parse_duration};
pub use error::{ConfigError, CoreError};
pub use types::*;
