//! Release error types.

use std::time::Duration;

use thiserror::Error;

use crate::control::ControlPlaneError;
use crate::controller::ReleasePhase;

/// Errors that end a release run.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("package is {size} bytes, exceeding the {limit} byte limit")]
    ArtifactTooLarge { size: u64, limit: u64 },

    #[error("control plane call failed while {phase}: {source}")]
    ControlPlane {
        phase: ReleasePhase,
        #[source]
        source: ControlPlaneError,
    },

    #[error("{qualifier} failed to become active")]
    RevisionFailed { qualifier: String },

    #[error("{qualifier} still not active after {attempts} polls ({elapsed:?})")]
    Timeout {
        qualifier: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("cancelled while {phase}")]
    Cancelled { phase: ReleasePhase },

    #[error("{0} is the mutable head, not a published revision")]
    NotARevision(String),

    #[error("cleanup left {failed} stale item(s) behind")]
    CleanupIncomplete { failed: usize },
}

pub type ReleaseResult<T> = Result<T, ReleaseError>;
