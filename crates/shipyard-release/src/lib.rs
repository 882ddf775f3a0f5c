//! Shipyard release controller: publish, activate, shift traffic, clean up.
//!
//! This crate drives a serverless function through a single release:
//! the new code is pushed to the mutable head, a revision is cut once the
//! head is active, the lane alias is moved to the revision once it is
//! active, and stale revisions and capacity reservations are removed.
//!
//! # Components
//!
//! - **`control`**: The `ControlPlane` trait the controller calls
//! - **`policy`**: Readiness polling policy and the cancellation signal
//! - **`cleanup`**: Pure cleanup planning and the per-item report
//! - **`controller`**: The release state machine

pub mod cleanup;
pub mod control;
pub mod controller;
pub mod error;
pub mod policy;

pub use cleanup::{CleanupFailure, CleanupPlan, CleanupReport, plan_cleanup};
pub use control::{ControlPlane, ControlPlaneError, ControlPlaneResult};
pub use controller::{ReleaseController, ReleaseOutcome, ReleasePhase, ReleaseSettings};
pub use error::{ReleaseError, ReleaseResult};
pub use policy::{Backoff, CancelSignal, PollPolicy};
