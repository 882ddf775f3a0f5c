//! Release controller: drives the release state machine.
//!
//! A release moves strictly forward: the head is updated and polled until
//! active, a revision is cut and polled until active, capacity is reserved,
//! the lane alias is repointed, and stale revisions are cleaned up. Any
//! failure before the traffic shift ends the run in `Failed`; nothing is
//! rolled back.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use shipyard_core::config::ReleaseConfig;
use shipyard_core::{Artifact, CoreError, FunctionIdentity, LATEST_QUALIFIER, ReadinessState, RevisionId};

use crate::cleanup::{CleanupFailure, CleanupReport, plan_cleanup};
use crate::control::{ControlPlane, ControlPlaneError};
use crate::error::{ReleaseError, ReleaseResult};
use crate::policy::{CancelSignal, PollPolicy};

/// Current phase of a release run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReleasePhase {
    /// Nothing started yet.
    Idle,
    /// Submitting new code to the mutable head.
    Publishing,
    /// Waiting for `$LATEST` to become active.
    AwaitingHeadReady,
    /// Cutting an immutable revision from the head.
    Versioning,
    /// Waiting for the revision to become active.
    AwaitingRevisionReady,
    /// Reserving concurrency for the revision.
    Provisioning,
    /// Repointing the lane alias.
    TrafficShift,
    /// Removing stale revisions and allocations.
    Cleanup,
    /// Finished successfully.
    Done,
    /// Stopped on an error.
    Failed,
}

impl fmt::Display for ReleasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReleasePhase::Idle => "idle",
            ReleasePhase::Publishing => "publishing",
            ReleasePhase::AwaitingHeadReady => "awaiting head readiness",
            ReleasePhase::Versioning => "versioning",
            ReleasePhase::AwaitingRevisionReady => "awaiting revision readiness",
            ReleasePhase::Provisioning => "provisioning concurrency",
            ReleasePhase::TrafficShift => "shifting traffic",
            ReleasePhase::Cleanup => "cleaning up",
            ReleasePhase::Done => "done",
            ReleasePhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-lane release behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    /// Alias that carries the lane's traffic.
    pub alias: String,
    /// Units to reserve for each new revision. `None` skips provisioning.
    pub concurrency: Option<u32>,
    /// Remove stale revisions and allocations after the shift.
    pub cleanup: bool,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self::from_config(&ReleaseConfig::default())
    }
}

impl ReleaseSettings {
    pub fn from_config(config: &ReleaseConfig) -> Self {
        Self {
            alias: config.alias.clone(),
            concurrency: config.concurrency,
            cleanup: config.cleanup,
        }
    }
}

/// Result of a full release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub revision: RevisionId,
    pub cleanup: CleanupReport,
}

/// Drives one function through publish, deploy, and cleanup.
///
/// Concurrent controllers targeting the same function race on its alias;
/// callers that need exclusion must lock externally.
pub struct ReleaseController<C> {
    function: FunctionIdentity,
    plane: C,
    settings: ReleaseSettings,
    poll: PollPolicy,
    cancel: CancelSignal,
    phase: ReleasePhase,
}

impl<C: ControlPlane> ReleaseController<C> {
    pub fn new(function: FunctionIdentity, plane: C, settings: ReleaseSettings) -> Self {
        Self {
            function,
            plane,
            settings,
            poll: PollPolicy::default(),
            cancel: CancelSignal::never(),
            phase: ReleasePhase::Idle,
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn phase(&self) -> ReleasePhase {
        self.phase
    }

    pub fn settings(&self) -> &ReleaseSettings {
        &self.settings
    }

    pub fn control_plane(&self) -> &C {
        &self.plane
    }

    /// Push `artifact` to the head and cut an active revision from it.
    ///
    /// Oversized packages are rejected before any control-plane call.
    pub async fn publish(&mut self, artifact: &Artifact) -> ReleaseResult<RevisionId> {
        let result = self.run_publish(artifact).await;
        self.settle(result)
    }

    /// Wait for `revision`, reserve capacity, and move the lane alias to it.
    pub async fn deploy(&mut self, revision: &RevisionId) -> ReleaseResult<()> {
        let result = self.run_deploy(revision).await;
        self.settle(result)
    }

    /// Delete every allocation and revision that is not `$LATEST`, not
    /// `active`, and not routed to by a live alias.
    ///
    /// Listing failures abort the pass. Individual deletions that fail are
    /// recorded in the report and the pass carries on.
    pub async fn cleanup(&mut self, active: &RevisionId) -> ReleaseResult<CleanupReport> {
        if !self.settings.cleanup {
            info!(function = %self.function, "cleanup disabled, skipping");
            return Ok(CleanupReport::default());
        }
        let result = self.run_cleanup(active).await;
        self.settle(result)
    }

    /// Publish, deploy, and clean up in one run.
    pub async fn publish_and_deploy(&mut self, artifact: &Artifact) -> ReleaseResult<ReleaseOutcome> {
        let revision = self.publish(artifact).await?;
        self.promote(revision).await
    }

    /// Deploy and clean up a revision that was published earlier.
    pub async fn promote(&mut self, revision: RevisionId) -> ReleaseResult<ReleaseOutcome> {
        self.deploy(&revision).await?;
        let cleanup = self.cleanup(&revision).await?;
        Ok(ReleaseOutcome { revision, cleanup })
    }

    async fn run_publish(&mut self, artifact: &Artifact) -> ReleaseResult<RevisionId> {
        if let Err(CoreError::ArtifactTooLarge { size, limit }) = artifact.validate() {
            return Err(ReleaseError::ArtifactTooLarge { size, limit });
        }

        self.enter(ReleasePhase::Publishing);
        self.plane
            .update_head_code(artifact)
            .await
            .map_err(|e| self.rejected(e))?;
        info!(function = %self.function, %artifact, "updated head code");

        self.enter(ReleasePhase::AwaitingHeadReady);
        self.wait_until_active(LATEST_QUALIFIER).await?;

        self.enter(ReleasePhase::Versioning);
        let revision = self
            .plane
            .publish_version()
            .await
            .map_err(|e| self.rejected(e))?;
        info!(function = %self.function, %revision, "published revision");

        self.enter(ReleasePhase::AwaitingRevisionReady);
        self.wait_until_active(revision.as_str()).await?;

        Ok(revision)
    }

    async fn run_deploy(&mut self, revision: &RevisionId) -> ReleaseResult<()> {
        if revision.is_latest() {
            return Err(ReleaseError::NotARevision(revision.to_string()));
        }

        self.enter(ReleasePhase::AwaitingRevisionReady);
        self.wait_until_active(revision.as_str()).await?;

        if let Some(units) = self.settings.concurrency {
            self.enter(ReleasePhase::Provisioning);
            self.plane
                .put_concurrency(revision.as_str(), units)
                .await
                .map_err(|e| self.rejected(e))?;
            info!(function = %self.function, %revision, units, "reserved provisioned concurrency");
        }

        self.enter(ReleasePhase::TrafficShift);
        self.plane
            .update_alias(&self.settings.alias, revision.as_str())
            .await
            .map_err(|e| self.rejected(e))?;
        info!(
            function = %self.function,
            alias = %self.settings.alias,
            %revision,
            "redirected alias traffic"
        );

        self.enter(ReleasePhase::Done);
        Ok(())
    }

    async fn run_cleanup(&mut self, active: &RevisionId) -> ReleaseResult<CleanupReport> {
        self.enter(ReleasePhase::Cleanup);

        let allocations = self
            .plane
            .get_concurrency()
            .await
            .map_err(|e| self.rejected(e))?;
        let versions = self
            .plane
            .list_versions()
            .await
            .map_err(|e| self.rejected(e))?;
        let aliases = self
            .plane
            .list_aliases()
            .await
            .map_err(|e| self.rejected(e))?;

        let plan = plan_cleanup(active, &versions, &allocations, &aliases);
        debug!(
            function = %self.function,
            allocations = plan.allocations.len(),
            revisions = plan.revisions.len(),
            "planned cleanup"
        );

        let mut report = CleanupReport::default();

        for qualifier in plan.allocations {
            match self.plane.delete_concurrency(&qualifier).await {
                Ok(()) => {
                    info!(function = %self.function, %qualifier, "deleted stale concurrency allocation");
                    report.deleted_allocations.push(qualifier);
                }
                Err(e) => {
                    warn!(function = %self.function, %qualifier, error = %e, "failed to delete concurrency allocation");
                    report.failures.push(CleanupFailure {
                        kind: "allocation",
                        qualifier,
                        error: e.to_string(),
                    });
                }
            }
        }

        for qualifier in plan.revisions {
            match self.plane.delete_version(&qualifier).await {
                Ok(()) => {
                    info!(function = %self.function, %qualifier, "deleted stale revision");
                    report.deleted_revisions.push(qualifier);
                }
                Err(e) => {
                    warn!(function = %self.function, %qualifier, error = %e, "failed to delete revision");
                    report.failures.push(CleanupFailure {
                        kind: "revision",
                        qualifier,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.enter(ReleasePhase::Done);
        Ok(report)
    }

    /// Poll `qualifier` until it is active.
    ///
    /// Every iteration is a cancellation point. A `Failed` status, an
    /// exhausted poll budget, or a fired cancel signal ends the wait.
    async fn wait_until_active(&mut self, qualifier: &str) -> ReleaseResult<()> {
        let started = Instant::now();
        let mut delay = self.poll.interval;
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(ReleaseError::Cancelled { phase: self.phase });
            }

            attempts += 1;
            let state = self
                .plane
                .get_status(qualifier)
                .await
                .map_err(|e| self.rejected(e))?;

            match state {
                ReadinessState::Active => {
                    debug!(function = %self.function, %qualifier, attempts, "active");
                    return Ok(());
                }
                ReadinessState::Failed => {
                    return Err(ReleaseError::RevisionFailed {
                        qualifier: qualifier.to_string(),
                    });
                }
                ReadinessState::Pending => {}
            }

            let elapsed = started.elapsed();
            if self.poll.is_exhausted(attempts, elapsed) {
                return Err(ReleaseError::Timeout {
                    qualifier: qualifier.to_string(),
                    attempts,
                    elapsed,
                });
            }

            let sleep_for = match self.poll.timeout {
                Some(t) => delay.min(t.saturating_sub(elapsed)),
                None => delay,
            };
            debug!(function = %self.function, %qualifier, attempts, ?sleep_for, "not active yet");
            if !self.cancel.sleep(sleep_for).await {
                return Err(ReleaseError::Cancelled { phase: self.phase });
            }
            delay = self.poll.next_delay(delay);
        }
    }

    fn enter(&mut self, phase: ReleasePhase) {
        debug!(function = %self.function, from = %self.phase, to = %phase, "release phase");
        self.phase = phase;
    }

    fn rejected(&self, source: ControlPlaneError) -> ReleaseError {
        ReleaseError::ControlPlane {
            phase: self.phase,
            source,
        }
    }

    fn settle<T>(&mut self, result: ReleaseResult<T>) -> ReleaseResult<T> {
        if let Err(e) = &result {
            warn!(function = %self.function, phase = %self.phase, error = %e, "release failed");
            self.phase = ReleasePhase::Failed;
        }
        result
    }
}
