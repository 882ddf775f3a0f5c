//! Shared types used across shipyard crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The mutable head of a function. Never a published revision.
pub const LATEST_QUALIFIER: &str = "$LATEST";

/// Alias that receives traffic when no lane is configured.
pub const DEFAULT_ALIAS: &str = "$DEFAULT";

/// Identifies the function a release targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionIdentity {
    pub region: String,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.namespace, self.name)
    }
}

/// An immutable published revision, identified by the opaque version string
/// the control plane returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id names the mutable head rather than a published revision.
    pub fn is_latest(&self) -> bool {
        self.0 == LATEST_QUALIFIER
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RevisionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RevisionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Readiness of the head or of a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessState {
    /// Still being created, updated, or published.
    Pending,
    /// Serving and safe to version or route traffic to.
    Active,
    /// The control plane gave up on this revision.
    Failed,
}

impl ReadinessState {
    /// Map a raw control-plane status string.
    ///
    /// `Active` is ready, any `*Failed` status is terminal, and everything
    /// else (`Creating`, `Updating`, `Publishing`, ...) is still pending.
    pub fn from_status(status: &str) -> Self {
        if status == "Active" {
            ReadinessState::Active
        } else if status.ends_with("Failed") {
            ReadinessState::Failed
        } else {
            ReadinessState::Pending
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReadinessState::Pending)
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadinessState::Pending => "Pending",
            ReadinessState::Active => "Active",
            ReadinessState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Provisioned capacity bound to one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyAllocation {
    pub qualifier: String,
    pub units: u32,
}

impl ConcurrencyAllocation {
    pub fn new(qualifier: impl Into<String>, units: u32) -> Self {
        Self {
            qualifier: qualifier.into(),
            units,
        }
    }
}

/// A live alias and every revision it can route traffic to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRoute {
    pub name: String,
    pub revision: String,
    /// Weighted extra routes, as `(revision, weight)`.
    #[serde(default)]
    pub additional: Vec<(String, f64)>,
}

impl AliasRoute {
    pub fn new(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            additional: Vec::new(),
        }
    }

    /// All revisions this alias may send traffic to.
    pub fn revisions(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.revision.as_str())
            .chain(self.additional.iter().map(|(rev, _)| rev.as_str()))
    }
}
