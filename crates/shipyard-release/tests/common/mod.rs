//! In-memory control plane that records every call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use shipyard_core::{
    AliasRoute, Artifact, ConcurrencyAllocation, FunctionIdentity, ReadinessState, RevisionId,
};
use shipyard_release::{ControlPlane, ControlPlaneError, ControlPlaneResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UpdateHeadCode(String),
    GetStatus(String),
    PublishVersion,
    PutConcurrency(String, u32),
    GetConcurrency,
    DeleteConcurrency(String),
    UpdateAlias(String, String),
    ListAliases,
    ListVersions,
    DeleteVersion(String),
}

impl Call {
    /// Whether the call changes control-plane state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::UpdateHeadCode(_)
                | Call::PublishVersion
                | Call::PutConcurrency(..)
                | Call::DeleteConcurrency(_)
                | Call::UpdateAlias(..)
                | Call::DeleteVersion(_)
        )
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    /// Scripted statuses per qualifier; unscripted qualifiers are active.
    statuses: HashMap<String, VecDeque<ReadinessState>>,
    versions: Vec<String>,
    allocations: Vec<ConcurrencyAllocation>,
    aliases: Vec<AliasRoute>,
    /// Operation names that fail.
    failing_ops: HashSet<&'static str>,
    /// Qualifiers whose deletion fails.
    failing_deletes: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct RecordingControlPlane {
    state: Arc<Mutex<State>>,
}

impl RecordingControlPlane {
    /// A function with `$LATEST` and the given published versions.
    pub fn with_versions(versions: &[&str]) -> Self {
        let plane = Self::default();
        {
            let mut state = plane.state.lock().unwrap();
            state.versions.push("$LATEST".to_string());
            state
                .versions
                .extend(versions.iter().map(|v| v.to_string()));
        }
        plane
    }

    pub fn script_status(&self, qualifier: &str, states: &[ReadinessState]) -> &Self {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(qualifier.to_string(), states.iter().copied().collect());
        self
    }

    pub fn add_allocation(&self, qualifier: &str, units: u32) -> &Self {
        self.state
            .lock()
            .unwrap()
            .allocations
            .push(ConcurrencyAllocation::new(qualifier, units));
        self
    }

    pub fn add_alias(&self, alias: AliasRoute) -> &Self {
        self.state.lock().unwrap().aliases.push(alias);
        self
    }

    pub fn fail_op(&self, op: &'static str) -> &Self {
        self.state.lock().unwrap().failing_ops.insert(op);
        self
    }

    pub fn fail_delete(&self, qualifier: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .insert(qualifier.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn versions(&self) -> Vec<String> {
        self.state.lock().unwrap().versions.clone()
    }

    pub fn allocations(&self) -> Vec<ConcurrencyAllocation> {
        self.state.lock().unwrap().allocations.clone()
    }

    pub fn alias_target(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .aliases
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.revision.clone())
    }

    fn record(&self, call: Call, op: &'static str) -> ControlPlaneResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing_ops.contains(op) {
            return Err(ControlPlaneError::Rejected {
                code: "InternalError".to_string(),
                message: format!("{op} rejected"),
            });
        }
        Ok(state)
    }
}

fn rejected_delete(qualifier: &str) -> ControlPlaneError {
    ControlPlaneError::Rejected {
        code: "ResourceInUse".to_string(),
        message: format!("{qualifier} is in use"),
    }
}

impl ControlPlane for RecordingControlPlane {
    async fn update_head_code(&self, artifact: &Artifact) -> ControlPlaneResult<()> {
        self.record(Call::UpdateHeadCode(artifact.to_string()), "update_head_code")?;
        Ok(())
    }

    async fn get_status(&self, qualifier: &str) -> ControlPlaneResult<ReadinessState> {
        let mut state = self.record(Call::GetStatus(qualifier.to_string()), "get_status")?;
        let next = state
            .statuses
            .get_mut(qualifier)
            .and_then(VecDeque::pop_front)
            .unwrap_or(ReadinessState::Active);
        Ok(next)
    }

    async fn publish_version(&self) -> ControlPlaneResult<RevisionId> {
        let mut state = self.record(Call::PublishVersion, "publish_version")?;
        let next = state
            .versions
            .iter()
            .filter_map(|v| v.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = next.to_string();
        state.versions.push(id.clone());
        Ok(RevisionId::new(id))
    }

    async fn put_concurrency(&self, qualifier: &str, units: u32) -> ControlPlaneResult<()> {
        let mut state = self.record(
            Call::PutConcurrency(qualifier.to_string(), units),
            "put_concurrency",
        )?;
        state.allocations.retain(|a| a.qualifier != qualifier);
        state
            .allocations
            .push(ConcurrencyAllocation::new(qualifier, units));
        Ok(())
    }

    async fn get_concurrency(&self) -> ControlPlaneResult<Vec<ConcurrencyAllocation>> {
        let state = self.record(Call::GetConcurrency, "get_concurrency")?;
        Ok(state.allocations.clone())
    }

    async fn delete_concurrency(&self, qualifier: &str) -> ControlPlaneResult<()> {
        let mut state = self.record(
            Call::DeleteConcurrency(qualifier.to_string()),
            "delete_concurrency",
        )?;
        if state.failing_deletes.contains(qualifier) {
            return Err(rejected_delete(qualifier));
        }
        state.allocations.retain(|a| a.qualifier != qualifier);
        Ok(())
    }

    async fn update_alias(&self, alias: &str, qualifier: &str) -> ControlPlaneResult<()> {
        let mut state = self.record(
            Call::UpdateAlias(alias.to_string(), qualifier.to_string()),
            "update_alias",
        )?;
        state.aliases.retain(|a| a.name != alias);
        state.aliases.push(AliasRoute::new(alias, qualifier));
        Ok(())
    }

    async fn list_aliases(&self) -> ControlPlaneResult<Vec<AliasRoute>> {
        let state = self.record(Call::ListAliases, "list_aliases")?;
        Ok(state.aliases.clone())
    }

    async fn list_versions(&self) -> ControlPlaneResult<Vec<String>> {
        let state = self.record(Call::ListVersions, "list_versions")?;
        Ok(state.versions.clone())
    }

    async fn delete_version(&self, qualifier: &str) -> ControlPlaneResult<()> {
        let mut state = self.record(Call::DeleteVersion(qualifier.to_string()), "delete_version")?;
        if state.failing_deletes.contains(qualifier) {
            return Err(rejected_delete(qualifier));
        }
        state.versions.retain(|v| v != qualifier);
        Ok(())
    }
}

pub fn test_function() -> FunctionIdentity {
    FunctionIdentity {
        region: "ap-guangzhou".to_string(),
        namespace: "default".to_string(),
        name: "api".to_string(),
    }
}
