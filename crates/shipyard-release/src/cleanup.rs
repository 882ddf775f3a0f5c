//! Stale revision and capacity cleanup planning.

use std::collections::BTreeSet;

use serde::Serialize;

use shipyard_core::{AliasRoute, ConcurrencyAllocation, LATEST_QUALIFIER, RevisionId};

use crate::error::ReleaseError;

/// What a cleanup pass will delete, in deletion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// Qualifiers whose capacity reservation is released.
    pub allocations: Vec<String>,
    /// Revisions to delete.
    pub revisions: Vec<String>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty() && self.revisions.is_empty()
    }
}

/// Decide what to delete after `active` has taken the traffic.
///
/// Allocations are kept only for `$LATEST` and the active revision.
/// Revisions are also kept while a live alias can still route to them.
pub fn plan_cleanup(
    active: &RevisionId,
    versions: &[String],
    allocations: &[ConcurrencyAllocation],
    aliases: &[AliasRoute],
) -> CleanupPlan {
    let current: BTreeSet<&str> = BTreeSet::from([LATEST_QUALIFIER, active.as_str()]);
    let mut routed = current.clone();
    for alias in aliases {
        routed.extend(alias.revisions());
    }

    let mut seen = BTreeSet::new();
    let allocations = allocations
        .iter()
        .map(|a| a.qualifier.as_str())
        .filter(|q| !current.contains(q) && seen.insert(*q))
        .map(str::to_string)
        .collect();

    let mut seen = BTreeSet::new();
    let revisions = versions
        .iter()
        .map(String::as_str)
        .filter(|v| !routed.contains(v) && seen.insert(*v))
        .map(str::to_string)
        .collect();

    CleanupPlan {
        allocations,
        revisions,
    }
}

/// One deletion that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    /// `allocation` or `revision`.
    pub kind: &'static str,
    pub qualifier: String,
    pub error: String,
}

/// Outcome of a cleanup pass. Failed items do not stop the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted_allocations: Vec<String>,
    pub deleted_revisions: Vec<String>,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_noop(&self) -> bool {
        self.deleted_allocations.is_empty()
            && self.deleted_revisions.is_empty()
            && self.failures.is_empty()
    }

    /// Turn leftover failures into an error.
    pub fn into_result(self) -> Result<Self, ReleaseError> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(ReleaseError::CleanupIncomplete {
                failed: self.failures.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drops_everything_but_latest_and_active() {
        let plan = plan_cleanup(
            &RevisionId::new("3"),
            &strings(&["$LATEST", "1", "2", "3"]),
            &[
                ConcurrencyAllocation::new("2", 1),
                ConcurrencyAllocation::new("3", 2),
            ],
            &[],
        );
        assert_eq!(plan.allocations, strings(&["2"]));
        assert_eq!(plan.revisions, strings(&["1", "2"]));
    }

    #[test]
    fn never_plans_latest_or_active() {
        let versions = strings(&["$LATEST", "1", "2", "3", "4", "5"]);
        let allocations: Vec<ConcurrencyAllocation> = versions
            .iter()
            .map(|v| ConcurrencyAllocation::new(v.clone(), 1))
            .collect();

        for active in &versions[1..] {
            for n in 0..=versions.len() {
                let active = RevisionId::new(active.clone());
                let plan = plan_cleanup(&active, &versions[..n], &allocations[..n], &[]);
                for doomed in plan.revisions.iter().chain(&plan.allocations) {
                    assert_ne!(doomed, "$LATEST");
                    assert_ne!(doomed, active.as_str());
                }
            }
        }
    }

    #[test]
    fn keeps_revisions_other_aliases_route_to() {
        let mut canary = AliasRoute::new("canary", "2");
        canary.additional.push(("1".to_string(), 0.05));
        let plan = plan_cleanup(
            &RevisionId::new("4"),
            &strings(&["$LATEST", "1", "2", "3", "4"]),
            &[ConcurrencyAllocation::new("2", 1)],
            &[AliasRoute::new("$DEFAULT", "4"), canary],
        );
        assert_eq!(plan.revisions, strings(&["3"]));
        assert_eq!(plan.allocations, strings(&["2"]));
    }

    #[test]
    fn alias_routing_does_not_protect_allocations() {
        let plan = plan_cleanup(
            &RevisionId::new("3"),
            &strings(&["$LATEST", "2", "3"]),
            &[
                ConcurrencyAllocation::new("2", 1),
                ConcurrencyAllocation::new("3", 2),
            ],
            &[AliasRoute::new("staging", "2")],
        );
        assert_eq!(plan.allocations, strings(&["2"]));
        assert!(plan.revisions.is_empty());
    }

    #[test]
    fn nothing_left_to_do() {
        let plan = plan_cleanup(
            &RevisionId::new("3"),
            &strings(&["$LATEST", "3"]),
            &[ConcurrencyAllocation::new("3", 2)],
            &[],
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn duplicates_are_planned_once() {
        let plan = plan_cleanup(
            &RevisionId::new("3"),
            &strings(&["1", "1", "3"]),
            &[
                ConcurrencyAllocation::new("1", 1),
                ConcurrencyAllocation::new("1", 1),
            ],
            &[],
        );
        assert_eq!(plan.revisions, strings(&["1"]));
        assert_eq!(plan.allocations, strings(&["1"]));
    }

    #[test]
    fn report_with_failures_is_an_error() {
        let report = CleanupReport {
            deleted_revisions: strings(&["1"]),
            failures: vec![CleanupFailure {
                kind: "revision",
                qualifier: "2".to_string(),
                error: "ResourceInUse".to_string(),
            }],
            ..Default::default()
        };
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, ReleaseError::CleanupIncomplete { failed: 1 }));
        assert!(CleanupReport::default().into_result().unwrap().is_noop());
    }
}
