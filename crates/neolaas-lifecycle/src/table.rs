//! Transition Table
//!
//! Hand-authored "next step" table: for each target state, the single action
//! to take from every current state a machine may be observed in. The table
//! is deliberately not derived from the [`LifecycleGraph`]; administrative
//! and failure states need explicit decisions that a path search would not
//! make. [`TransitionTable::coverage_gaps`] checks the two against each other.

use crate::action::Action;
use crate::graph::LifecycleGraph;
use crate::state::NodeStatus;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// No sub-table exists for the target; a configuration defect.
    #[error("could not find transitions to target state '{target}'")]
    UnknownTarget { target: String },
    /// The observed state has no declared action for the target.
    #[error("could not find transition from current state '{current}' to target state '{target}'")]
    UnknownTransition { target: String, current: String },
    /// Two entries disagree on the action for one (target, current) pair.
    #[error("conflicting transitions from '{current}' to '{target}': {existing} vs {conflicting}")]
    Conflict {
        target: String,
        current: String,
        existing: Action,
        conflicting: Action,
    },
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEntry {
    pub target: String,
    pub current: String,
    pub action: Action,
}

impl TransitionEntry {
    pub fn new(target: impl Into<String>, current: impl Into<String>, action: Action) -> Self {
        Self {
            target: target.into(),
            current: current.into(),
            action,
        }
    }
}

/// A reachable state with no entry under a declared target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageGap {
    pub target: String,
    pub state: String,
}

/// Immutable (target, current) -> action mapping.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    targets: HashMap<String, HashMap<String, Action>>,
}

impl TransitionTable {
    /// Build a table, rejecting pairs mapped to two different actions.
    /// Exact duplicates are accepted.
    pub fn from_entries<I>(entries: I) -> Result<Self, TransitionError>
    where
        I: IntoIterator<Item = TransitionEntry>,
    {
        let mut targets: HashMap<String, HashMap<String, Action>> = HashMap::new();

        for entry in entries {
            let sub = targets.entry(entry.target.clone()).or_default();
            match sub.get(&entry.current) {
                Some(&existing) if existing != entry.action => {
                    return Err(TransitionError::Conflict {
                        target: entry.target,
                        current: entry.current,
                        existing,
                        conflicting: entry.action,
                    });
                }
                Some(_) => {}
                None => {
                    sub.insert(entry.current, entry.action);
                }
            }
        }

        Ok(Self { targets })
    }

    /// Table for driving machines to `Deployed`.
    pub fn deployed() -> Self {
        use NodeStatus::*;

        let rows = [
            (New, Action::Commission),
            (Deployed, Action::Done),
            (Ready, Action::Acquire),
            (Allocated, Action::Deploy),
            (Retired, Action::AdminState),
            (Reserved, Action::AdminState),
            (Releasing, Action::Wait),
            (DiskErasing, Action::Wait),
            (Deploying, Action::Wait),
            (Commissioning, Action::Wait),
            (Missing, Action::Fail),
            (FailedReleasing, Action::Fail),
            (FailedDiskErasing, Action::Fail),
            (FailedDeployment, Action::Fail),
            (Broken, Action::Fail),
            (FailedCommissioning, Action::Fail),
        ];

        let sub = rows
            .into_iter()
            .map(|(state, action)| (state.name().to_string(), action))
            .collect();

        Self {
            targets: HashMap::from([(Deployed.name().to_string(), sub)]),
        }
    }

    /// Action that moves a machine in `current` toward `target`.
    pub fn resolve(&self, target: &str, current: &str) -> Result<Action, TransitionError> {
        let sub = self
            .targets
            .get(target)
            .ok_or_else(|| TransitionError::UnknownTarget {
                target: target.to_string(),
            })?;

        sub.get(current)
            .copied()
            .ok_or_else(|| TransitionError::UnknownTransition {
                target: target.to_string(),
                current: current.to_string(),
            })
    }

    /// Declared target states, sorted.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<_> = self.targets.keys().map(String::as_str).collect();
        targets.sort_unstable();
        targets
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.targets.contains_key(target)
    }

    /// Rows for one target, sorted by current state.
    pub fn entries_for(&self, target: &str) -> Vec<TransitionEntry> {
        let Some(sub) = self.targets.get(target) else {
            return Vec::new();
        };

        sub.iter()
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .map(|(current, &action)| TransitionEntry::new(target, current.as_str(), action))
            .collect()
    }

    /// All rows, sorted by target then current state.
    pub fn entries(&self) -> Vec<TransitionEntry> {
        self.targets()
            .into_iter()
            .flat_map(|target| self.entries_for(target))
            .collect()
    }

    /// States reachable from `root` in `graph` that some declared target has
    /// no entry for. Reporting is left to the caller.
    pub fn coverage_gaps(&self, graph: &LifecycleGraph, root: &str) -> Vec<CoverageGap> {
        let reachable = graph.reachable_from(root);
        let mut gaps = Vec::new();

        for target in self.targets() {
            for state in &reachable {
                if self.resolve(target, state).is_err() {
                    gaps.push(CoverageGap {
                        target: target.to_string(),
                        state: state.clone(),
                    });
                }
            }
        }

        gaps
    }
}
