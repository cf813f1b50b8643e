//! Lifecycle Graph
//!
//! Declarative description of every legal lifecycle state and the directed
//! edges between them. The graph is reference material: it is never executed,
//! only parsed and used to check that the transition table covers every state
//! a machine can actually reach.
//!
//! The text form is one edge per line:
//!
//! ```text
//! (New)->(Commissioning)
//! (Commissioning)->(Ready)
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// MAAS node lifecycle.
pub const DEFAULT_LIFECYCLE: &str = r#"
    (New)->(Commissioning)
    (Commissioning)->(FailedCommissioning)
    (FailedCommissioning)->(New)
    (Commissioning)->(Ready)
    (Ready)->(Deploying)
    (Ready)->(Allocated)
    (Allocated)->(Deploying)
    (Deploying)->(Deployed)
    (Deploying)->(FailedDeployment)
    (FailedDeployment)->(Broken)
    (Deployed)->(Releasing)
    (Releasing)->(FailedReleasing)
    (FailedReleasing)->(Broken)
    (Releasing)->(DiskErasing)
    (DiskErasing)->(FailedDiskErasing)
    (FailedDiskErasing)->(Broken)
    (Releasing)->(Ready)
    (DiskErasing)->(Ready)
    (Broken)->(Ready)
"#;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("line {line}: expected `(From)->(To)`, got `{text}`")]
    Malformed { line: usize, text: String },
}

/// Directed graph of lifecycle states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl LifecycleGraph {
    /// Parse the `(From)->(To)` text form.
    pub fn parse(text: &str) -> Result<Self, GraphError> {
        let mut graph = Self::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let malformed = || GraphError::Malformed {
                line: idx + 1,
                text: line.to_string(),
            };

            let (from, to) = line.split_once("->").ok_or_else(malformed)?;
            let from = parse_state(from).ok_or_else(malformed)?;
            let to = parse_state(to).ok_or_else(malformed)?;
            graph.add_edge(from, to);
        }

        Ok(graph)
    }

    /// The built-in MAAS lifecycle.
    pub fn maas() -> Self {
        // DEFAULT_LIFECYCLE is covered by test_default_lifecycle_parses
        Self::parse(DEFAULT_LIFECYCLE).unwrap_or_default()
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let to = to.into();
        self.edges.entry(to.clone()).or_default();
        self.edges.entry(from.into()).or_default().insert(to);
    }

    /// Every state that appears on either end of an edge.
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn successors(&self, state: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(state)
            .into_iter()
            .flat_map(|next| next.iter().map(String::as_str))
    }

    pub fn contains(&self, state: &str) -> bool {
        self.edges.contains_key(state)
    }

    /// States reachable from `start`, including `start` itself when it is
    /// part of the graph.
    pub fn reachable_from(&self, start: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        if !self.contains(start) {
            return seen;
        }

        let mut queue = VecDeque::from([start.to_string()]);
        seen.insert(start.to_string());

        while let Some(state) = queue.pop_front() {
            for next in self.successors(&state) {
                if seen.insert(next.to_string()) {
                    queue.push_back(next.to_string());
                }
            }
        }

        seen
    }
}

fn parse_state(token: &str) -> Option<String> {
    let name = token.trim().strip_prefix('(')?.strip_suffix(')')?.trim();
    (!name.is_empty()).then(|| name.to_string())
}
