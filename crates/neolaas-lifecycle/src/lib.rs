//! Neolaas Lifecycle Engine
//!
//! Drives bare-metal machines one step at a time toward a declared target
//! lifecycle state (commission -> acquire -> deploy).
//!
//! ## Architecture
//!
//! ```text
//! process_all(machines)
//!        ↓
//! FilterSet::check          (hostname / zone include + exclude)
//!        ↓
//! Dispatcher::process_one   (status code -> state name)
//!        ↓
//! TransitionTable::resolve  (target, current) -> Action
//!        ↓
//! Action::apply             -> ControlClient (start / acquire / commission)
//! ```
//!
//! The [`LifecycleGraph`] documents every legal state and edge; it is only
//! used to check that the hand-authored [`TransitionTable`] covers every
//! reachable state.

pub mod action;
pub mod batch;
pub mod client;
pub mod dispatch;
pub mod filter;
pub mod graph;
pub mod machine;
pub mod observability;
pub mod options;
pub mod state;
pub mod table;

pub use action::Action;
pub use batch::{process_all, BatchReport, Disposition, MachineOutcome};
pub use client::{ControlClient, ExternalCallError, Operation};
pub use dispatch::{Dispatch, DispatchError, Dispatcher};
pub use filter::{compile_filter, matches, Dimension, FilterError, FilterSet, Rejection, Rule};
pub use graph::{GraphError, LifecycleGraph};
pub use machine::{Machine, StatusReadError};
pub use options::{EmptyFilterPolicy, FilterConfig, PatternLists, ProcessingOptions};
pub use state::{NodeStatus, StateClass};
pub use table::{CoverageGap, TransitionEntry, TransitionError, TransitionTable};
