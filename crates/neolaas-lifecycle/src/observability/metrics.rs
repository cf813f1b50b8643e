//! Engine Metrics
//!
//! Metrics tracked:
//! - `neolaas_lifecycle_actions_total` - counter of actions by kind and mode
//! - `neolaas_lifecycle_filtered_total` - counter of filtered machines by dimension and rule
//! - `neolaas_lifecycle_dispatch_errors_total` - counter of per-machine errors by kind
//! - `neolaas_lifecycle_machines_by_state` - gauge of machines by observed state
//! - `neolaas_lifecycle_batch_duration_seconds` - histogram of batch durations

use crate::state::NodeStatus;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use strum::IntoEnumIterator;

/// Out-of-range state labels (`Unknown(n)`) reported by earlier batches.
static UNKNOWN_STATES: Mutex<BTreeSet<String>> = Mutex::new(BTreeSet::new());

/// Register descriptions for all engine metrics
pub fn register_metric_descriptions() {
    describe_counter!(
        "neolaas_lifecycle_actions_total",
        "Total number of lifecycle actions invoked"
    );
    describe_counter!(
        "neolaas_lifecycle_filtered_total",
        "Total number of machines skipped by filters"
    );
    describe_counter!(
        "neolaas_lifecycle_dispatch_errors_total",
        "Total number of per-machine dispatch errors"
    );
    describe_gauge!(
        "neolaas_lifecycle_machines_by_state",
        "Number of machines by observed lifecycle state in the last batch"
    );
    describe_histogram!(
        "neolaas_lifecycle_batch_duration_seconds",
        "Duration of batch runs in seconds"
    );
}

/// Record that an action was invoked
pub fn record_action(action: &str, preview: bool) {
    let mode = if preview { "preview" } else { "live" };
    counter!(
        "neolaas_lifecycle_actions_total",
        "action" => action.to_string(),
        "mode" => mode
    )
    .increment(1);
}

/// Record that a machine was filtered out
pub fn record_filtered(dimension: &str, rule: &str) {
    counter!(
        "neolaas_lifecycle_filtered_total",
        "dimension" => dimension.to_string(),
        "rule" => rule.to_string()
    )
    .increment(1);
}

/// Record a per-machine dispatch error
pub fn record_dispatch_error(kind: &str) {
    counter!("neolaas_lifecycle_dispatch_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Update the machines by state gauge from one batch's observations.
///
/// Every known state is written, so a state no machine is in any more reads
/// 0 instead of keeping its previous count.
pub fn set_machines_by_state(counts: &HashMap<String, usize>) {
    let mut states: BTreeSet<String> = NodeStatus::iter().map(|s| s.name().to_string()).collect();
    {
        let mut unknown = UNKNOWN_STATES.lock().unwrap_or_else(|e| e.into_inner());
        unknown.extend(counts.keys().filter(|s| !states.contains(*s)).cloned());
        states.extend(unknown.iter().cloned());
    }

    for state in states {
        let count = counts.get(&state).copied().unwrap_or(0);
        gauge!("neolaas_lifecycle_machines_by_state", "state" => state).set(count as f64);
    }
}

/// Record a batch duration
pub fn record_batch_duration(duration: Duration) {
    histogram!("neolaas_lifecycle_batch_duration_seconds").record(duration.as_secs_f64());
}
