//! Structured Events
//!
//! One function per event kind so field names stay consistent across the
//! engine.
//!
//! Event types:
//! - `action_invoked` - An action was applied to a machine
//! - `action_failed` - A control service call made by an action failed
//! - `machine_filtered` - A machine was skipped by the host or zone filter
//! - `transition_unresolved` - No action is declared for a machine's state
//! - `coverage_gap` - A reachable lifecycle state has no table entry
//! - `batch_completed` - A batch run finished

use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Emit an action invoked event
pub fn action_invoked(action: &str, hostname: &str, system_id: &str, preview: bool) {
    info!(
        event_type = "action_invoked",
        action = %action,
        hostname = %hostname,
        system_id = %system_id,
        preview = preview,
        "{}: {}",
        action.to_uppercase(),
        hostname
    );
}

/// Emit an action failed event
pub fn action_failed(action: &str, hostname: &str, error: &str) {
    error!(
        event_type = "action_failed",
        action = %action,
        hostname = %hostname,
        error = %error,
        "Action failed"
    );
}

/// Emit a machine filtered event
pub fn machine_filtered(hostname: &str, dimension: &str, rule: &str, value: &str, patterns: &[String]) {
    debug!(
        event_type = "machine_filtered",
        hostname = %hostname,
        dimension = %dimension,
        rule = %rule,
        value = %value,
        patterns = ?patterns,
        "Ignoring machine"
    );
}

/// Emit a verbose machine filtered event at info level
pub fn machine_filtered_verbose(
    hostname: &str,
    dimension: &str,
    rule: &str,
    value: &str,
    patterns: &[String],
) {
    info!(
        event_type = "machine_filtered",
        hostname = %hostname,
        dimension = %dimension,
        rule = %rule,
        value = %value,
        patterns = ?patterns,
        "Ignoring machine '{}' as its {} '{}' didn't pass {} filter",
        hostname,
        dimension,
        value,
        rule
    );
}

/// Emit a transition unresolved event
pub fn transition_unresolved(hostname: &str, target: &str, current: &str) {
    warn!(
        event_type = "transition_unresolved",
        hostname = %hostname,
        target = %target,
        current = %current,
        "Unable to find transition from current state to target state"
    );
}

/// Emit a coverage gap event
pub fn coverage_gap(target: &str, state: &str) {
    warn!(
        event_type = "coverage_gap",
        target = %target,
        state = %state,
        "Reachable lifecycle state has no transition toward target"
    );
}

/// Emit a batch completed event
pub fn batch_completed(total: usize, dispatched: usize, filtered: usize, errors: usize, elapsed: Duration) {
    info!(
        event_type = "batch_completed",
        total = total,
        dispatched = dispatched,
        filtered = filtered,
        errors = errors,
        elapsed_ms = elapsed.as_millis() as u64,
        "Batch completed"
    );
}
