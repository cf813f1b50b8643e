//! Batch Processor
//!
//! Runs one pass over the machine inventory: compiles the filters once,
//! dispatches every eligible machine in input order, then joins all
//! background actions against a single deadline. The report holds exactly one
//! outcome per input machine, at the machine's input index.

use crate::action::Action;
use crate::client::ControlClient;
use crate::dispatch::{Dispatch, DispatchError, Dispatcher};
use crate::filter::{FilterError, FilterSet, Rejection};
use crate::machine::Machine;
use crate::observability::{events, metrics};
use std::collections::HashMap;
use std::time::Instant as StdInstant;
use tokio::time::Instant;

/// What happened to a machine that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Skipped by a filter; not a failure.
    Filtered(Rejection),
    /// Action resolved and, outside preview mode, completed.
    Completed(Action),
}

pub type MachineOutcome = Result<Disposition, DispatchError>;

/// Per-machine outcomes of one batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<MachineOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Error for machine `index`, if any.
    pub fn error(&self, index: usize) -> Option<&DispatchError> {
        self.outcomes.get(index).and_then(|o| o.as_ref().err())
    }

    /// Input indices and errors of failed machines.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &DispatchError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| o.as_ref().err().map(|e| (idx, e)))
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn filtered_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Ok(Disposition::Filtered(_))))
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Ok(Disposition::Completed(_))))
            .count()
    }
}

/// Process every machine in `machines`.
///
/// Fails only when a filter pattern does not compile, before any machine is
/// touched. Everything else is reported per machine.
pub async fn process_all<C: ControlClient>(
    dispatcher: &Dispatcher<C>,
    machines: &[Machine],
) -> Result<BatchReport, FilterError> {
    let started = StdInstant::now();
    let options = dispatcher.options();
    let filters = FilterSet::compile(options)?;

    let mut outcomes: Vec<MachineOutcome> = Vec::with_capacity(machines.len());
    let mut pending: Vec<(usize, Dispatch)> = Vec::new();
    let mut states: HashMap<String, usize> = HashMap::new();

    for (idx, machine) in machines.iter().enumerate() {
        if let Err(rejection) = filters.check(machine) {
            let patterns = filters.filter(rejection.dimension).patterns(rejection.rule);
            let (dimension, rule) = (rejection.dimension.as_str(), rejection.rule.as_str());
            if options.verbose {
                events::machine_filtered_verbose(machine.hostname(), dimension, rule, &rejection.value, patterns);
            } else {
                events::machine_filtered(machine.hostname(), dimension, rule, &rejection.value, patterns);
            }
            metrics::record_filtered(dimension, rule);
            outcomes.push(Ok(Disposition::Filtered(rejection)));
            continue;
        }

        match dispatcher.process_one(machine).await {
            Ok(dispatch) => {
                *states.entry(dispatch.current.clone()).or_default() += 1;
                outcomes.push(Ok(Disposition::Completed(dispatch.action)));
                if dispatch.is_pending() {
                    pending.push((idx, dispatch));
                }
            }
            Err(e) => outcomes.push(Err(e)),
        }
    }

    let deadline = Instant::now() + options.action_timeout;
    for (idx, dispatch) in pending {
        outcomes[idx] = dispatch.join(deadline).await.map(Disposition::Completed);
    }

    let report = BatchReport { outcomes };

    for (_, error) in report.errors() {
        metrics::record_dispatch_error(error.kind());
    }
    metrics::set_machines_by_state(&states);

    let elapsed = started.elapsed();
    metrics::record_batch_duration(elapsed);
    events::batch_completed(
        report.len(),
        report.len() - report.filtered_count(),
        report.filtered_count(),
        report.error_count(),
        elapsed,
    );

    Ok(report)
}
