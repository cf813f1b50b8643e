//! Dispatcher
//!
//! Resolves and invokes the next action for a single machine:
//!
//! ```text
//! machine.substatus -> state name -> TransitionTable::resolve(target, state) -> Action::apply
//! ```
//!
//! In preview mode the action runs inline and its result is returned. Otherwise
//! it is spawned as a background task and the returned [`Dispatch`] carries the
//! task handle so the batch can join it against a deadline.

use crate::action::Action;
use crate::client::{ControlClient, ExternalCallError};
use crate::machine::{Machine, StatusReadError};
use crate::observability::events;
use crate::options::ProcessingOptions;
use crate::state::state_name;
use crate::table::{TransitionError, TransitionTable};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Per-machine failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    StatusRead(#[from] StatusReadError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{action} for {hostname} failed: {source}")]
    Action {
        action: Action,
        hostname: String,
        #[source]
        source: ExternalCallError,
    },
    #[error("{action} for {hostname} did not finish before the batch deadline")]
    ActionTimedOut { action: Action, hostname: String },
    #[error("{action} for {hostname} aborted: {reason}")]
    ActionAborted {
        action: Action,
        hostname: String,
        reason: String,
    },
}

impl DispatchError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::StatusRead(_) => "status_read",
            DispatchError::Transition(TransitionError::UnknownTarget { .. }) => "unknown_target",
            DispatchError::Transition(TransitionError::UnknownTransition { .. }) => {
                "unknown_transition"
            }
            DispatchError::Transition(TransitionError::Conflict { .. }) => "conflict",
            DispatchError::Action { .. } => "external_call",
            DispatchError::ActionTimedOut { .. } => "timeout",
            DispatchError::ActionAborted { .. } => "aborted",
        }
    }
}

/// Outcome of dispatching one machine.
#[derive(Debug)]
pub struct Dispatch {
    /// Observed state name
    pub current: String,
    /// Resolved action
    pub action: Action,
    hostname: String,
    task: Option<JoinHandle<Result<(), ExternalCallError>>>,
}

impl Dispatch {
    /// Whether the action is still running in the background.
    pub fn is_pending(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for a background action until `deadline`.
    ///
    /// A task that misses the deadline is left running; only its outcome is
    /// reported as timed out.
    pub async fn join(self, deadline: Instant) -> Result<Action, DispatchError> {
        let Some(task) = self.task else {
            return Ok(self.action);
        };

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(Ok(()))) => Ok(self.action),
            Ok(Ok(Err(source))) => Err(DispatchError::Action {
                action: self.action,
                hostname: self.hostname,
                source,
            }),
            Ok(Err(join_error)) => Err(DispatchError::ActionAborted {
                action: self.action,
                hostname: self.hostname,
                reason: join_error.to_string(),
            }),
            Err(_) => Err(DispatchError::ActionTimedOut {
                action: self.action,
                hostname: self.hostname,
            }),
        }
    }
}

/// Resolves and runs actions for individual machines.
pub struct Dispatcher<C> {
    client: Arc<C>,
    table: Arc<TransitionTable>,
    options: Arc<ProcessingOptions>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            table: self.table.clone(),
            options: self.options.clone(),
        }
    }
}

impl<C: ControlClient> Dispatcher<C> {
    pub fn new(client: Arc<C>, table: Arc<TransitionTable>, options: Arc<ProcessingOptions>) -> Self {
        Self {
            client,
            table,
            options,
        }
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Action `machine` needs next, without running it.
    pub fn resolve(&self, machine: &Machine) -> Result<(String, Action), DispatchError> {
        let current = state_name(machine.status_code()?);
        let target = self.options.target.as_str();

        match self.table.resolve(target, &current) {
            Ok(action) => Ok((current, action)),
            Err(e) => {
                events::transition_unresolved(machine.hostname(), target, &current);
                Err(e.into())
            }
        }
    }

    /// Resolve and invoke the next action for `machine`.
    ///
    /// Errors cover status reads and resolution, plus the action's own
    /// failure in preview mode. Background action failures surface through
    /// [`Dispatch::join`].
    #[instrument(skip(self, machine), fields(hostname = %machine.hostname()))]
    pub async fn process_one(&self, machine: &Machine) -> Result<Dispatch, DispatchError> {
        let (current, action) = self.resolve(machine)?;
        debug!(current = %current, action = %action, "Resolved action");

        let hostname = machine.hostname().to_string();

        if self.options.preview {
            action
                .apply(self.client.as_ref(), machine, &self.options)
                .await
                .map_err(|source| DispatchError::Action {
                    action,
                    hostname: hostname.clone(),
                    source,
                })?;

            return Ok(Dispatch {
                current,
                action,
                hostname,
                task: None,
            });
        }

        let client = self.client.clone();
        let options = self.options.clone();
        let machine = machine.clone();
        let task = tokio::spawn(async move { action.apply(client.as_ref(), &machine, &options).await });

        Ok(Dispatch {
            current,
            action,
            hostname,
            task: Some(task),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::RecordingClient;
    use crate::client::Operation;
    use std::time::Duration;

    fn dispatcher(client: RecordingClient, options: ProcessingOptions) -> Dispatcher<RecordingClient> {
        Dispatcher::new(
            Arc::new(client),
            Arc::new(TransitionTable::deployed()),
            Arc::new(options),
        )
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_ready_machine_is_acquired() {
        let d = dispatcher(RecordingClient::new(), ProcessingOptions::default());
        let dispatch = d
            .process_one(&Machine::new("id-1", "web-01", "us-east", 4))
            .await
            .unwrap();
        assert_eq!(dispatch.current, "Ready");
        assert_eq!(dispatch.action, Action::Acquire);
        assert!(dispatch.is_pending());

        assert_eq!(dispatch.join(deadline()).await.unwrap(), Action::Acquire);
        let calls = d.client().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, Operation::Acquire);
        assert_eq!(calls[0].argument, "web-01");
    }

    #[tokio::test]
    async fn test_preview_runs_inline_without_calls() {
        let d = dispatcher(
            RecordingClient::new(),
            ProcessingOptions::default().with_preview(true),
        );
        let dispatch = d
            .process_one(&Machine::new("id-1", "web-01", "us-east", 10))
            .await
            .unwrap();
        assert_eq!(dispatch.action, Action::Deploy);
        assert!(!dispatch.is_pending());
        assert!(d.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_status_read_error() {
        let d = dispatcher(RecordingClient::new(), ProcessingOptions::default());
        let mut machine = Machine::new("id-1", "web-01", "us-east", 4);
        machine.status = None;

        let err = d.process_one(&machine).await.unwrap_err();
        assert!(matches!(err, DispatchError::StatusRead(_)));
        assert_eq!(err.kind(), "status_read");
    }

    #[tokio::test]
    async fn test_unknown_status_code_is_unknown_transition() {
        let d = dispatcher(RecordingClient::new(), ProcessingOptions::default());
        let err = d
            .process_one(&Machine::new("id-1", "web-01", "us-east", 99))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_transition");
        assert!(err.to_string().contains("Unknown(99)"));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let d = dispatcher(
            RecordingClient::new(),
            ProcessingOptions::default().with_target("Ready"),
        );
        let err = d
            .process_one(&Machine::new("id-1", "web-01", "us-east", 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_target");
        assert!(d.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_background_failure_surfaces_on_join() {
        let d = dispatcher(
            RecordingClient::new().failing_for("id-1"),
            ProcessingOptions::default(),
        );
        // Dispatch itself succeeds; the failure belongs to the task
        let dispatch = d
            .process_one(&Machine::new("id-1", "web-01", "us-east", 0))
            .await
            .unwrap();
        let err = dispatch.join(deadline()).await.unwrap_err();
        assert_eq!(err.kind(), "external_call");
        assert!(matches!(err, DispatchError::Action { action: Action::Commission, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_times_out() {
        let d = dispatcher(
            RecordingClient::new().with_delay(Duration::from_secs(60)),
            ProcessingOptions::default(),
        );
        let dispatch = d
            .process_one(&Machine::new("id-1", "web-01", "us-east", 10))
            .await
            .unwrap();
        let err = dispatch
            .join(Instant::now() + Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ActionTimedOut { action: Action::Deploy, .. }));
    }
}
