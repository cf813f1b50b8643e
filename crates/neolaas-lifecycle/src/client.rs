//! Control service seam
//!
//! The engine needs exactly three side-effecting operations from the
//! inventory/control service. Transport, authentication and serialisation
//! belong to the implementor; implementations must be safe to share across
//! concurrently running actions.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Operation names as understood by the control service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Start,
    Acquire,
    Commission,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Acquire => "acquire",
            Operation::Commission => "commission",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call to the control service failed.
#[derive(Debug, Error)]
pub enum ExternalCallError {
    /// Request never produced a response.
    #[error("{operation} request for {machine} failed: {source}")]
    Transport {
        operation: Operation,
        machine: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Service answered with a non-success status.
    #[error("{operation} request for {machine} rejected with {status}: {body}")]
    Rejected {
        operation: Operation,
        machine: String,
        status: u16,
        body: String,
    },
}

impl ExternalCallError {
    pub fn operation(&self) -> Operation {
        match self {
            ExternalCallError::Transport { operation, .. }
            | ExternalCallError::Rejected { operation, .. } => *operation,
        }
    }
}

/// Side-effecting operations against a machine's record on the control
/// service.
#[async_trait]
pub trait ControlClient: Send + Sync + 'static {
    /// Start deployment of an allocated machine.
    async fn start(&self, system_id: &str) -> Result<(), ExternalCallError>;

    /// Allocate the machine with the given hostname to this operator.
    async fn acquire(&self, hostname: &str) -> Result<(), ExternalCallError>;

    /// Begin commissioning a new machine.
    async fn commission(&self, system_id: &str) -> Result<(), ExternalCallError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording stub shared by the engine's tests.

    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub operation: Operation,
        pub argument: String,
    }

    #[derive(Default)]
    pub struct RecordingClient {
        calls: Mutex<Vec<Call>>,
        failing: HashSet<String>,
        delay: Option<Duration>,
    }

    impl RecordingClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject every call whose argument is `argument`.
        pub fn failing_for(mut self, argument: &str) -> Self {
            self.failing.insert(argument.to_string());
            self
        }

        /// Sleep before answering.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        async fn record(&self, operation: Operation, argument: &str) -> Result<(), ExternalCallError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push(Call {
                operation,
                argument: argument.to_string(),
            });
            if self.failing.contains(argument) {
                return Err(ExternalCallError::Rejected {
                    operation,
                    machine: argument.to_string(),
                    status: 409,
                    body: "conflict".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ControlClient for RecordingClient {
        async fn start(&self, system_id: &str) -> Result<(), ExternalCallError> {
            self.record(Operation::Start, system_id).await
        }

        async fn acquire(&self, hostname: &str) -> Result<(), ExternalCallError> {
            self.record(Operation::Acquire, hostname).await
        }

        async fn commission(&self, system_id: &str) -> Result<(), ExternalCallError> {
            self.record(Operation::Commission, system_id).await
        }
    }
}
