//! Lifecycle Actions
//!
//! The fixed vocabulary of operations that move a machine one step toward its
//! target state. Only `Commission`, `Acquire` and `Deploy` reach the control
//! service, and only outside preview mode; the rest report and return.

use crate::client::{ControlClient, ExternalCallError};
use crate::machine::Machine;
use crate::observability::{events, metrics};
use crate::options::ProcessingOptions;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Single next step for a machine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Target reached.
    Done,
    /// Start deployment of an allocated machine.
    Deploy,
    /// Allocate a ready machine by hostname.
    Acquire,
    /// Commission a new machine.
    Commission,
    /// A previous request is still in flight on the service side.
    Wait,
    /// Unrecoverable by automation; needs an operator.
    Fail,
    /// Administratively held; excluded from automatic transitions.
    #[strum(serialize = "admin")]
    #[serde(rename = "admin")]
    AdminState,
}

impl Action {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Apply the action to `machine`.
    ///
    /// Every action logs an `action_invoked` event. Service calls are skipped
    /// when `options.preview` is set.
    pub async fn apply<C>(
        self,
        client: &C,
        machine: &Machine,
        options: &ProcessingOptions,
    ) -> Result<(), ExternalCallError>
    where
        C: ControlClient + ?Sized,
    {
        events::action_invoked(self.name(), machine.hostname(), machine.system_id(), options.preview);
        metrics::record_action(self.name(), options.preview);

        if options.preview {
            return Ok(());
        }

        let result = match self {
            Action::Deploy => client.start(machine.system_id()).await,
            Action::Acquire => client.acquire(machine.hostname()).await,
            Action::Commission => client.commission(machine.system_id()).await,
            Action::Done | Action::Wait | Action::Fail | Action::AdminState => Ok(()),
        };

        if let Err(e) = &result {
            events::action_failed(self.name(), machine.hostname(), &e.to_string());
        }
        result
    }
}
