//! Machine lifecycle states
//!
//! The inventory service reports a machine's lifecycle stage as an integer
//! status code. This module maps those codes to the named states used by the
//! transition table, and classifies each state so callers can tell transient
//! stages apart from rest points, failures and administrative holds.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Node status as reported by MAAS.
///
/// Discriminants are the wire codes; `Display` yields the state name used as
/// the key in [`TransitionTable`](crate::TransitionTable).
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
    FromRepr,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum NodeStatus {
    New = 0,
    Commissioning = 1,
    FailedCommissioning = 2,
    Missing = 3,
    Ready = 4,
    Reserved = 5,
    Deployed = 6,
    Retired = 7,
    Broken = 8,
    Deploying = 9,
    Allocated = 10,
    FailedDeployment = 11,
    Releasing = 12,
    FailedReleasing = 13,
    DiskErasing = 14,
    FailedDiskErasing = 15,
}

/// Coarse classification of a lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StateClass {
    /// Transient; expected to change without intervention.
    Progressing,
    /// A reachable rest point.
    Stable,
    /// Requires operator escalation; never auto-recovered.
    Failed,
    /// Deliberately frozen by an operator.
    Administrative,
}

impl NodeStatus {
    /// Look up a status by its integer code.
    pub fn from_code(code: i64) -> Option<Self> {
        u8::try_from(code).ok().and_then(Self::from_repr)
    }

    /// Integer code as sent on the wire.
    pub fn code(self) -> i64 {
        self as u8 as i64
    }

    /// State name, as used for transition lookups.
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn class(self) -> StateClass {
        use NodeStatus::*;
        match self {
            Commissioning | Deploying | Releasing | DiskErasing => StateClass::Progressing,
            New | Ready | Allocated | Deployed => StateClass::Stable,
            Missing | Broken | FailedCommissioning | FailedDeployment | FailedReleasing
            | FailedDiskErasing => StateClass::Failed,
            Retired | Reserved => StateClass::Administrative,
        }
    }
}

/// Name for an arbitrary status code.
///
/// Codes outside the known set map to `Unknown(<code>)`, a name no
/// transition table declares, so resolution reports it as an unknown
/// transition rather than silently picking an action.
pub fn state_name(code: i64) -> String {
    match NodeStatus::from_code(code) {
        Some(status) => status.name().to_string(),
        None => format!("Unknown({code})"),
    }
}
