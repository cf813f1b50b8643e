//! Inventory machine records
//!
//! A read-only view of one machine as reported by the inventory service.
//! Nothing in this crate mutates a machine; state changes happen on the
//! service side and are observed on a later poll.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field the inventory service reports the lifecycle status code in.
pub const STATUS_FIELD: &str = "substatus";

/// The status code could not be read from a machine record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusReadError {
    #[error("machine {hostname} has no `{STATUS_FIELD}` field")]
    Missing { hostname: String },
    #[error("machine {hostname} has non-integer `{STATUS_FIELD}`: {value}")]
    NotAnInteger { hostname: String, value: String },
}

/// Zone reference embedded in a machine record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRef {
    pub name: String,
}

/// Machine record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Service-assigned identifier used to address the machine's sub-resource
    pub system_id: String,
    pub hostname: String,
    #[serde(default)]
    pub zone: ZoneRef,
    /// Raw status value, kept untyped so a malformed record is a per-machine
    /// error instead of failing the whole inventory listing.
    #[serde(rename = "substatus", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
}

impl Machine {
    /// Build a record with a known status code.
    pub fn new(
        system_id: impl Into<String>,
        hostname: impl Into<String>,
        zone: impl Into<String>,
        status_code: i64,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            hostname: hostname.into(),
            zone: ZoneRef { name: zone.into() },
            status: Some(serde_json::Value::from(status_code)),
        }
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn zone(&self) -> &str {
        &self.zone.name
    }

    /// Integer lifecycle status code.
    pub fn status_code(&self) -> Result<i64, StatusReadError> {
        let value = self.status.as_ref().ok_or_else(|| StatusReadError::Missing {
            hostname: self.hostname.clone(),
        })?;

        value.as_i64().ok_or_else(|| StatusReadError::NotAnInteger {
            hostname: self.hostname.clone(),
            value: value.to_string(),
        })
    }
}
