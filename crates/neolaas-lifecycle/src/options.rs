//! Processing Options
//!
//! Immutable configuration for one batch run. Built once by the caller and
//! shared read-only with every dispatched action.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{Display, EnumString};

/// Default declared target state.
pub const DEFAULT_TARGET: &str = "Deployed";

/// Default bound on joining concurrently running actions.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// What an include list with no patterns admits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EmptyFilterPolicy {
    /// Empty include list matches every value.
    IncludeAll,
    /// Empty include list matches nothing.
    IncludeNone,
}

/// Include/exclude pattern lists for one filter dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternLists {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Host and zone filters, in the JSON shape operators write:
///
/// ```json
/// {"hosts": {"include": ["^web-"]}, "zones": {"include": ["^us-east$"]}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub hosts: PatternLists,
    pub zones: PatternLists,
}

impl FilterConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Options shared by every machine in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    pub filter: FilterConfig,
    /// Empty host include list semantics
    pub empty_hosts: EmptyFilterPolicy,
    /// Empty zone include list semantics
    pub empty_zones: EmptyFilterPolicy,
    /// Emit a diagnostic for every filtered machine
    pub verbose: bool,
    /// Resolve and log actions without calling the control service; actions
    /// run inline instead of as background tasks
    pub preview: bool,
    /// Lifecycle state machines are driven toward
    pub target: String,
    /// How long the batch waits for background actions before reporting them
    /// as timed out
    pub action_timeout: Duration,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            empty_hosts: EmptyFilterPolicy::IncludeAll,
            empty_zones: EmptyFilterPolicy::IncludeNone,
            verbose: false,
            preview: false,
            target: DEFAULT_TARGET.to_string(),
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }
}

impl ProcessingOptions {
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_keep_asymmetric_empty_policy() {
        let options = ProcessingOptions::default();
        assert_eq!(options.empty_hosts, EmptyFilterPolicy::IncludeAll);
        assert_eq!(options.empty_zones, EmptyFilterPolicy::IncludeNone);
        assert_eq!(options.target, "Deployed");
        assert!(!options.preview);
    }

    #[test]
    fn test_filter_json() {
        let filter =
            FilterConfig::from_json(r#"{"hosts": {"include": ["^web-"], "exclude": ["-old$"]}}"#)
                .unwrap();
        assert_eq!(filter.hosts.include, vec!["^web-"]);
        assert_eq!(filter.hosts.exclude, vec!["-old$"]);
        assert!(filter.zones.include.is_empty());

        assert_eq!(FilterConfig::from_json("{}").unwrap(), FilterConfig::default());
        assert!(FilterConfig::from_json(r#"{"hosts": []}"#).is_err());
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            EmptyFilterPolicy::from_str("include-none").unwrap(),
            EmptyFilterPolicy::IncludeNone
        );
        assert_eq!(EmptyFilterPolicy::IncludeAll.to_string(), "include-all");
    }
}
