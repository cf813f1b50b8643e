//! Provisioner Configuration
//!
//! Assembles the run configuration from parsed CLI arguments (which already
//! carry their environment variable overrides). The JSON filter document and
//! the repeatable `--include-*`/`--exclude-*` flags are merged: flag patterns
//! are appended to the document's lists.

use crate::cli::{FilterArgs, MaasArgs, RunArgs};
use anyhow::{Context, Result};
use neolaas_lifecycle::{FilterConfig, ProcessingOptions};
use std::net::SocketAddr;
use std::time::Duration;

/// MAAS connection settings.
#[derive(Debug, Clone)]
pub struct MaasConfig {
    /// Base URL, e.g. `http://maas.lab:5240/MAAS`
    pub base_url: String,
    /// `consumer:token:secret`
    pub api_key: String,
    pub api_version: String,
    pub request_timeout: Duration,
}

impl From<&MaasArgs> for MaasConfig {
    fn from(args: &MaasArgs) -> Self {
        Self {
            base_url: args.url.clone(),
            api_key: args.api_key.clone(),
            api_version: args.api_version.clone(),
            request_timeout: Duration::from_secs(args.request_timeout),
        }
    }
}

/// Everything `run` needs.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub maas: MaasConfig,
    pub processing: ProcessingOptions,
    /// Time between passes; `None` runs a single pass
    pub period: Option<Duration>,
    pub metrics_addr: Option<SocketAddr>,
}

impl ProvisionerConfig {
    pub fn from_args(args: &RunArgs) -> Result<Self> {
        let processing = ProcessingOptions {
            filter: filter_config(&args.filter)?,
            empty_hosts: args.filter.empty_hosts,
            empty_zones: args.filter.empty_zones,
            verbose: args.verbose,
            preview: args.preview,
            target: args.target.clone(),
            action_timeout: Duration::from_secs(args.action_timeout),
        };

        Ok(Self {
            maas: MaasConfig::from(&args.maas),
            processing,
            period: (args.period > 0).then(|| Duration::from_secs(args.period)),
            metrics_addr: args.metrics_addr,
        })
    }
}

fn filter_config(args: &FilterArgs) -> Result<FilterConfig> {
    let mut filter = match &args.json {
        Some(json) if !json.trim().is_empty() => {
            FilterConfig::from_json(json).context("Failed to parse filter document")?
        }
        _ => FilterConfig::default(),
    };

    filter.hosts.include.extend(args.include_hosts.iter().cloned());
    filter.hosts.exclude.extend(args.exclude_hosts.iter().cloned());
    filter.zones.include.extend(args.include_zones.iter().cloned());
    filter.zones.exclude.extend(args.exclude_zones.iter().cloned());

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neolaas_lifecycle::EmptyFilterPolicy;

    fn run_args() -> RunArgs {
        RunArgs {
            maas: MaasArgs {
                url: "http://maas.lab/MAAS".to_string(),
                api_key: "a:b:c".to_string(),
                api_version: "1.0".to_string(),
                request_timeout: 10,
            },
            filter: FilterArgs {
                json: None,
                include_hosts: Vec::new(),
                exclude_hosts: Vec::new(),
                include_zones: Vec::new(),
                exclude_zones: Vec::new(),
                empty_hosts: EmptyFilterPolicy::IncludeAll,
                empty_zones: EmptyFilterPolicy::IncludeNone,
            },
            target: "Deployed".to_string(),
            preview: false,
            verbose: false,
            period: 15,
            action_timeout: 30,
            metrics_addr: None,
        }
    }

    #[test]
    fn test_flags_append_to_filter_document() {
        let mut args = run_args();
        args.filter.json = Some(r#"{"hosts": {"include": ["^web-"]}, "zones": {"include": [".*"]}}"#.to_string());
        args.filter.include_hosts = vec!["^db-".to_string()];
        args.filter.exclude_zones = vec!["^lab$".to_string()];

        let config = ProvisionerConfig::from_args(&args).unwrap();
        let filter = &config.processing.filter;
        assert_eq!(filter.hosts.include, vec!["^web-", "^db-"]);
        assert_eq!(filter.zones.include, vec![".*"]);
        assert_eq!(filter.zones.exclude, vec!["^lab$"]);
    }

    #[test]
    fn test_invalid_filter_document() {
        let mut args = run_args();
        args.filter.json = Some("{not json".to_string());
        assert!(ProvisionerConfig::from_args(&args).is_err());
    }

    #[test]
    fn test_zero_period_is_single_pass() {
        let mut args = run_args();
        args.period = 0;
        assert_eq!(ProvisionerConfig::from_args(&args).unwrap().period, None);

        args.period = 15;
        assert_eq!(
            ProvisionerConfig::from_args(&args).unwrap().period,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_processing_options() {
        let mut args = run_args();
        args.preview = true;
        args.target = "Ready".to_string();
        let config = ProvisionerConfig::from_args(&args).unwrap();
        assert!(config.processing.preview);
        assert_eq!(config.processing.target, "Ready");
        assert_eq!(config.processing.empty_zones, EmptyFilterPolicy::IncludeNone);
        assert_eq!(config.maas.request_timeout, Duration::from_secs(10));
    }
}
