//! Command line interface

use clap::{Args, Parser, Subcommand};
use neolaas_lifecycle::options::DEFAULT_TARGET;
use neolaas_lifecycle::EmptyFilterPolicy;
use std::net::SocketAddr;

#[derive(Debug, Parser)]
#[command(name = "neolaas-provisioner")]
#[command(about = "Drives MAAS machines toward a declared lifecycle state")]
pub struct Cli {
    /// Log output format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process the MAAS inventory, once or periodically
    Run(RunArgs),
    /// Print the transition table
    Table {
        /// Only print rows for this target
        #[arg(long)]
        target: Option<String>,
    },
    /// Check the transition table against the lifecycle graph
    Check {
        /// State reachability is computed from
        #[arg(long, default_value = "New")]
        root: String,
    },
    /// Print build information
    Version,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub maas: MaasArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Lifecycle state to drive machines toward
    #[arg(long, env = "PROVISIONER_TARGET", default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Log intended actions without calling MAAS
    #[arg(long, env = "PROVISIONER_PREVIEW")]
    pub preview: bool,

    /// Log filtering decisions and debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Seconds between passes; 0 runs a single pass
    #[arg(long, env = "PROVISIONER_PERIOD", default_value_t = 15)]
    pub period: u64,

    /// Seconds a pass waits for background actions
    #[arg(long, default_value_t = 30)]
    pub action_timeout: u64,

    /// Address for the Prometheus metrics listener
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Args)]
pub struct MaasArgs {
    /// MAAS base URL
    #[arg(long = "maas-url", env = "MAAS_URL", default_value = "http://localhost/MAAS")]
    pub url: String,

    /// MAAS API key, `consumer:token:secret`
    #[arg(long, env = "MAAS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// MAAS API version
    #[arg(long, env = "MAAS_API_VERSION", default_value = "1.0")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Filter document, e.g. `{"hosts":{"include":["^web-"]},"zones":{"include":[".*"]}}`
    #[arg(long = "filter", env = "PROVISIONER_FILTER")]
    pub json: Option<String>,

    /// Hostname include pattern (repeatable)
    #[arg(long = "include-host", value_name = "REGEX")]
    pub include_hosts: Vec<String>,

    /// Hostname exclude pattern (repeatable)
    #[arg(long = "exclude-host", value_name = "REGEX")]
    pub exclude_hosts: Vec<String>,

    /// Zone include pattern (repeatable)
    #[arg(long = "include-zone", value_name = "REGEX")]
    pub include_zones: Vec<String>,

    /// Zone exclude pattern (repeatable)
    #[arg(long = "exclude-zone", value_name = "REGEX")]
    pub exclude_zones: Vec<String>,

    /// What an empty hostname include list admits
    #[arg(long, default_value = "include-all")]
    pub empty_hosts: EmptyFilterPolicy,

    /// What an empty zone include list admits
    #[arg(long, default_value = "include-none")]
    pub empty_zones: EmptyFilterPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "neolaas-provisioner",
            "run",
            "--api-key",
            "a:b:c",
            "--include-host",
            "^web-",
            "--include-host",
            "^db-",
            "--include-zone",
            ".*",
            "--empty-zones",
            "include-all",
            "--period",
            "0",
            "--preview",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.maas.api_key, "a:b:c");
        assert_eq!(args.filter.include_hosts, vec!["^web-", "^db-"]);
        assert_eq!(args.filter.empty_hosts, EmptyFilterPolicy::IncludeAll);
        assert_eq!(args.filter.empty_zones, EmptyFilterPolicy::IncludeAll);
        assert_eq!(args.period, 0);
        assert!(args.preview);
        assert_eq!(args.target, "Deployed");
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let result = Cli::try_parse_from([
            "neolaas-provisioner",
            "run",
            "--api-key",
            "a:b:c",
            "--empty-hosts",
            "sometimes",
        ]);
        assert!(result.is_err());
    }
}
