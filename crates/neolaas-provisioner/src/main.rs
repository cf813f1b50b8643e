//! Neolaas Provisioner - drives MAAS machines toward a target lifecycle state

use anyhow::{bail, Context};
use clap::Parser;
use neolaas_lifecycle::{LifecycleGraph, TransitionTable};
use neolaas_provisioner::cli::{Cli, Commands};
use neolaas_provisioner::config::ProvisionerConfig;
use neolaas_provisioner::maas::MaasClient;
use neolaas_provisioner::observability::{init_metrics, init_tracing, TracingConfig};
use neolaas_provisioner::runner::Runner;
use neolaas_provisioner::version;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("{}", version::build_info());
            Ok(())
        }
        Commands::Table { target } => print_table(target.as_deref()),
        Commands::Check { root } => check_coverage(&root),
        Commands::Run(args) => {
            init_tracing(&TracingConfig {
                log_format: cli.log_format,
                verbose: args.verbose,
            })
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to initialize tracing")?;

            info!(version = %version::full_version(), "Starting neolaas-provisioner");

            let config = ProvisionerConfig::from_args(&args)?;
            if let Some(addr) = config.metrics_addr {
                init_metrics(addr)
                    .map_err(|e| anyhow::anyhow!(e))
                    .context("Failed to start metrics exporter")?;
            }

            info!(
                maas_url = %config.maas.base_url,
                target_state = %config.processing.target,
                preview = config.processing.preview,
                period_secs = config.period.map(|p| p.as_secs()).unwrap_or(0),
                "Configuration loaded"
            );

            let client = Arc::new(MaasClient::new(&config.maas)?);
            let runner = Runner::new(client, config.processing, config.period)?;
            runner.run().await
        }
    }
}

fn print_table(target: Option<&str>) -> anyhow::Result<()> {
    let table = TransitionTable::deployed();
    let entries = match target {
        Some(t) if !table.has_target(t) => bail!("No transitions defined for target '{t}'"),
        Some(t) => table.entries_for(t),
        None => table.entries(),
    };

    println!("{:<12} {:<20} {}", "TARGET", "CURRENT", "ACTION");
    for entry in entries {
        println!("{:<12} {:<20} {}", entry.target, entry.current, entry.action.name());
    }
    Ok(())
}

fn check_coverage(root: &str) -> anyhow::Result<()> {
    let graph = LifecycleGraph::maas();
    if !graph.contains(root) {
        bail!("'{root}' is not a lifecycle state");
    }

    let gaps = TransitionTable::deployed().coverage_gaps(&graph, root);
    if gaps.is_empty() {
        println!("Transition table covers every state reachable from {root}");
        return Ok(());
    }

    for gap in &gaps {
        println!("{}: no transition from {}", gap.target, gap.state);
    }
    bail!("{} reachable state(s) without a transition", gaps.len())
}
