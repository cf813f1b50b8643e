//! Provisioning Loop
//!
//! Lists the inventory, hands it to the batch processor and logs every
//! per-machine error. Runs a single pass or repeats on a fixed period until
//! shutdown; a failed pass is retried by the next tick.

use anyhow::{Context, Result};
use async_trait::async_trait;
use neolaas_lifecycle::observability::events;
use neolaas_lifecycle::{
    process_all, BatchReport, ControlClient, Dispatcher, FilterSet, LifecycleGraph, Machine, ProcessingOptions,
    TransitionTable,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// State reachability for coverage checks is computed from here.
pub const LIFECYCLE_ROOT: &str = "New";

/// Source of the machines a pass works on.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn machines(&self) -> Result<Vec<Machine>>;
}

pub struct Runner<C> {
    dispatcher: Dispatcher<C>,
    period: Option<Duration>,
}

impl<C: ControlClient + Inventory> Runner<C> {
    /// Fails if a filter pattern does not compile.
    pub fn new(client: Arc<C>, options: ProcessingOptions, period: Option<Duration>) -> Result<Self> {
        FilterSet::compile(&options).context("Invalid filter pattern")?;

        let table = TransitionTable::deployed();
        if !table.has_target(&options.target) {
            warn!(target_state = %options.target, "No transitions defined for target, every machine will error");
        }
        for gap in table.coverage_gaps(&LifecycleGraph::maas(), LIFECYCLE_ROOT) {
            if gap.target == options.target {
                events::coverage_gap(&gap.target, &gap.state);
            }
        }

        Ok(Self {
            dispatcher: Dispatcher::new(client, Arc::new(table), Arc::new(options)),
            period,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// One pass over the current inventory.
    pub async fn run_once(&self) -> Result<BatchReport> {
        let machines = self
            .dispatcher
            .client()
            .machines()
            .await
            .context("Failed to list machines")?;

        let report = process_all(&self.dispatcher, &machines).await?;

        for (idx, err) in report.errors() {
            warn!(
                hostname = %machines[idx].hostname(),
                system_id = %machines[idx].system_id(),
                kind = err.kind(),
                error = %err,
                "Machine not processed"
            );
        }

        Ok(report)
    }

    /// Run until `shutdown` resolves, or once when no period is set.
    ///
    /// A single pass propagates any failure. In periodic mode only an
    /// invalid filter stops the loop; other failures wait for the next tick.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Some(period) = self.period else {
            self.run_once().await?;
            return Ok(());
        };

        info!(period_secs = period.as_secs(), "Starting periodic provisioning");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping provisioning loop");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        if e.downcast_ref::<neolaas_lifecycle::FilterError>().is_some() {
                            return Err(e);
                        }
                        error!(error = %format!("{e:#}"), "Provisioning pass failed");
                    }
                }
            }
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neolaas_lifecycle::ExternalCallError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubFleet {
        machines: Vec<Machine>,
        list_fails: bool,
        lists: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl StubFleet {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Inventory for StubFleet {
        async fn machines(&self) -> Result<Vec<Machine>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            if self.list_fails {
                anyhow::bail!("maas unreachable");
            }
            Ok(self.machines.clone())
        }
    }

    #[async_trait]
    impl ControlClient for StubFleet {
        async fn start(&self, system_id: &str) -> Result<(), ExternalCallError> {
            self.record(format!("start {system_id}"));
            Ok(())
        }

        async fn acquire(&self, hostname: &str) -> Result<(), ExternalCallError> {
            self.record(format!("acquire {hostname}"));
            Ok(())
        }

        async fn commission(&self, system_id: &str) -> Result<(), ExternalCallError> {
            self.record(format!("commission {system_id}"));
            Ok(())
        }
    }

    fn options() -> ProcessingOptions {
        let mut options = ProcessingOptions::default();
        options.filter.zones.include = vec![".*".to_string()];
        options
    }

    fn fleet() -> StubFleet {
        StubFleet {
            machines: vec![
                Machine::new("n1", "web-01", "default", 0),
                Machine::new("n2", "web-02", "default", 4),
                Machine::new("n3", "web-03", "default", 42),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_once() {
        let runner = Runner::new(Arc::new(fleet()), options(), None).unwrap();
        let report = runner.run_once().await.unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.error_count(), 1);
        let mut calls = runner.dispatcher().client().calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["acquire web-02", "commission n1"]);
    }

    #[test]
    fn test_invalid_filter_rejected_up_front() {
        let mut options = options();
        options.filter.hosts.include = vec!["[".to_string()];
        assert!(Runner::new(Arc::new(fleet()), options, None).is_err());
    }

    #[tokio::test]
    async fn test_single_pass_propagates_list_failure() {
        let stub = StubFleet {
            list_fails: true,
            ..Default::default()
        };
        let runner = Runner::new(Arc::new(stub), options(), None).unwrap();
        assert!(runner.run_until(std::future::pending()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_survives_list_failures() {
        let stub = StubFleet {
            list_fails: true,
            ..Default::default()
        };
        let runner = Runner::new(Arc::new(stub), options(), Some(Duration::from_secs(15))).unwrap();

        runner
            .run_until(tokio::time::sleep(Duration::from_secs(40)))
            .await
            .unwrap();

        // Ticks at 0s, 15s and 30s
        assert_eq!(runner.dispatcher().client().lists.load(Ordering::SeqCst), 3);
    }
}
