use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt, stream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::executor::MonitoringExecutor;
use super::types::ProbeStatus;
use crate::alert::{Alert, AlertDispatcher};
use crate::config::{Config, MonitorConfig};
use crate::database::{Database, Site};
use crate::Result;

/// What one site contributed to a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteOutcome {
    pub status: ProbeStatus,
    pub recorded: bool,
    pub alerts: usize,
}

/// Totals for one pass over the enabled sites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub probed: usize,
    pub up: usize,
    pub down: usize,
    pub alerts: usize,
    pub record_failures: usize,
    /// Sites whose probe panicked
    pub faults: usize,
}

/// How a site's turn in the cycle ended
enum SiteTurn {
    Skipped,
    Checked(SiteOutcome),
    Faulted,
}

impl CycleSummary {
    fn record(&mut self, turn: SiteTurn) {
        match turn {
            SiteTurn::Skipped => {}
            SiteTurn::Checked(outcome) => self.add(outcome),
            SiteTurn::Faulted => self.faults += 1,
        }
    }

    fn add(&mut self, outcome: SiteOutcome) {
        self.probed += 1;
        match outcome.status {
            ProbeStatus::Up => self.up += 1,
            ProbeStatus::Down => self.down += 1,
        }
        self.alerts += outcome.alerts;
        if !outcome.recorded {
            self.record_failures += 1;
        }
    }
}

/// Monitoring scheduler - drives the probing cadence for the whole fleet.
///
/// Every enabled site is probed once per cycle; the per-site
/// `check_interval` is stored but does not schedule sites individually.
pub struct MonitoringScheduler {
    database: Arc<dyn Database>,
    executor: Arc<MonitoringExecutor>,
    dispatcher: Arc<AlertDispatcher>,
    settings: MonitorConfig,
}

impl MonitoringScheduler {
    /// Build the network-backed scheduler from the startup configuration
    pub fn new(config: &Config, database: Arc<dyn Database>) -> Result<Self> {
        Ok(Self::with_components(
            database,
            Arc::new(MonitoringExecutor::new(&config.monitor)?),
            Arc::new(AlertDispatcher::from_config(&config.notifications)?),
            config.monitor.clone(),
        ))
    }

    pub fn with_components(
        database: Arc<dyn Database>,
        executor: Arc<MonitoringExecutor>,
        dispatcher: Arc<AlertDispatcher>,
        settings: MonitorConfig,
    ) -> Self {
        Self { database, executor, dispatcher, settings }
    }

    /// Run the loop as a background task until `shutdown` flips to true
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Cycle forever; faults are logged and the next cycle starts after the pause
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Monitoring started (cycle pause {}s, site pause {}s, {} concurrent probe(s))",
            self.settings.cycle_pause_seconds,
            self.settings.site_pause_seconds,
            self.settings.max_concurrent_probes
        );

        while !*shutdown.borrow() {
            match AssertUnwindSafe(self.run_cycle(&shutdown)).catch_unwind().await {
                Ok(Ok(summary)) => debug!(
                    "Cycle finished: {} probed, {} up, {} down, {} alert(s), {} fault(s)",
                    summary.probed, summary.up, summary.down, summary.alerts, summary.faults
                ),
                Ok(Err(e)) => error!("Monitoring cycle failed: {}", e),
                Err(_) => error!("Monitoring cycle panicked, retrying after pause"),
            }

            if pause(self.settings.cycle_pause(), &mut shutdown).await {
                break;
            }
        }

        info!("Monitoring stopped");
    }

    /// One pass over the currently enabled sites.
    ///
    /// Fails only if the site list cannot be fetched. A stop request is
    /// honoured between probes, never in the middle of one.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> Result<CycleSummary> {
        let sites = self.database.get_enabled_sites().await?;
        debug!("Probing {} enabled site(s)", sites.len());

        let site_pause = self.settings.site_pause();
        let turns: Vec<SiteTurn> = stream::iter(sites)
            .map(|site| {
                let mut shutdown = shutdown.clone();
                async move {
                    if *shutdown.borrow() {
                        return SiteTurn::Skipped;
                    }
                    // A panicking probe must not take the rest of the cycle with it
                    let turn = match AssertUnwindSafe(self.check_site(&site)).catch_unwind().await {
                        Ok(outcome) => SiteTurn::Checked(outcome),
                        Err(_) => {
                            error!(site_id = site.id, "Probe of {} panicked, moving on", site.url);
                            SiteTurn::Faulted
                        }
                    };
                    pause(site_pause, &mut shutdown).await;
                    turn
                }
            })
            .buffer_unordered(self.settings.max_concurrent_probes.max(1))
            .collect()
            .await;

        let mut summary = CycleSummary::default();
        for turn in turns {
            summary.record(turn);
        }
        Ok(summary)
    }

    /// Probe one site, record the result and raise any alerts
    pub async fn check_site(&self, site: &Site) -> SiteOutcome {
        let report = self.executor.execute_check(site).await;
        let mut alerts = 0;

        if let Some(certificate) = report.certificate_expiry() {
            if certificate.days_left < self.settings.ssl_warning_days {
                warn!(site_id = site.id, "SSL certificate for {} expires in {} day(s)", site.url, certificate.days_left);
                self.dispatcher.dispatch(&Alert::certificate_expiring(site, certificate)).await;
                alerts += 1;
            }
        }

        let recorded = match self.database.save_result(&report.result).await {
            Ok(_) => true,
            Err(e) => {
                error!(site_id = site.id, "Failed to record result for {}: {}", site.url, e);
                false
            }
        };

        if let Some(alert) = Alert::site_down(site, &report.result, report.certificate_expiry()) {
            self.dispatcher.dispatch(&alert).await;
            alerts += 1;
        }

        let result = &report.result;
        info!(
            site_id = site.id,
            "{} - Status: {} - Response: {:?}{}",
            site.url,
            result.status,
            result.response_time,
            result.failure.as_ref().map(|e| format!(" - {e}")).unwrap_or_default()
        );

        SiteOutcome { status: result.status, recorded, alerts }
    }
}

/// Sleep for `duration`; returns true if a stop was requested meanwhile
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
