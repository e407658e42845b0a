//! Periodic due-ness loop and the per-service probe pipeline.
//!
//! No scheduling state survives a tick: whether a service is due is derived
//! from its last persisted result, so restarts and multiple instances agree.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::alerting::AlertEvaluator;
use crate::db::models::{ProbeResult, Service};
use crate::db::services::{AlertStore, MonitorStore, ResultStore, ServiceDirectory, StoreError};
use crate::notifications::NotificationService;
use crate::prober::Probe;

pub mod clock;
pub mod lease;
mod pipeline;

pub use clock::{Clock, SystemClock};
pub use lease::{LeaseGuard, ProbeLeases};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),
    #[error("Service is inactive: {0}")]
    ServiceInactive(Uuid),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerSettings {
    pub tick_interval_secs: u64,
    /// Floor applied to every service's own check interval.
    pub min_check_interval_secs: u64,
    pub lease_enabled: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 10,
            min_check_interval_secs: 10,
            lease_enabled: true,
        }
    }
}

impl SchedulerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

/// What one tick decided, per active service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub considered: usize,
    pub dispatched: usize,
    pub skipped_not_due: usize,
    pub skipped_leased: usize,
    /// Services whose last result could not be read this tick.
    pub errored: usize,
}

/// A finished tick: the report plus the still-running pipelines.
pub struct Tick {
    pub report: TickReport,
    pub handles: Vec<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct Scheduler {
    services: Arc<dyn ServiceDirectory>,
    results: Arc<dyn ResultStore>,
    alerts: Arc<dyn AlertStore>,
    prober: Arc<dyn Probe>,
    evaluator: AlertEvaluator,
    notifier: Arc<NotificationService>,
    clock: Arc<dyn Clock>,
    leases: ProbeLeases,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new<S>(
        store: Arc<S>,
        prober: Arc<dyn Probe>,
        notifier: Arc<NotificationService>,
        settings: SchedulerSettings,
    ) -> Self
    where
        S: MonitorStore + 'static,
    {
        Self::from_parts(
            store.clone(),
            store.clone(),
            store,
            prober,
            notifier,
            settings,
        )
    }

    pub fn from_parts(
        services: Arc<dyn ServiceDirectory>,
        results: Arc<dyn ResultStore>,
        alerts: Arc<dyn AlertStore>,
        prober: Arc<dyn Probe>,
        notifier: Arc<NotificationService>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            services,
            results,
            alerts,
            prober,
            evaluator: AlertEvaluator::new(),
            notifier,
            clock: Arc::new(SystemClock),
            leases: ProbeLeases::new(),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn leases(&self) -> &ProbeLeases {
        &self.leases
    }

    /// Ticks immediately, then every `tick_interval`, until `shutdown` turns
    /// true or its sender goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            tick_interval_secs = self.settings.tick_interval().as_secs(),
            min_check_interval_secs = self.settings.min_check_interval_secs,
            lease_enabled = self.settings.lease_enabled,
            "Scheduler started."
        );
        let mut ticker = interval(self.settings.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(tick) => debug!(report = ?tick.report, "Tick complete."),
                        Err(e) => {
                            error!(error = %e, "Failed to list active services, retrying.")
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Scheduler stopped.");
    }

    /// One pass over the active services, spawning a pipeline for each due one.
    pub async fn tick(&self) -> Result<Tick, PipelineError> {
        let services = self.services.list_active_services().await?;
        let now = self.clock.now();
        let mut report = TickReport::default();
        let mut handles = Vec::new();

        for service in services.into_iter().filter(|s| s.is_active) {
            report.considered += 1;

            let last = match self.results.get_last_probe_result(service.id).await {
                Ok(last) => last,
                Err(e) => {
                    report.errored += 1;
                    error!(
                        service_id = %service.id,
                        error = %e,
                        "Failed to read last probe result."
                    );
                    continue;
                }
            };
            if !self.is_due(&service, last.as_ref(), now) {
                report.skipped_not_due += 1;
                continue;
            }

            let lease = if self.settings.lease_enabled {
                match self.leases.try_acquire(service.id) {
                    Some(guard) => Some(guard),
                    None => {
                        report.skipped_leased += 1;
                        debug!(service_id = %service.id, "Probe still in flight, skipping.");
                        continue;
                    }
                }
            } else {
                None
            };

            report.dispatched += 1;
            let this = self.clone();
            handles.push(tokio::spawn(async move {
                let _lease = lease;
                if let Err(e) = this.run_pipeline(&service).await {
                    error!(service_id = %service.id, error = %e, "Probe pipeline aborted.");
                }
            }));
        }

        Ok(Tick { report, handles })
    }

    fn is_due(
        &self,
        service: &Service,
        last: Option<&ProbeResult>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        let Some(last) = last else {
            return true;
        };
        let interval = service.effective_interval(self.settings.min_check_interval_secs);
        match (now - last.checked_at).to_std() {
            Ok(elapsed) => elapsed >= interval,
            // Last result is in the future of our clock.
            Err(_) => false,
        }
    }

    /// Runs the pipeline once for one service, bypassing due-ness. Alerts are
    /// evaluated and saved before the persisted result is returned; only the
    /// notification fan-out runs in the background.
    pub async fn trigger_probe(&self, service_id: Uuid) -> Result<ProbeResult, PipelineError> {
        let service = self
            .services
            .get_service(service_id)
            .await?
            .ok_or(PipelineError::ServiceNotFound(service_id))?;
        if !service.is_active {
            return Err(PipelineError::ServiceInactive(service_id));
        }

        let _lease = if self.settings.lease_enabled {
            self.leases.try_acquire(service_id)
        } else {
            None
        };
        info!(service_id = %service_id, "Manual probe triggered.");
        self.run_pipeline(&service).await
    }
}

#[cfg(test)]
mod tests;
