use tracing::{error, info};

use super::{PipelineError, Scheduler};
use crate::db::models::{ProbeResult, Service};

impl Scheduler {
    /// probe → persist result → evaluate → persist alerts → notify.
    ///
    /// Fails only if the result cannot be persisted. Alert-phase failures are
    /// logged and end the pipeline for this tick.
    pub(super) async fn run_pipeline(
        &self,
        service: &Service,
    ) -> Result<ProbeResult, PipelineError> {
        let outcome = self.prober.probe(service).await;
        let saved = self
            .results
            .save_probe_result(outcome.into_new_result(service.id))
            .await?;
        info!(
            service_id = %service.id,
            service = %service.name,
            status = %saved.status,
            response_time_ms = ?saved.response_time_ms,
            "Probe complete."
        );

        self.raise_alerts(service, &saved).await;
        Ok(saved)
    }

    async fn raise_alerts(&self, service: &Service, current: &ProbeResult) {
        let previous = match self
            .results
            .get_probe_result_before(service.id, current.id)
            .await
        {
            Ok(previous) => previous,
            Err(e) => {
                error!(
                    service_id = %service.id,
                    error = %e,
                    "Failed to read previous probe result; skipping evaluation."
                );
                return;
            }
        };

        for new_alert in self.evaluator.evaluate(service, current, previous.as_ref()) {
            match self.alerts.save_alert(new_alert).await {
                Ok(alert) => {
                    info!(
                        service_id = %service.id,
                        alert_id = %alert.id,
                        alert_type = %alert.alert_type,
                        "Alert raised."
                    );
                    self.notifier.dispatch(alert, service.clone());
                }
                Err(e) => {
                    error!(service_id = %service.id, error = %e, "Failed to persist alert.");
                    return;
                }
            }
        }
    }
}
