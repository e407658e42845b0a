use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::clock::test_support::ManualClock;
use super::*;
use crate::db::enums::{AlertType, Channel, ProbeStatus, ServiceType};
use crate::db::models::{AlertSubscription, NewProbeResult};
use crate::db::services::MemoryStore;
use crate::notifications::ProviderChain;
use crate::notifications::chain::test_support::FakeSender;
use crate::prober::{ProbeError, ProbeOutcome};

/// Returns scripted statuses in order, then `Up` forever.
struct FakeProbe {
    script: Mutex<VecDeque<ProbeStatus>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl FakeProbe {
    fn new(script: &[ProbeStatus]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(&[])
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for FakeProbe {
    async fn probe(&self, _service: &Service) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next.unwrap_or(ProbeStatus::Up) {
            ProbeStatus::Down => ProbeOutcome::down(
                ProbeError::Transport("connection refused".to_string()),
                Some(3),
                None,
            ),
            _ => ProbeOutcome::up(25, Some(200)),
        }
    }
}

/// Fails every save for one service, delegating everything else.
struct FailingResults {
    inner: Arc<MemoryStore>,
    failing: Uuid,
}

#[async_trait]
impl ResultStore for FailingResults {
    async fn save_probe_result(&self, result: NewProbeResult) -> Result<ProbeResult, StoreError> {
        if result.service_id == self.failing {
            return Err(StoreError::Corrupt("disk full".to_string()));
        }
        self.inner.save_probe_result(result).await
    }

    async fn get_last_probe_result(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError> {
        self.inner.get_last_probe_result(service_id).await
    }

    async fn get_probe_result_before(
        &self,
        service_id: Uuid,
        before_result_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError> {
        self.inner.get_probe_result_before(service_id, before_result_id).await
    }

    async fn list_probe_results(
        &self,
        service_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ProbeResult>, StoreError> {
        self.inner.list_probe_results(service_id, limit).await
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    probe: Arc<FakeProbe>,
    clock: Arc<ManualClock>,
    email: Arc<FakeSender>,
    notifier: Arc<NotificationService>,
    scheduler: Scheduler,
}

fn harness(probe: FakeProbe, settings: SchedulerSettings) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let email = Arc::new(FakeSender::new("email", true, true));
    let notifier = Arc::new(NotificationService::with_chains(
        store.clone(),
        "PulseWatch".to_string(),
        ProviderChain::default().push(email.clone()),
        ProviderChain::default(),
        ProviderChain::default(),
    ));
    let probe = Arc::new(probe);
    let clock = Arc::new(ManualClock::new());
    let scheduler = Scheduler::new(store.clone(), probe.clone(), notifier.clone(), settings)
        .with_clock(clock.clone());
    Harness {
        store,
        probe,
        clock,
        email,
        notifier,
        scheduler,
    }
}

fn service(name: &str, check_interval_secs: i32) -> Service {
    Service {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        name: name.to_string(),
        target: "127.0.0.1:9".to_string(),
        service_type: ServiceType::Tcp,
        check_interval_secs,
        timeout_secs: 1,
        expected_status_code: None,
        latency_threshold_ms: None,
        is_active: true,
    }
}

async fn finish(tick: Tick) -> TickReport {
    for handle in tick.handles {
        handle.await.unwrap();
    }
    tick.report
}

#[tokio::test]
async fn inactive_services_are_never_probed() {
    let h = harness(FakeProbe::new(&[]), SchedulerSettings::default());
    let mut paused = service("paused", 60);
    paused.is_active = false;
    h.store.insert_service(paused.clone());

    let report = finish(h.scheduler.tick().await.unwrap()).await;

    assert_eq!(report, TickReport::default());
    assert_eq!(h.probe.calls(), 0);
    assert!(matches!(
        h.scheduler.trigger_probe(paused.id).await,
        Err(PipelineError::ServiceInactive(id)) if id == paused.id
    ));
    assert_eq!(h.probe.calls(), 0);
}

#[tokio::test]
async fn scheduled_probes_are_separated_by_the_interval() {
    let h = harness(FakeProbe::new(&[]), SchedulerSettings::default());
    let svc = service("api", 60);
    h.store.insert_service(svc.clone());

    let first = finish(h.scheduler.tick().await.unwrap()).await;
    assert_eq!(first.dispatched, 1);

    let again = finish(h.scheduler.tick().await.unwrap()).await;
    assert_eq!(again.skipped_not_due, 1);

    h.clock.advance(ChronoDuration::seconds(30));
    let halfway = finish(h.scheduler.tick().await.unwrap()).await;
    assert_eq!(halfway.skipped_not_due, 1);

    h.clock.advance(ChronoDuration::seconds(31));
    let due = finish(h.scheduler.tick().await.unwrap()).await;
    assert_eq!(due.dispatched, 1);
    assert_eq!(h.probe.calls(), 2);
}

#[tokio::test]
async fn short_intervals_are_raised_to_the_floor() {
    let h = harness(FakeProbe::new(&[]), SchedulerSettings::default());
    h.store.insert_service(service("chatty", 1));

    finish(h.scheduler.tick().await.unwrap()).await;
    h.clock.advance(ChronoDuration::seconds(5));
    let early = finish(h.scheduler.tick().await.unwrap()).await;
    assert_eq!(early.skipped_not_due, 1);

    h.clock.advance(ChronoDuration::seconds(6));
    let due = finish(h.scheduler.tick().await.unwrap()).await;
    assert_eq!(due.dispatched, 1);
}

#[tokio::test]
async fn held_lease_skips_a_slow_service() {
    let h = harness(
        FakeProbe::slow(Duration::from_millis(200)),
        SchedulerSettings::default(),
    );
    let svc = service("slow", 60);
    h.store.insert_service(svc.clone());

    let first = h.scheduler.tick().await.unwrap();
    assert_eq!(first.report.dispatched, 1);
    assert!(h.scheduler.leases().is_held(svc.id));

    // No result persisted yet, so the service is still due.
    let second = finish(h.scheduler.tick().await.unwrap()).await;
    assert_eq!(second.skipped_leased, 1);
    assert_eq!(second.dispatched, 0);

    finish(first).await;
    assert!(!h.scheduler.leases().is_held(svc.id));
    assert_eq!(h.probe.calls(), 1);
}

#[tokio::test]
async fn disabled_lease_allows_overlapping_probes() {
    let settings = SchedulerSettings {
        lease_enabled: false,
        ..SchedulerSettings::default()
    };
    let h = harness(FakeProbe::slow(Duration::from_millis(100)), settings);
    h.store.insert_service(service("slow", 60));

    let first = h.scheduler.tick().await.unwrap();
    let second = h.scheduler.tick().await.unwrap();
    assert_eq!(second.report.dispatched, 1);

    finish(first).await;
    finish(second).await;
    assert_eq!(h.probe.calls(), 2);
}

#[tokio::test]
async fn downtime_is_persisted_and_notified() {
    let h = harness(FakeProbe::new(&[ProbeStatus::Down]), SchedulerSettings::default());
    let svc = service("api", 60);
    h.store.insert_service(svc.clone());
    h.store.insert_subscription(AlertSubscription {
        id: Uuid::new_v4(),
        tenant_id: svc.tenant_id,
        service_id: None,
        channel: Channel::Email,
        destination: "ops@example.com".to_string(),
        is_active: true,
    });

    finish(h.scheduler.tick().await.unwrap()).await;

    let alerts = h.store.list_alerts(svc.id).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Downtime);
    assert_eq!(alerts[0].message, "Service is down: api - connection refused");

    for _ in 0..100 {
        if !h.email.attempts().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let sent = h.email.attempts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ops@example.com");
    assert_eq!(sent[0].2, "HIGH Alert: Service is down: api - connection refused");
}

#[tokio::test]
async fn staying_down_raises_a_single_alert() {
    let h = harness(
        FakeProbe::new(&[ProbeStatus::Up, ProbeStatus::Down, ProbeStatus::Down]),
        SchedulerSettings::default(),
    );
    let svc = service("api", 60);
    h.store.insert_service(svc.clone());

    for _ in 0..3 {
        h.scheduler.trigger_probe(svc.id).await.unwrap();
    }

    let alerts = h.store.list_alerts(svc.id).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(h.store.list_probe_results(svc.id, 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn manual_trigger_returns_the_persisted_result() {
    let h = harness(FakeProbe::new(&[]), SchedulerSettings::default());
    let svc = service("api", 60);
    h.store.insert_service(svc.clone());

    let _held = h.scheduler.leases().try_acquire(svc.id).unwrap();
    let result = h.scheduler.trigger_probe(svc.id).await.unwrap();

    assert_eq!(result.status, ProbeStatus::Up);
    assert_eq!(result.status_code, Some(200));
    let last = h.store.get_last_probe_result(svc.id).await.unwrap();
    assert_eq!(last, Some(result));
}

#[tokio::test]
async fn manual_trigger_of_unknown_service_fails() {
    let h = harness(FakeProbe::new(&[]), SchedulerSettings::default());
    let missing = Uuid::new_v4();

    assert!(matches!(
        h.scheduler.trigger_probe(missing).await,
        Err(PipelineError::ServiceNotFound(id)) if id == missing
    ));
    assert_eq!(h.probe.calls(), 0);
}

#[tokio::test]
async fn persistence_failure_only_affects_its_own_service() {
    let h = harness(FakeProbe::new(&[]), SchedulerSettings::default());
    let broken = service("broken", 60);
    let healthy = service("healthy", 60);
    h.store.insert_service(broken.clone());
    h.store.insert_service(healthy.clone());

    let scheduler = Scheduler::from_parts(
        h.store.clone(),
        Arc::new(FailingResults {
            inner: h.store.clone(),
            failing: broken.id,
        }),
        h.store.clone(),
        h.probe.clone(),
        h.notifier.clone(),
        SchedulerSettings::default(),
    )
    .with_clock(h.clock.clone());

    let report = finish(scheduler.tick().await.unwrap()).await;
    assert_eq!(report.dispatched, 2);
    assert!(h.store.get_last_probe_result(broken.id).await.unwrap().is_none());
    assert!(h.store.get_last_probe_result(healthy.id).await.unwrap().is_some());

    // The broken service has no history, so the next tick retries it.
    let retry = finish(scheduler.tick().await.unwrap()).await;
    assert_eq!(retry.dispatched, 1);
    assert_eq!(retry.skipped_not_due, 1);
}

#[tokio::test]
async fn run_ticks_immediately_and_stops_on_shutdown() {
    let settings = SchedulerSettings {
        tick_interval_secs: 60,
        ..SchedulerSettings::default()
    };
    let h = harness(FakeProbe::new(&[]), settings);
    h.store.insert_service(service("api", 60));
    let (tx, rx) = watch::channel(false);

    let running = tokio::spawn(h.scheduler.clone().run(rx));
    for _ in 0..100 {
        if h.probe.calls() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.probe.calls(), 1);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .unwrap()
        .unwrap();
}
