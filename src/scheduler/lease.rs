use dashmap::DashSet;
use std::sync::Arc;
use uuid::Uuid;

/// In-flight marker per service, so a probe slower than its own interval is
/// not dispatched a second time by the next tick.
#[derive(Clone, Default)]
pub struct ProbeLeases {
    held: Arc<DashSet<Uuid>>,
}

impl ProbeLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` if another pipeline already holds the lease.
    pub fn try_acquire(&self, service_id: Uuid) -> Option<LeaseGuard> {
        if self.held.insert(service_id) {
            Some(LeaseGuard {
                held: Arc::clone(&self.held),
                service_id,
            })
        } else {
            None
        }
    }

    pub fn is_held(&self, service_id: Uuid) -> bool {
        self.held.contains(&service_id)
    }
}

/// Releases the lease on drop, including when the pipeline task panics.
#[must_use = "the lease is released as soon as the guard is dropped"]
pub struct LeaseGuard {
    held: Arc<DashSet<Uuid>>,
    service_id: Uuid,
}

impl LeaseGuard {
    pub fn service_id(&self) -> Uuid {
        self.service_id
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.held.remove(&self.service_id);
    }
}
