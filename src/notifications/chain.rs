use std::sync::Arc;
use tracing::{debug, info, warn};

use super::senders::NotificationSender;

/// Ordered provider fallback for one channel. The order is data: the first
/// configured provider that succeeds wins.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn NotificationSender>>,
}

/// Which provider delivered the message, or `None` when every attempt failed
/// or nothing was configured.
pub type ChainOutcome = Option<&'static str>;

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn NotificationSender>>) -> Self {
        Self { providers }
    }

    pub fn push(mut self, provider: Arc<dyn NotificationSender>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Names of the providers in attempt order, configured or not.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn deliver(&self, destination: &str, subject: &str, body: &str) -> ChainOutcome {
        for provider in &self.providers {
            if !provider.is_configured() {
                debug!(provider = provider.name(), "Provider not configured, skipping.");
                continue;
            }
            match provider.send(destination, subject, body).await {
                Ok(()) => {
                    info!(provider = provider.name(), to = destination, "Notification delivered.");
                    return Some(provider.name());
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        to = destination,
                        error = %e,
                        "Provider failed, trying next in chain."
                    );
                }
            }
        }
        None
    }
}
