use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use super::chain::ProviderChain;
use super::models::{NotificationSettings, format_alert_body, format_alert_subject};
use super::senders::{ChatWebhookSender, EmailApiSender, LogSender, SmsApiSender, SmtpSender};
use crate::db::enums::Channel;
use crate::db::models::{Alert, Service};
use crate::db::services::{StoreError, SubscriptionDirectory};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("All providers failed for {channel} destination {destination}")]
    Exhausted { channel: Channel, destination: String },
    #[error("Email destination is required")]
    MissingDestination,
}

/// Per-alert delivery counts; one entry per matching subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationService {
    subscriptions: Arc<dyn SubscriptionDirectory>,
    brand: String,
    email: ProviderChain,
    sms: ProviderChain,
    chat_webhook: ProviderChain,
}

impl NotificationService {
    /// Builds the default chains: email = smtp, email api, log;
    /// sms = sms api, log; chat webhook = webhook only.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionDirectory>,
        settings: &NotificationSettings,
        client: Client,
    ) -> Self {
        let from = settings.smtp.from_email.clone();
        let email = ProviderChain::default()
            .push(Arc::new(SmtpSender::new(settings.smtp.clone())))
            .push(Arc::new(EmailApiSender::new(
                client.clone(),
                settings.email_api.clone(),
                &from,
            )))
            .push(Arc::new(LogSender::new("email", from.clone())));
        let sms = ProviderChain::default()
            .push(Arc::new(SmsApiSender::new(client.clone(), settings.sms_api.clone())))
            .push(Arc::new(LogSender::new("sms", settings.brand.clone())));
        let chat_webhook = ProviderChain::default()
            .push(Arc::new(ChatWebhookSender::new(client, settings.brand.clone())));

        info!(
            email = ?email.provider_names(),
            email_relay = settings.smtp.is_configured(),
            email_api = settings.email_api.is_configured(),
            sms_api = settings.sms_api.is_configured(),
            "Notification providers initialised."
        );

        Self::with_chains(subscriptions, settings.brand.clone(), email, sms, chat_webhook)
    }

    pub fn with_chains(
        subscriptions: Arc<dyn SubscriptionDirectory>,
        brand: String,
        email: ProviderChain,
        sms: ProviderChain,
        chat_webhook: ProviderChain,
    ) -> Self {
        Self {
            subscriptions,
            brand,
            email,
            sms,
            chat_webhook,
        }
    }

    fn chain(&self, channel: Channel) -> &ProviderChain {
        match channel {
            Channel::Email => &self.email,
            Channel::Sms => &self.sms,
            Channel::ChatWebhook => &self.chat_webhook,
        }
    }

    /// Fire-and-forget delivery. Returns at once; errors are logged by the task.
    pub fn dispatch(self: &Arc<Self>, alert: Alert, service: Service) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.deliver(&alert, &service).await {
                error!(
                    alert_id = %alert.id,
                    service_id = %service.id,
                    error = %e,
                    "Failed to dispatch alert notifications."
                );
            }
        });
    }

    /// Delivers one alert to every active subscription covering its service.
    /// Exhausted chains are logged and counted, never returned.
    pub async fn deliver(
        &self,
        alert: &Alert,
        service: &Service,
    ) -> Result<DeliverySummary, NotificationError> {
        let subscriptions = self
            .subscriptions
            .list_active_subscriptions(service.tenant_id, Some(service.id))
            .await?;

        let mut summary = DeliverySummary::default();
        if subscriptions.is_empty() {
            debug!(alert_id = %alert.id, service_id = %service.id, "No subscriptions for alert.");
            return Ok(summary);
        }

        let subject = format_alert_subject(&self.brand, alert);
        let body = format_alert_body(alert);
        for subscription in subscriptions
            .iter()
            .filter(|s| s.is_active && s.covers(service.tenant_id, service.id))
        {
            let delivered = self
                .chain(subscription.channel)
                .deliver(&subscription.destination, &subject, &body)
                .await;
            match delivered {
                Some(_) => summary.delivered += 1,
                None => {
                    summary.failed += 1;
                    let e = NotificationError::Exhausted {
                        channel: subscription.channel,
                        destination: subscription.destination.clone(),
                    };
                    error!(
                        alert_id = %alert.id,
                        subscription_id = %subscription.id,
                        error = %e,
                        "Notification not delivered."
                    );
                }
            }
        }
        Ok(summary)
    }

    /// Sends a non-alert email (e.g. a subscription confirmation) through the
    /// email chain.
    pub async fn send_custom_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        if to.trim().is_empty() {
            return Err(NotificationError::MissingDestination);
        }
        match self.email.deliver(to, subject, body).await {
            Some(_) => Ok(()),
            None => Err(NotificationError::Exhausted {
                channel: Channel::Email,
                destination: to.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::chain::test_support::FakeSender;
    use super::super::senders::test_support::spawn_receiver;
    use super::*;
    use crate::db::enums::{AlertType, ServiceType, Severity};
    use crate::db::models::AlertSubscription;
    use crate::db::services::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn service() -> Service {
        Service {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "api".to_string(),
            target: "https://api.example.com".to_string(),
            service_type: ServiceType::Http,
            check_interval_secs: 60,
            timeout_secs: 5,
            expected_status_code: None,
            latency_threshold_ms: None,
            is_active: true,
        }
    }

    fn alert(svc: &Service) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            service_id: svc.id,
            alert_type: AlertType::Downtime,
            message: "Service is down: api".to_string(),
            severity: Severity::High,
            is_resolved: false,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }

    fn subscription(
        svc: &Service,
        service_id: Option<Uuid>,
        channel: Channel,
        destination: &str,
        is_active: bool,
    ) -> AlertSubscription {
        AlertSubscription {
            id: Uuid::new_v4(),
            tenant_id: svc.tenant_id,
            service_id,
            channel,
            destination: destination.to_string(),
            is_active,
        }
    }

    #[tokio::test]
    async fn email_without_providers_falls_back_to_log() {
        let store = Arc::new(MemoryStore::new());
        let svc = service();
        store.insert_subscription(subscription(
            &svc,
            None,
            Channel::Email,
            "ops@example.com",
            true,
        ));
        let notifier = NotificationService::new(
            store.clone(),
            &NotificationSettings::default(),
            Client::new(),
        );

        let summary = notifier.deliver(&alert(&svc), &svc).await.unwrap();
        assert_eq!(summary, DeliverySummary { delivered: 1, failed: 0 });

        assert_eq!(
            notifier.email.provider_names(),
            vec!["smtp", "email_api", "log"]
        );
        let used = notifier
            .chain(Channel::Email)
            .deliver("ops@example.com", "subject", "body")
            .await;
        assert_eq!(used, Some("log"));
        let used = notifier
            .chain(Channel::Sms)
            .deliver("+15550100", "", "body")
            .await;
        assert_eq!(used, Some("log"));
    }

    #[tokio::test]
    async fn resolves_scoped_and_wildcard_subscriptions_and_skips_inactive() {
        let store = Arc::new(MemoryStore::new());
        let svc = service();
        let other_service = Some(Uuid::new_v4());
        for (scope, channel, destination, active) in [
            (None, Channel::Email, "all@example.com", true),
            (Some(svc.id), Channel::Sms, "+15550100", true),
            (Some(svc.id), Channel::Email, "off@example.com", false),
            (other_service, Channel::Email, "other@example.com", true),
        ] {
            store.insert_subscription(subscription(&svc, scope, channel, destination, active));
        }

        let email = Arc::new(FakeSender::new("email", true, true));
        let sms = Arc::new(FakeSender::new("sms", true, true));
        let notifier = NotificationService::with_chains(
            store.clone(),
            "PulseWatch".to_string(),
            ProviderChain::default().push(email.clone()),
            ProviderChain::default().push(sms.clone()),
            ProviderChain::default(),
        );

        let summary = notifier.deliver(&alert(&svc), &svc).await.unwrap();

        assert_eq!(summary.delivered, 2);
        let emails = email.attempts();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].0, "all@example.com");
        assert_eq!(emails[0].1, "PulseWatch Alert: Service is down: api");
        assert_eq!(emails[0].2, "HIGH Alert: Service is down: api");
        assert_eq!(sms.attempts()[0].0, "+15550100");
    }

    #[tokio::test]
    async fn webhook_failure_is_counted_not_raised() {
        let (addr, captured) = spawn_receiver().await;
        let store = Arc::new(MemoryStore::new());
        let svc = service();
        store.insert_subscription(subscription(
            &svc,
            Some(svc.id),
            Channel::ChatWebhook,
            &format!("http://{addr}/fail"),
            true,
        ));
        let notifier = NotificationService::new(
            store.clone(),
            &NotificationSettings::default(),
            Client::new(),
        );

        let summary = notifier.deliver(&alert(&svc), &svc).await.unwrap();

        assert_eq!(summary, DeliverySummary { delivered: 0, failed: 1 });
        assert_eq!(captured.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn dispatch_delivers_in_the_background() {
        let store = Arc::new(MemoryStore::new());
        let svc = service();
        store.insert_subscription(subscription(
            &svc,
            None,
            Channel::Email,
            "ops@example.com",
            true,
        ));
        let email = Arc::new(FakeSender::new("email", true, true));
        let notifier = Arc::new(NotificationService::with_chains(
            store.clone(),
            "PulseWatch".to_string(),
            ProviderChain::default().push(email.clone()),
            ProviderChain::default(),
            ProviderChain::default(),
        ));

        notifier.dispatch(alert(&svc), svc.clone());
        for _ in 0..100 {
            if !email.attempts().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(email.attempts().len(), 1);
    }

    #[tokio::test]
    async fn custom_email_requires_destination() {
        let store = Arc::new(MemoryStore::new());
        let notifier = NotificationService::new(
            store,
            &NotificationSettings::default(),
            Client::new(),
        );

        assert!(matches!(
            notifier.send_custom_email(" ", "Welcome", "body").await,
            Err(NotificationError::MissingDestination)
        ));
        notifier
            .send_custom_email("new@example.com", "Confirm your subscription", "body")
            .await
            .unwrap();
    }
}
