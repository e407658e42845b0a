//! Alert delivery over email, SMS and chat webhooks with per-channel
//! provider fallback.

pub mod chain;
pub mod models;
pub mod senders;
pub mod service;

pub use chain::ProviderChain;
pub use models::NotificationSettings;
pub use service::{DeliverySummary, NotificationError, NotificationService};
