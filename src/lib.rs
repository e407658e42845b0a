//! Health-check scheduling, probing and alert dispatch engine.
//!
//! The scheduler decides when each service is due, the prober performs one
//! timeout-bounded check, the evaluator turns a result (plus the one before it)
//! into edge-triggered alerts, and the notification service fans those alerts
//! out over provider fallback chains.

pub mod alerting;
pub mod db;
pub mod notifications;
pub mod prober;
pub mod scheduler;
pub mod server;
pub mod version;
pub mod web;
