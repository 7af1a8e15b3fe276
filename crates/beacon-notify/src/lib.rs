//! Notification fan-out for triggered alerts.
//!
//! A triggered alert is turned into a [`Notification`] and dispatched
//! concurrently to every routed [`NotificationChannel`]. Each channel's
//! outcome is reported individually; one channel failing never prevents
//! the others from being attempted and never fails the dispatch as a whole.
//! Built-in channels are a structured log sink and a generic JSON webhook.

pub mod channels;
pub mod error;
pub mod manager;
pub mod plugin;
pub mod routing;
pub mod utils;


use anyhow::Result;
use async_trait::async_trait;
use beacon_common::types::{AlertContext, AlertDefinition, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The payload delivered to notification channels for one triggered alert.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub alert_name: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub description: Option<String>,
    pub context: AlertContext,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(definition: &AlertDefinition, value: f64, context: AlertContext) -> Self {
        Self {
            alert_name: definition.name.clone(),
            metric: definition.metric.clone(),
            value,
            threshold: definition.threshold,
            severity: definition.severity,
            description: definition.description.clone(),
            context,
            timestamp: Utc::now(),
        }
    }

    /// One-line summary, e.g. `[critical] high_error_rate: error_rate=0.12 (threshold 0.05)`.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {}: {}={} (threshold {})",
            self.severity, self.alert_name, self.metric, self.value, self.threshold
        )
    }
}

/// A notification delivery channel that forwards alerts to an external
/// service or sink.
///
/// Implementations are created by the corresponding [`plugin::ChannelPlugin`]
/// and registered in the [`manager::NotificationManager`].
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the notification through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// Returns the configured channel name (e.g., `"ops-webhook"`).
    fn channel_name(&self) -> &str;
}
