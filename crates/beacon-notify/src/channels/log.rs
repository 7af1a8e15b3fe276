use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::{Notification, NotificationChannel};
use async_trait::async_trait;
use beacon_common::types::{format_context, Severity};
use serde::Deserialize;
use serde_json::Value;

/// Writes notifications to the process log at a level matching severity.
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let context = format_context(&notification.context);
        match notification.severity {
            Severity::Critical => tracing::error!(
                channel = %self.name,
                alert = %notification.alert_name,
                metric = %notification.metric,
                value = notification.value,
                threshold = notification.threshold,
                context = %context,
                "ALERT"
            ),
            Severity::Warning => tracing::warn!(
                channel = %self.name,
                alert = %notification.alert_name,
                metric = %notification.metric,
                value = notification.value,
                threshold = notification.threshold,
                context = %context,
                "ALERT"
            ),
            Severity::Info => tracing::info!(
                channel = %self.name,
                alert = %notification.alert_name,
                metric = %notification.metric,
                value = notification.value,
                threshold = notification.threshold,
                context = %context,
                "ALERT"
            ),
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

// Plugin

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LogConfig {}

pub struct LogPlugin;

impl ChannelPlugin for LogPlugin {
    fn name(&self) -> &str {
        "log"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        if config.is_null() {
            return Ok(());
        }
        serde_json::from_value::<LogConfig>(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("log: {e}")))?;
        Ok(())
    }

    fn create_channel(&self, channel_name: &str, _config: &Value) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(LogChannel::new(channel_name)))
    }
}
