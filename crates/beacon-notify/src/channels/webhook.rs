use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use crate::{Notification, NotificationChannel};
use async_trait::async_trait;
use beacon_common::types::format_context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Upper bound on delivery attempts per notification.
pub const MAX_ATTEMPTS: u32 = 10;

/// Posts notifications as JSON to a fixed URL.
pub struct WebhookChannel {
    name: String,
    url: String,
    client: reqwest::Client,
    headers: HashMap<String, String>,
    body_template: Option<String>,
    max_attempts: u32,
}

impl WebhookChannel {
    pub fn new(name: &str, config: WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            name: name.to_string(),
            url: config.url,
            client,
            headers: config.headers,
            body_template: config.body_template,
            max_attempts: config.max_attempts.clamp(1, MAX_ATTEMPTS),
        })
    }

    pub fn render_body(&self, notification: &Notification) -> String {
        if let Some(template) = &self.body_template {
            template
                .replace("{{alert}}", &notification.alert_name)
                .replace("{{metric}}", &notification.metric)
                .replace("{{value}}", &format!("{:.2}", notification.value))
                .replace("{{threshold}}", &format!("{:.2}", notification.threshold))
                .replace("{{severity}}", &notification.severity.to_string())
                .replace(
                    "{{description}}",
                    notification.description.as_deref().unwrap_or(""),
                )
                .replace("{{context}}", &format_context(&notification.context))
                .replace("{{timestamp}}", &notification.timestamp.to_rfc3339())
        } else {
            serde_json::json!({
                "alert": notification.alert_name,
                "metric": notification.metric,
                "value": notification.value,
                "threshold": notification.threshold,
                "severity": notification.severity.to_string(),
                "description": notification.description,
                "context": notification.context,
                "timestamp": notification.timestamp.to_rfc3339(),
            })
            .to_string()
        }
    }

    async fn post_once(&self, body: &str) -> Result<()> {
        let mut request = self
            .client
            .post(self.url.as_str())
            .header("Content-Type", "application/json");
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.body(body.to_string()).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let resp_body = match resp.text().await {
            Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
            Err(e) => format!("[Failed to read response body: {e}]"),
        };
        Err(NotifyError::ApiError {
            service: self.name.clone(),
            status: status.as_u16(),
            body: resp_body,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let body = self.render_body(notification);
        let mut last_err = None;

        for attempt in 0..self.max_attempts {
            match self.post_once(&body).await {
                Ok(()) => {
                    tracing::debug!(channel = %self.name, attempt = attempt + 1, "Webhook delivered");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %self.name,
                        attempt = attempt + 1,
                        error = %e,
                        "Webhook send failed"
                    );
                    last_err = Some(e);
                }
            }
            if attempt + 1 < self.max_attempts {
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        match last_err {
            Some(e) => Err(anyhow::Error::new(e)
                .context(format!("webhook failed after {} attempts", self.max_attempts))),
            None => Ok(()),
        }
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

/// Delay after failed attempt `attempt` (0-based): 100ms doubling per attempt.
pub(crate) fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100u64.saturating_mul(2u64.saturating_pow(attempt)))
}

// Plugin

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub body_template: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn parse_config(config: &Value) -> Result<WebhookConfig> {
    let cfg: WebhookConfig = serde_json::from_value(config.clone())
        .map_err(|e| NotifyError::InvalidConfig(format!("webhook: {e}")))?;
    if !(cfg.url.starts_with("http://") || cfg.url.starts_with("https://")) {
        return Err(NotifyError::InvalidConfig(format!(
            "webhook: url must be http(s), got '{}'",
            cfg.url
        )));
    }
    if cfg.max_attempts == 0 || cfg.max_attempts > MAX_ATTEMPTS {
        return Err(NotifyError::InvalidConfig(format!(
            "webhook: max_attempts must be between 1 and {MAX_ATTEMPTS}, got {}",
            cfg.max_attempts
        )));
    }
    Ok(cfg)
}

pub struct WebhookPlugin;

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        parse_config(config).map(|_| ())
    }

    fn create_channel(&self, channel_name: &str, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg = parse_config(config)?;
        Ok(Box::new(WebhookChannel::new(channel_name, cfg)?))
    }
}
