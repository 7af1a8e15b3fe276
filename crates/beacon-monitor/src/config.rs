use beacon_alert::cooldown::MAX_SILENCE_SECS;
use beacon_alert::table::{builtin_definitions, AlertTable};
use beacon_alert::AlertError;
use beacon_common::types::{AlertDefinition, Severity};
use beacon_metrics::aggregator::{AggregatorConfig, MAX_WINDOW_MS};
use beacon_notify::error::NotifyError;
use beacon_notify::manager::NotificationManager;
use beacon_notify::plugin::ChannelRegistry;
use beacon_notify::routing::ChannelRoute;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config: failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Config: invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config: {0}")]
    Alerts(#[from] AlertError),

    #[error("Config: channel '{name}': {source}")]
    Channel { name: String, source: NotifyError },

    #[error("Config: duplicate channel name '{0}'")]
    DuplicateChannel(String),

    #[error("Config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub metrics: AggregatorConfig,
    /// Values kept per metric in the alert history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Minimum seconds between notifications for the same alert; 0 disables.
    #[serde(default)]
    pub notify_cooldown_secs: u64,
    /// Start from the builtin alert table; `alerts` entries replace builtins
    /// by name.
    #[serde(default = "default_use_builtin_alerts")]
    pub use_builtin_alerts: bool,
    #[serde(default)]
    pub alerts: Vec<AlertDefinition>,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// Fixed gauge values merged into every snapshot.
    #[serde(default)]
    pub gauges: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_history_capacity() -> usize {
    beacon_alert::evaluator::DEFAULT_HISTORY_CAPACITY
}

fn default_use_builtin_alerts() -> bool {
    true
}

fn default_min_severity() -> Severity {
    Severity::Info
}

fn default_enabled() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            metrics: AggregatorConfig::default(),
            history_capacity: default_history_capacity(),
            notify_cooldown_secs: 0,
            use_builtin_alerts: default_use_builtin_alerts(),
            alerts: Vec::new(),
            channels: Vec::new(),
            gauges: BTreeMap::new(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if self.metrics.window_ms == 0 || self.metrics.window_ms > MAX_WINDOW_MS {
            return Err(ConfigError::Invalid(format!(
                "metrics.window_ms must be between 1 and {MAX_WINDOW_MS}"
            )));
        }
        if self.notify_cooldown_secs > MAX_SILENCE_SECS {
            return Err(ConfigError::Invalid(format!(
                "notify_cooldown_secs must be at most {MAX_SILENCE_SECS}"
            )));
        }
        let mut names = HashSet::new();
        for ch in &self.channels {
            if !names.insert(ch.name.as_str()) {
                return Err(ConfigError::DuplicateChannel(ch.name.clone()));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    pub fn alert_table(&self) -> Result<AlertTable, ConfigError> {
        let table = if self.use_builtin_alerts {
            AlertTable::with_overrides(builtin_definitions(), self.alerts.clone())?
        } else {
            AlertTable::new(self.alerts.clone())?
        };
        Ok(table)
    }

    /// Instantiates every enabled channel through `registry` and routes it
    /// at its configured minimum severity.
    pub fn build_notifier(&self, registry: &ChannelRegistry) -> Result<NotificationManager, ConfigError> {
        let mut channels = Vec::new();
        let mut routes = Vec::new();

        for ch in self.channels.iter().filter(|c| c.enabled) {
            let channel_err = |source| ConfigError::Channel {
                name: ch.name.clone(),
                source,
            };
            let channel = registry
                .create_channel(&ch.channel_type, &ch.name, &ch.config)
                .map_err(channel_err)?;
            let redacted = registry
                .redact_config(&ch.channel_type, &ch.config)
                .map_err(channel_err)?;

            tracing::info!(
                channel = %ch.name,
                channel_type = %ch.channel_type,
                min_severity = %ch.min_severity,
                config = %redacted,
                "Notification channel configured"
            );

            routes.push(ChannelRoute::new(channels.len(), ch.min_severity));
            channels.push(channel);
        }

        Ok(NotificationManager::new(channels, routes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
poll_interval_ms = 30000
history_capacity = 50
notify_cooldown_secs = 300

[metrics]
window_ms = 120000

[gauges]
disk_usage = 40.0

[[alerts]]
name = "high_error_rate"
metric = "error_rate"
threshold = 0.1
severity = "warning"
notification_channels = ["ops-log"]

[[alerts]]
name = "queue_backlog"
metric = "queue_depth"
threshold = 500
severity = "info"
enabled = false

[[channels]]
name = "ops-log"
type = "log"

[[channels]]
name = "ops-hook"
type = "webhook"
min_severity = "critical"
config = { url = "https://hooks.example.com/alerts", headers = { Authorization = "Bearer x" } }

[[channels]]
name = "disabled-hook"
type = "webhook"
enabled = false
"#;

    #[test]
    fn parses_full_config() {
        let config = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.poll_interval_ms, 30_000);
        assert_eq!(config.metrics.window_ms, 120_000);
        assert_eq!(config.metrics.max_samples, 10_000);
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.notify_cooldown_secs, 300);
        assert_eq!(config.gauges["disk_usage"], 40.0);
        assert_eq!(config.channels.len(), 3);
        assert_eq!(config.channels[1].min_severity, Severity::Critical);
        assert_eq!(config.channels[0].min_severity, Severity::Info);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(config.poll_interval_ms, 60_000);
        assert_eq!(config.metrics.window_ms, 60_000);
        assert_eq!(config.history_capacity, 100);
        assert!(config.use_builtin_alerts);
        assert_eq!(config.alert_table().unwrap().len(), builtin_definitions().len());
    }

    #[test]
    fn alerts_override_builtin_table() {
        let config = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        let table = config.alert_table().unwrap();
        assert_eq!(table.len(), builtin_definitions().len() + 1);

        let errors = table.get("high_error_rate").unwrap();
        assert_eq!(errors.threshold, 0.1);
        assert_eq!(errors.notification_channels, vec!["ops-log".to_string()]);
        assert!(!table.get("queue_backlog").unwrap().enabled);
    }

    #[test]
    fn builtin_table_can_be_disabled() {
        let config = MonitorConfig::from_toml_str(
            r#"
use_builtin_alerts = false

[[alerts]]
name = "only"
metric = "error_rate"
threshold = 0.5
severity = "critical"
"#,
        )
        .unwrap();
        let table = config.alert_table().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("high_error_rate").is_none());
    }

    #[test]
    fn notifier_skips_disabled_channels() {
        let config = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        let notifier = config.build_notifier(&ChannelRegistry::default()).unwrap();
        let names: Vec<&str> = notifier.channels().iter().map(|c| c.channel_name()).collect();
        assert_eq!(names, vec!["ops-log", "ops-hook"]);
    }

    #[test]
    fn unknown_channel_type_is_rejected() {
        let config = MonitorConfig::from_toml_str(
            r#"
[[channels]]
name = "pd"
type = "pagerduty"
"#,
        )
        .unwrap();
        let err = config.build_notifier(&ChannelRegistry::default()).err().unwrap();
        assert!(matches!(err, ConfigError::Channel { ref name, .. } if name == "pd"));
    }

    #[test]
    fn duplicate_channel_names_are_rejected() {
        let result = MonitorConfig::from_toml_str(
            r#"
[[channels]]
name = "a"
type = "log"

[[channels]]
name = "a"
type = "log"
"#,
        );
        assert!(matches!(result, Err(ConfigError::DuplicateChannel(n)) if n == "a"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(MonitorConfig::from_toml_str("poll_interval_ms = 0").is_err());
    }

    #[test]
    fn out_of_range_durations_are_rejected() {
        let cooldown = MonitorConfig::from_toml_str("notify_cooldown_secs = 9223372036854775807");
        assert!(matches!(cooldown, Err(ConfigError::Invalid(_))));

        let window = format!("[metrics]\nwindow_ms = {}", MAX_WINDOW_MS + 1);
        let window = MonitorConfig::from_toml_str(&window);
        assert!(matches!(window, Err(ConfigError::Invalid(_))));

        let week = format!("notify_cooldown_secs = {MAX_SILENCE_SECS}");
        assert!(MonitorConfig::from_toml_str(&week).is_ok());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(config.poll_interval_ms, 30_000);

        let missing = MonitorConfig::load("/nonexistent/beacon.toml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
