use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Metric keys produced by [`MetricsSnapshot::metric_values`].
pub mod keys {
    pub const ERROR_RATE: &str = "error_rate";
    pub const LATENCY_P95: &str = "latency_p95";
    pub const LATENCY_P99: &str = "latency_p99";
    pub const REQUEST_COUNT: &str = "request_count";
    pub const ERROR_COUNT: &str = "error_count";
}

/// One timestamped numeric observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use beacon_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// A value carried in the free-form context attached to a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl std::fmt::Display for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextValue::Null => write!(f, "null"),
            ContextValue::Bool(b) => write!(f, "{b}"),
            ContextValue::Number(n) => write!(f, "{n}"),
            ContextValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for ContextValue {
    fn from(v: f64) -> Self {
        ContextValue::Number(v)
    }
}

impl From<bool> for ContextValue {
    fn from(v: bool) -> Self {
        ContextValue::Bool(v)
    }
}

impl From<&str> for ContextValue {
    fn from(v: &str) -> Self {
        ContextValue::String(v.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(v: String) -> Self {
        ContextValue::String(v)
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ContextValue::Null, Into::into)
    }
}

pub type AlertContext = BTreeMap<String, ContextValue>;

/// Format a context map into a human-readable `key=value` list.
///
/// # Examples
///
/// ```
/// use beacon_common::types::{format_context, AlertContext};
///
/// let mut ctx = AlertContext::new();
/// ctx.insert("route".to_string(), "/api/orders".into());
/// ctx.insert("p95".to_string(), 812.0.into());
/// assert_eq!(format_context(&ctx), "p95=812, route=/api/orders");
/// ```
pub fn format_context(context: &AlertContext) -> String {
    context
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn default_enabled() -> bool {
    true
}

/// Static alert rule: fires when the measured value of `metric` is at or
/// above `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDefinition {
    pub name: String,
    pub metric: String,
    pub threshold: f64,
    pub severity: Severity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lookback the metric value was computed over, in milliseconds.
    #[serde(default)]
    pub window_ms: Option<u64>,
    /// Percentile the metric value represents (e.g. `95.0` for p95 latency).
    #[serde(default)]
    pub percentile: Option<f64>,
    /// Channel names to notify. Empty means every routed channel.
    #[serde(default)]
    pub notification_channels: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AlertDefinition {
    pub fn new(name: &str, metric: &str, threshold: f64, severity: Severity) -> Self {
        Self {
            name: name.to_string(),
            metric: metric.to_string(),
            threshold,
            severity,
            enabled: true,
            window_ms: None,
            percentile: None,
            notification_channels: Vec::new(),
            description: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = Some(window_ms);
        self
    }

    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = Some(percentile);
        self
    }

    pub fn with_channels(mut self, channels: &[&str]) -> Self {
        self.notification_channels = channels.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// The trigger comparison. Always `>=`; NaN never triggers.
    pub fn is_breached_by(&self, value: f64) -> bool {
        value >= self.threshold
    }
}

/// Point-in-time aggregate of the request metrics plus any external gauges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub window_ms: u64,
    pub request_count: usize,
    pub error_count: usize,
    pub error_rate: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    #[serde(default)]
    pub gauges: BTreeMap<String, f64>,
}

impl MetricsSnapshot {
    /// Flattens the snapshot into the metric-key mapping consumed by alert
    /// evaluation. Gauges override derived keys of the same name.
    pub fn metric_values(&self) -> HashMap<String, f64> {
        let mut values = HashMap::with_capacity(5 + self.gauges.len());
        values.insert(keys::ERROR_RATE.to_string(), self.error_rate);
        values.insert(keys::LATENCY_P95.to_string(), self.latency_p95_ms);
        values.insert(keys::LATENCY_P99.to_string(), self.latency_p99_ms);
        values.insert(keys::REQUEST_COUNT.to_string(), self.request_count as f64);
        values.insert(keys::ERROR_COUNT.to_string(), self.error_count as f64);
        for (k, v) in &self.gauges {
            values.insert(k.clone(), *v);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_and_parse() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!("CRITICAL".parse::<Severity>(), Ok(Severity::Critical));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn definition_deserializes_with_defaults() {
        let def: AlertDefinition = toml::from_str(
            r#"
            name = "high_error_rate"
            metric = "error_rate"
            threshold = 0.05
            severity = "critical"
            "#,
        )
        .unwrap();
        assert!(def.enabled);
        assert_eq!(def.severity, Severity::Critical);
        assert!(def.notification_channels.is_empty());
        assert_eq!(def.window_ms, None);
    }

    #[test]
    fn breach_is_greater_or_equal() {
        let def = AlertDefinition::new("x", "m", 10.0, Severity::Info);
        assert!(def.is_breached_by(10.0));
        assert!(def.is_breached_by(10.5));
        assert!(!def.is_breached_by(9.999));
        assert!(!def.is_breached_by(f64::NAN));
    }

    #[test]
    fn context_value_serializes_untagged() {
        let mut ctx = AlertContext::new();
        ctx.insert("a".into(), ContextValue::Null);
        ctx.insert("b".into(), true.into());
        ctx.insert("c".into(), 1.5.into());
        ctx.insert("d".into(), "x".into());
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json, serde_json::json!({"a": null, "b": true, "c": 1.5, "d": "x"}));
    }

    #[test]
    fn snapshot_metric_values_include_gauges() {
        let mut gauges = BTreeMap::new();
        gauges.insert("cpu_usage".to_string(), 42.0);
        let snapshot = MetricsSnapshot {
            timestamp: Utc::now(),
            window_ms: 60_000,
            request_count: 10,
            error_count: 1,
            error_rate: 0.1,
            latency_p95_ms: 200.0,
            latency_p99_ms: 300.0,
            gauges,
        };
        let values = snapshot.metric_values();
        assert_eq!(values[keys::ERROR_RATE], 0.1);
        assert_eq!(values[keys::LATENCY_P99], 300.0);
        assert_eq!(values[keys::REQUEST_COUNT], 10.0);
        assert_eq!(values["cpu_usage"], 42.0);
        assert_eq!(values.len(), 6);
    }
}
