use async_trait::async_trait;
use beacon_alert::cooldown::NotificationCooldown;
use beacon_alert::{AlertEvaluator, AlertTable};
use beacon_common::types::{keys, AlertDefinition, ContextValue, Severity};
use beacon_metrics::gauge::GaugeSource;
use beacon_metrics::{AggregatorConfig, MetricsAggregator};
use beacon_monitor::{Monitor, MonitorConfig};
use beacon_notify::manager::NotificationManager;
use beacon_notify::plugin::ChannelRegistry;
use beacon_notify::{Notification, NotificationChannel};
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorder {
    received: Arc<Mutex<Vec<Notification>>>,
}

impl Recorder {
    fn alert_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .received
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.alert_name.clone())
            .collect();
        names.sort();
        names
    }
}

struct RecordingChannel(Recorder);

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.0.received.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recorder"
    }
}

struct BrokenChannel;

#[async_trait]
impl NotificationChannel for BrokenChannel {
    async fn send(&self, _notification: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("HTTP 502 from upstream")
    }

    fn channel_name(&self) -> &str {
        "broken"
    }
}

struct UnreadableHost;

impl GaugeSource for UnreadableHost {
    fn name(&self) -> &str {
        "host"
    }

    fn gauge_keys(&self) -> Vec<String> {
        vec!["cpu_usage".to_string()]
    }

    fn collect(&mut self) -> anyhow::Result<Vec<(String, f64)>> {
        anyhow::bail!("/proc/stat unavailable")
    }
}

fn build_monitor(cooldown_secs: u64) -> (Monitor, Recorder) {
    let table = AlertTable::new(vec![
        AlertDefinition::new("high_error_rate", keys::ERROR_RATE, 0.05, Severity::Critical),
        AlertDefinition::new("slow_response_p95", keys::LATENCY_P95, 1000.0, Severity::Warning),
        AlertDefinition::new("high_cpu_usage", "cpu_usage", 80.0, Severity::Warning),
        AlertDefinition::new("disk_full", "disk_usage", 95.0, Severity::Critical),
    ])
    .unwrap();

    let recorder = Recorder::default();
    let notifier = NotificationManager::with_channels(vec![
        Box::new(BrokenChannel),
        Box::new(RecordingChannel(recorder.clone())),
    ]);

    let monitor = Monitor::new(
        Arc::new(MetricsAggregator::new(AggregatorConfig {
            window_ms: 60_000,
            max_samples: 1000,
        })),
        Arc::new(AlertEvaluator::new(Arc::new(table), 10)),
        Arc::new(notifier),
        NotificationCooldown::new(cooldown_secs),
    )
    .with_gauge_source(Box::new(UnreadableHost));

    (monitor, recorder)
}

#[tokio::test]
async fn poll_cycle_notifies_triggered_alerts() {
    let (mut monitor, recorder) = build_monitor(0);
    let aggregator = monitor.aggregator();
    let now = Utc::now();

    for i in 0..9 {
        aggregator.record_request_at(200, 100.0 + i as f64, now - Duration::seconds(5));
    }
    aggregator.record_request_at(500, 2500.0, now - Duration::seconds(1));

    let report = monitor.poll_once_at(now).await;

    assert_eq!(report.snapshot.request_count, 10);
    assert!((report.snapshot.error_rate - 0.1).abs() < 1e-12);
    assert_eq!(report.snapshot.latency_p95_ms, 2500.0);
    assert_eq!(report.snapshot.gauges["cpu_usage"], 0.0);

    // disk_usage is never reported, so only three definitions are evaluated
    assert_eq!(report.evaluated, 3);
    let mut triggered = report.triggered.clone();
    triggered.sort();
    assert_eq!(triggered, vec!["high_error_rate", "slow_response_p95"]);

    assert_eq!(report.dispatches.len(), 2);
    assert_eq!(report.failed_sends(), 2);
    assert_eq!(recorder.alert_names(), vec!["high_error_rate", "slow_response_p95"]);

    let received = recorder.received.lock().unwrap();
    let context = &received[0].context;
    assert_eq!(context.get("window_ms"), Some(&ContextValue::Number(60_000.0)));
    assert!(context.contains_key(keys::ERROR_RATE));
}

#[tokio::test]
async fn cooldown_suppresses_repeat_notifications() {
    let (mut monitor, recorder) = build_monitor(600);
    let aggregator = monitor.aggregator();
    let now = Utc::now();
    aggregator.record_request_at(503, 10.0, now);

    let first = monitor.poll_once_at(now).await;
    assert_eq!(first.triggered, vec!["high_error_rate"]);
    assert!(first.suppressed.is_empty());

    let second = monitor.poll_once_at(now + Duration::seconds(30)).await;
    assert_eq!(second.triggered, vec!["high_error_rate"]);
    assert_eq!(second.suppressed, vec!["high_error_rate"]);
    assert!(second.dispatches.is_empty());

    assert_eq!(recorder.alert_names(), vec!["high_error_rate"]);
}

#[tokio::test]
async fn idle_service_triggers_nothing() {
    let (mut monitor, recorder) = build_monitor(0);
    let report = monitor.poll_once_at(Utc::now()).await;

    assert_eq!(report.snapshot.request_count, 0);
    assert_eq!(report.snapshot.error_rate, 0.0);
    assert!(report.triggered.is_empty());
    assert!(recorder.alert_names().is_empty());
}

#[tokio::test]
async fn poll_records_history_for_every_metric() {
    let (mut monitor, _recorder) = build_monitor(0);
    let aggregator = monitor.aggregator();
    let evaluator = monitor.evaluator();
    let start = Utc::now();

    for i in 0..3 {
        let at = start + Duration::seconds(i);
        aggregator.record_request_at(200, 100.0 * (i + 1) as f64, at);
        monitor.poll_once_at(at).await;
    }

    let p95 = evaluator.history_at(keys::LATENCY_P95, None, start + Duration::seconds(2));
    let values: Vec<f64> = p95.iter().map(|s| s.value).collect();
    assert_eq!(values, vec![100.0, 200.0, 300.0]);

    let stats = evaluator
        .history_stats_at(keys::ERROR_RATE, None, start + Duration::seconds(2))
        .unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.max, 0.0);
    assert!(evaluator.history_metrics().contains(&"cpu_usage".to_string()));
}

#[tokio::test]
async fn run_stops_on_shutdown() {
    let (monitor, _recorder) = build_monitor(0);
    let monitor = monitor.with_poll_interval(std::time::Duration::from_millis(10));

    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        monitor.run(tokio::time::sleep(std::time::Duration::from_millis(50))),
    )
    .await
    .expect("run should return after shutdown");
}

#[tokio::test]
async fn from_config_wires_static_gauges() {
    let config = MonitorConfig::from_toml_str(
        r#"
use_builtin_alerts = false

[gauges]
disk_usage = 97.0

[[alerts]]
name = "disk_full"
metric = "disk_usage"
threshold = 95.0
severity = "critical"

[[channels]]
name = "ops-log"
type = "log"
"#,
    )
    .unwrap();

    let mut monitor = Monitor::from_config(&config, &ChannelRegistry::default()).unwrap();
    let report = monitor.poll_once().await;

    assert_eq!(report.triggered, vec!["disk_full"]);
    assert_eq!(report.dispatches.len(), 1);
    assert_eq!(report.dispatches[0].succeeded(), 1);
}

#[tokio::test]
async fn shipped_config_is_quiet_when_idle() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/monitor.toml");
    let config = MonitorConfig::load(path).unwrap();
    assert!(!config.gauges.contains_key("redis_status"));

    let mut monitor = Monitor::from_config(&config, &ChannelRegistry::default()).unwrap();
    let report = monitor.poll_once().await;

    assert_eq!(report.snapshot.request_count, 0);
    assert!(report.triggered.is_empty(), "triggered: {:?}", report.triggered);
    assert!(report.dispatches.is_empty());
}
