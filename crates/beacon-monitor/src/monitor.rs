use crate::config::{ConfigError, MonitorConfig};
use beacon_alert::cooldown::NotificationCooldown;
use beacon_alert::AlertEvaluator;
use beacon_common::types::{AlertContext, ContextValue, MetricsSnapshot};
use beacon_metrics::gauge::{collect_gauges, GaugeSource, StaticGauges};
use beacon_metrics::MetricsAggregator;
use beacon_notify::manager::{DispatchReport, NotificationManager};
use beacon_notify::plugin::ChannelRegistry;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Summary of one poll cycle.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub snapshot: MetricsSnapshot,
    pub evaluated: usize,
    pub triggered: Vec<String>,
    pub suppressed: Vec<String>,
    pub dispatches: Vec<DispatchReport>,
}

impl PollReport {
    pub fn failed_sends(&self) -> usize {
        self.dispatches.iter().map(|d| d.failed()).sum()
    }
}

pub struct Monitor {
    aggregator: Arc<MetricsAggregator>,
    evaluator: Arc<AlertEvaluator>,
    notifier: Arc<NotificationManager>,
    cooldown: NotificationCooldown,
    gauges: Vec<Box<dyn GaugeSource>>,
    poll_interval: Duration,
}

impl Monitor {
    pub fn new(
        aggregator: Arc<MetricsAggregator>,
        evaluator: Arc<AlertEvaluator>,
        notifier: Arc<NotificationManager>,
        cooldown: NotificationCooldown,
    ) -> Self {
        Self {
            aggregator,
            evaluator,
            notifier,
            cooldown,
            gauges: Vec::new(),
            poll_interval: Duration::from_millis(60_000),
        }
    }

    pub fn from_config(config: &MonitorConfig, registry: &ChannelRegistry) -> Result<Self, ConfigError> {
        let table = Arc::new(config.alert_table()?);
        let notifier = Arc::new(config.build_notifier(registry)?);
        let aggregator = Arc::new(MetricsAggregator::new(config.metrics.clone()));
        let evaluator = Arc::new(AlertEvaluator::new(table, config.history_capacity));

        let mut monitor = Self::new(
            aggregator,
            evaluator,
            notifier,
            NotificationCooldown::new(config.notify_cooldown_secs),
        )
        .with_poll_interval(config.poll_interval());

        if !config.gauges.is_empty() {
            monitor = monitor.with_gauge_source(Box::new(StaticGauges::new(
                "config",
                config.gauges.clone(),
            )));
        }
        Ok(monitor)
    }

    pub fn with_gauge_source(mut self, source: Box<dyn GaugeSource>) -> Self {
        self.gauges.push(source);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Shared handle for request middleware to call `record_request` on.
    pub fn aggregator(&self) -> Arc<MetricsAggregator> {
        Arc::clone(&self.aggregator)
    }

    pub fn evaluator(&self) -> Arc<AlertEvaluator> {
        Arc::clone(&self.evaluator)
    }

    pub async fn poll_once(&mut self) -> PollReport {
        self.poll_once_at(Utc::now()).await
    }

    /// Snapshot, merge gauges, record history, evaluate, then notify every
    /// triggered alert that is not in its cooldown period.
    pub async fn poll_once_at(&mut self, now: DateTime<Utc>) -> PollReport {
        let mut snapshot = self.aggregator.snapshot_at(now);
        snapshot.gauges = collect_gauges(&mut self.gauges);

        let values = snapshot.metric_values();
        for (metric, value) in &values {
            self.evaluator.record_history_at(metric, *value, now);
        }

        let results = self.evaluator.evaluate_all(&values);
        let evaluated = results.len();
        let context = snapshot_context(&snapshot);

        let mut triggered = Vec::new();
        let mut suppressed = Vec::new();
        let mut pending = Vec::new();

        for result in results.into_iter().filter(|r| r.triggered) {
            let Some(definition) = result.definition else {
                continue;
            };
            triggered.push(result.alert_name.clone());

            if !self.cooldown.try_acquire(&result.alert_name, now) {
                suppressed.push(result.alert_name);
                continue;
            }

            tracing::warn!(
                alert = %definition.name,
                severity = %definition.severity,
                value = result.value,
                threshold = definition.threshold,
                "Alert triggered"
            );
            pending.push((definition, result.value));
        }

        let notifier = &self.notifier;
        let dispatches = join_all(
            pending
                .iter()
                .map(|(definition, value)| notifier.notify(definition, *value, context.clone())),
        )
        .await;

        PollReport {
            snapshot,
            evaluated,
            triggered,
            suppressed,
            dispatches,
        }
    }

    /// Polls on a fixed interval until `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tick = interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            alerts = self.evaluator.table().len(),
            channels = self.notifier.channels().len(),
            gauge_sources = self.gauges.len(),
            "Starting poll loop"
        );

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let report = self.poll_once().await;
                    tracing::debug!(
                        evaluated = report.evaluated,
                        triggered = report.triggered.len(),
                        suppressed = report.suppressed.len(),
                        failed_sends = report.failed_sends(),
                        "Poll cycle complete"
                    );
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down poll loop");
                    break;
                }
            }
        }
    }
}

fn snapshot_context(snapshot: &MetricsSnapshot) -> AlertContext {
    let mut context: AlertContext = snapshot
        .metric_values()
        .into_iter()
        .map(|(k, v)| (k, ContextValue::Number(v)))
        .collect();
    context.insert(
        "window_ms".to_string(),
        ContextValue::Number(snapshot.window_ms as f64),
    );
    context.insert(
        "snapshot_at".to_string(),
        ContextValue::String(snapshot.timestamp.to_rfc3339()),
    );
    context
}
