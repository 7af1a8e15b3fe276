use crate::history::HistoryBuffer;
use crate::table::AlertTable;
use beacon_common::stats::Summary;
use beacon_common::types::{AlertDefinition, Sample};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Outcome of checking one value against one alert definition.
#[derive(Debug, Clone)]
pub struct TriggerResult {
    pub alert_name: String,
    pub value: f64,
    pub triggered: bool,
    /// `None` when no definition exists under `alert_name`.
    pub definition: Option<Arc<AlertDefinition>>,
}

impl TriggerResult {
    fn not_triggered(alert_name: &str, value: f64, definition: Option<Arc<AlertDefinition>>) -> Self {
        Self {
            alert_name: alert_name.to_string(),
            value,
            triggered: false,
            definition,
        }
    }
}

pub struct AlertEvaluator {
    table: Arc<AlertTable>,
    history_capacity: usize,
    history: Mutex<HashMap<String, HistoryBuffer>>,
}

impl AlertEvaluator {
    pub fn new(table: Arc<AlertTable>, history_capacity: usize) -> Self {
        Self {
            table,
            history_capacity,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &AlertTable {
        &self.table
    }

    /// Checks `value` against the named definition. Absent and disabled
    /// definitions never trigger.
    pub fn evaluate(&self, alert_name: &str, value: f64) -> TriggerResult {
        let Some(def) = self.table.get(alert_name) else {
            tracing::debug!(alert = alert_name, "No alert definition, skipping");
            return TriggerResult::not_triggered(alert_name, value, None);
        };

        if !def.enabled {
            return TriggerResult::not_triggered(alert_name, value, Some(Arc::clone(def)));
        }

        let triggered = def.is_breached_by(value);
        if triggered {
            tracing::debug!(
                alert = alert_name,
                metric = %def.metric,
                value,
                threshold = def.threshold,
                "Alert threshold reached"
            );
        }

        TriggerResult {
            alert_name: alert_name.to_string(),
            value,
            triggered,
            definition: Some(Arc::clone(def)),
        }
    }

    /// Evaluates every enabled definition whose metric is present in
    /// `metric_values`. Definitions without data are skipped.
    pub fn evaluate_all(&self, metric_values: &HashMap<String, f64>) -> Vec<TriggerResult> {
        let mut results = Vec::new();
        for def in self.table.enabled() {
            match metric_values.get(&def.metric) {
                Some(&value) => results.push(self.evaluate(&def.name, value)),
                None => {
                    tracing::debug!(
                        alert = %def.name,
                        metric = %def.metric,
                        "Metric not reported, skipping alert"
                    );
                }
            }
        }
        results
    }

    pub fn record_history(&self, metric: &str, value: f64) {
        self.record_history_at(metric, value, Utc::now());
    }

    pub fn record_history_at(&self, metric: &str, value: f64, now: DateTime<Utc>) {
        let mut history = self.history.lock();
        history
            .entry(metric.to_string())
            .or_insert_with(|| HistoryBuffer::new(self.history_capacity))
            .push(Sample::new(now, value));
    }

    /// Recorded values for `metric` in insertion order, optionally limited
    /// to the trailing `window`.
    pub fn history(&self, metric: &str, window: Option<Duration>) -> Vec<Sample> {
        self.history_at(metric, window, Utc::now())
    }

    pub fn history_at(&self, metric: &str, window: Option<Duration>, now: DateTime<Utc>) -> Vec<Sample> {
        self.history
            .lock()
            .get(metric)
            .map(|buf| buf.samples(window, now))
            .unwrap_or_default()
    }

    pub fn history_stats(&self, metric: &str, window: Option<Duration>) -> Option<Summary> {
        self.history_stats_at(metric, window, Utc::now())
    }

    pub fn history_stats_at(
        &self,
        metric: &str,
        window: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Option<Summary> {
        self.history.lock().get(metric)?.summary(window, now)
    }

    /// Metric keys that have recorded history.
    pub fn history_metrics(&self) -> Vec<String> {
        let mut metrics: Vec<String> = self.history.lock().keys().cloned().collect();
        metrics.sort();
        metrics
    }
}
