use crate::series::SampleSeries;
use beacon_common::stats::{nearest_rank, sort_values};
use beacon_common::types::{MetricsSnapshot, Sample};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest accepted aggregation window: one week.
pub const MAX_WINDOW_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Default lookback for snapshots, in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Hard cap on samples retained per series.
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_samples() -> usize {
    10_000
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_samples: default_max_samples(),
        }
    }
}

impl AggregatorConfig {
    /// The window as a duration, clamped to [`MAX_WINDOW_MS`].
    pub fn window(&self) -> Duration {
        Duration::milliseconds(self.window_ms.min(MAX_WINDOW_MS) as i64)
    }
}

/// Request counters and latencies over a sliding time window.
///
/// Series are retained for twice the configured window. Each series has
/// its own lock and no two locks are held at once.
pub struct MetricsAggregator {
    config: AggregatorConfig,
    requests: Mutex<SampleSeries>,
    errors: Mutex<SampleSeries>,
    latencies: Mutex<SampleSeries>,
}

impl MetricsAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        let retention = config.window() * 2;
        let series = || Mutex::new(SampleSeries::new(retention, config.max_samples));
        Self {
            requests: series(),
            errors: series(),
            latencies: series(),
            config,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn record_request(&self, status_code: u16, response_time_ms: f64) {
        self.record_request_at(status_code, response_time_ms, Utc::now());
    }

    pub fn record_request_at(&self, status_code: u16, response_time_ms: f64, now: DateTime<Utc>) {
        self.requests.lock().push(Sample::new(now, 1.0));

        let mut errors = self.errors.lock();
        if status_code >= 500 {
            errors.push(Sample::new(now, 1.0));
        } else {
            errors.evict(now);
        }
        drop(errors);

        self.latencies.lock().push(Sample::new(now, response_time_ms));
    }

    pub fn request_count(&self, window: Duration) -> usize {
        self.request_count_at(window, Utc::now())
    }

    pub fn request_count_at(&self, window: Duration, now: DateTime<Utc>) -> usize {
        self.requests.lock().count_within(window, now)
    }

    pub fn error_count(&self, window: Duration) -> usize {
        self.error_count_at(window, Utc::now())
    }

    pub fn error_count_at(&self, window: Duration, now: DateTime<Utc>) -> usize {
        self.errors.lock().count_within(window, now)
    }

    /// Fraction of requests in the window that failed with a 5xx status.
    /// An empty window reports `0.0`, not "unknown". When the size cap has
    /// trimmed requests inside the window, only the retained span counts.
    pub fn error_rate(&self, window: Duration) -> f64 {
        self.error_rate_at(window, Utc::now())
    }

    pub fn error_rate_at(&self, window: Duration, now: DateTime<Utc>) -> f64 {
        let (requests, errors) = self.aligned_counts(window, now);
        ratio(errors, requests)
    }

    /// Request and error counts over the same span: the window, shortened to
    /// start at the oldest retained request once the size cap has trimmed
    /// requests inside it. Errors are counted first; every error is recorded
    /// after its request.
    fn aligned_counts(&self, window: Duration, now: DateTime<Utc>) -> (usize, usize) {
        let window_start = now - window;
        let cutoff = match self.requests.lock().front() {
            Some(oldest) if oldest.timestamp > window_start => oldest.timestamp,
            _ => window_start,
        };
        let errors = self.errors.lock().count_since(cutoff);
        let requests = self.requests.lock().count_since(cutoff);
        (requests, errors)
    }

    /// Nearest-rank percentile of response times in the window, `0.0` when
    /// the window is empty.
    pub fn latency_percentile(&self, p: f64, window: Duration) -> f64 {
        self.latency_percentile_at(p, window, Utc::now())
    }

    pub fn latency_percentile_at(&self, p: f64, window: Duration, now: DateTime<Utc>) -> f64 {
        let mut values = self.latencies.lock().values_within(window, now);
        sort_values(&mut values);
        nearest_rank(&values, p)
    }

    /// Error rate and p95/p99 latency over the configured window. Gauges are
    /// left empty for external sources to fill in.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> MetricsSnapshot {
        let window = self.config.window();
        let (request_count, error_count) = self.aligned_counts(window, now);
        let error_rate = ratio(error_count, request_count);

        let mut latencies = self.latencies.lock().values_within(window, now);
        sort_values(&mut latencies);

        MetricsSnapshot {
            timestamp: now,
            window_ms: self.config.window_ms,
            request_count,
            error_count,
            error_rate,
            latency_p95_ms: nearest_rank(&latencies, 95.0),
            latency_p99_ms: nearest_rank(&latencies, 99.0),
            gauges: BTreeMap::new(),
        }
    }

    /// Number of samples currently retained as (requests, errors, latencies).
    pub fn retained(&self) -> (usize, usize, usize) {
        (
            self.requests.lock().len(),
            self.errors.lock().len(),
            self.latencies.lock().len(),
        )
    }
}

fn ratio(errors: usize, requests: usize) -> f64 {
    if requests == 0 {
        return 0.0;
    }
    // Errors sharing the oldest request's timestamp may outlive requests
    // trimmed by the size cap.
    (errors as f64 / requests as f64).min(1.0)
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}
