use beacon_common::types::Sample;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Append-only series of samples for one metric, trimmed from the head.
///
/// Timestamps are non-decreasing: a sample older than the current tail is
/// stored with the tail's timestamp. The series never holds more than
/// `max_samples` entries.
pub struct SampleSeries {
    retention: Duration,
    max_samples: usize,
    data: VecDeque<Sample>,
}

impl SampleSeries {
    pub fn new(retention: Duration, max_samples: usize) -> Self {
        Self {
            retention,
            max_samples: max_samples.max(1),
            data: VecDeque::new(),
        }
    }

    /// Appends a sample and evicts relative to its timestamp.
    pub fn push(&mut self, mut sample: Sample) {
        if let Some(tail) = self.data.back() {
            if sample.timestamp < tail.timestamp {
                sample.timestamp = tail.timestamp;
            }
        }
        let now = sample.timestamp;
        self.data.push_back(sample);
        self.evict(now);
    }

    /// Drops every sample older than `now - retention` in one removal, then
    /// trims the head down to the size cap.
    pub fn evict(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        let expired = self.data.partition_point(|s| s.timestamp < cutoff);
        if expired > 0 {
            self.data.drain(..expired);
        }

        let overflow = self.data.len().saturating_sub(self.max_samples);
        if overflow > 0 {
            self.data.drain(..overflow);
        }
    }

    fn window_start(&self, cutoff: DateTime<Utc>) -> usize {
        self.data.partition_point(|s| s.timestamp < cutoff)
    }

    /// Number of samples with `timestamp >= now - window`.
    pub fn count_within(&self, window: Duration, now: DateTime<Utc>) -> usize {
        self.count_since(now - window)
    }

    /// Number of samples with `timestamp >= cutoff`.
    pub fn count_since(&self, cutoff: DateTime<Utc>) -> usize {
        self.data.len() - self.window_start(cutoff)
    }

    /// Values of samples with `timestamp >= now - window`, oldest first.
    pub fn values_within(&self, window: Duration, now: DateTime<Utc>) -> Vec<f64> {
        let start = self.window_start(now - window);
        self.data.range(start..).map(|s| s.value).collect()
    }

    pub fn front(&self) -> Option<&Sample> {
        self.data.front()
    }

    pub fn back(&self) -> Option<&Sample> {
        self.data.back()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
