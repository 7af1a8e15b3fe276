use beacon_common::stats::Summary;
use beacon_common::types::Sample;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Fixed-capacity record of observed values for one metric. Once full, the
/// oldest value is dropped for each new one.
pub struct HistoryBuffer {
    buffer: VecDeque<Sample>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(sample);
    }

    /// Samples in insertion order, optionally restricted to those with
    /// `timestamp >= now - window`.
    pub fn samples(&self, window: Option<Duration>, now: DateTime<Utc>) -> Vec<Sample> {
        match window {
            Some(window) => {
                let cutoff = now - window;
                self.buffer
                    .iter()
                    .filter(|s| s.timestamp >= cutoff)
                    .copied()
                    .collect()
            }
            None => self.buffer.iter().copied().collect(),
        }
    }

    pub fn summary(&self, window: Option<Duration>, now: DateTime<Utc>) -> Option<Summary> {
        Summary::from_values(self.samples(window, now).iter().map(|s| s.value).collect())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
