//! Sliding-window request metrics.
//!
//! [`aggregator::MetricsAggregator`] records request outcomes and latencies
//! into bounded [`series::SampleSeries`] and derives error rate and
//! nearest-rank latency percentiles on demand. Host gauges (CPU, memory,
//! disk) come from external [`gauge::GaugeSource`] implementations.

pub mod aggregator;
pub mod gauge;
pub mod series;


pub use aggregator::{AggregatorConfig, MetricsAggregator};
pub use gauge::GaugeSource;
