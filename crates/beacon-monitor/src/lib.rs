//! Polling glue: builds the aggregator, evaluator and notifier from
//! configuration and runs the snapshot → evaluate → notify cycle.

pub mod config;
pub mod logging;
pub mod monitor;

pub use config::{ConfigError, MonitorConfig};
pub use monitor::{Monitor, PollReport};
