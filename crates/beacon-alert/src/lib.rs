//! Threshold alerting over named metric values.
//!
//! An [`table::AlertTable`] holds the static alert definitions loaded at
//! startup. The [`evaluator::AlertEvaluator`] compares measured values
//! against them (always `value >= threshold`) and keeps a bounded history
//! of observed values per metric for statistics. Missing metrics and
//! absent or disabled definitions are reported as "not triggered", never as
//! errors, so one unavailable metric cannot stall a polling cycle.

pub mod cooldown;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod table;


pub use error::AlertError;
pub use evaluator::{AlertEvaluator, TriggerResult};
pub use table::AlertTable;
