use crate::error::{AlertError, Result};
use beacon_common::types::{keys, AlertDefinition, Severity};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Process-wide, read-only set of alert definitions keyed by name.
#[derive(Debug, Default)]
pub struct AlertTable {
    definitions: Vec<Arc<AlertDefinition>>,
    by_name: HashMap<String, usize>,
}

impl AlertTable {
    /// Builds a table, rejecting duplicate names and malformed thresholds.
    pub fn new(definitions: Vec<AlertDefinition>) -> Result<Self> {
        let mut table = Self::default();
        for def in definitions {
            validate(&def)?;
            if table.by_name.contains_key(&def.name) {
                return Err(AlertError::DuplicateDefinition(def.name));
            }
            table.by_name.insert(def.name.clone(), table.definitions.len());
            table.definitions.push(Arc::new(def));
        }
        Ok(table)
    }

    /// The default table for a web backend.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for def in builtin_definitions() {
            table.by_name.insert(def.name.clone(), table.definitions.len());
            table.definitions.push(Arc::new(def));
        }
        table
    }

    /// Builds a table from `base` where any definition in `overrides` with
    /// the same name replaces the base entry and new names are appended.
    pub fn with_overrides(
        base: Vec<AlertDefinition>,
        overrides: Vec<AlertDefinition>,
    ) -> Result<Self> {
        let mut merged = base;
        let mut seen = HashSet::new();
        for def in overrides {
            if !seen.insert(def.name.clone()) {
                return Err(AlertError::DuplicateDefinition(def.name));
            }
            match merged.iter_mut().find(|d| d.name == def.name) {
                Some(existing) => *existing = def,
                None => merged.push(def),
            }
        }
        Self::new(merged)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<AlertDefinition>> {
        self.by_name.get(name).map(|&i| &self.definitions[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AlertDefinition>> {
        self.definitions.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<AlertDefinition>> {
        self.definitions.iter().filter(|d| d.enabled)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn validate(def: &AlertDefinition) -> Result<()> {
    if !def.threshold.is_finite() {
        return Err(AlertError::InvalidThreshold {
            name: def.name.clone(),
        });
    }
    if let Some(p) = def.percentile {
        if !(0.0..=100.0).contains(&p) {
            return Err(AlertError::InvalidPercentile {
                name: def.name.clone(),
                percentile: p,
            });
        }
    }
    Ok(())
}

/// Default alert definitions for request metrics and host gauges.
pub fn builtin_definitions() -> Vec<AlertDefinition> {
    vec![
        AlertDefinition::new("high_error_rate", keys::ERROR_RATE, 0.05, Severity::Critical)
            .with_window_ms(300_000)
            .with_description("At least 5% of requests failed with a 5xx status"),
        AlertDefinition::new("slow_response_p95", keys::LATENCY_P95, 1000.0, Severity::Warning)
            .with_window_ms(300_000)
            .with_percentile(95.0)
            .with_description("p95 response time at or above 1s"),
        AlertDefinition::new("slow_response_p99", keys::LATENCY_P99, 3000.0, Severity::Critical)
            .with_window_ms(300_000)
            .with_percentile(99.0)
            .with_description("p99 response time at or above 3s"),
        AlertDefinition::new("high_cpu_usage", "cpu_usage", 80.0, Severity::Warning)
            .with_window_ms(300_000)
            .with_description("CPU usage at or above 80%"),
        AlertDefinition::new("high_memory_usage", "memory_usage", 85.0, Severity::Warning)
            .with_window_ms(300_000)
            .with_description("Memory usage at or above 85%"),
        AlertDefinition::new("low_disk_space", "disk_usage", 90.0, Severity::Critical)
            .with_description("Disk usage at or above 90%"),
        // Sources report `redis_status` only while disconnected, so any value fires.
        AlertDefinition::new("redis_down", "redis_status", 0.0, Severity::Critical)
            .with_description("Redis connection lost"),
    ]
}
