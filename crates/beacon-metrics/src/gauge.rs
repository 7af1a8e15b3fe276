use anyhow::Result;
use std::collections::BTreeMap;

/// An external source of point-in-time gauges (CPU, memory, disk, service
/// health) merged into each metrics snapshot.
///
/// The trait requires `Send + Sync` so sources can live inside the monitor
/// shared across tasks.
pub trait GaugeSource: Send + Sync {
    /// Returns the source name (e.g., `"host"`), used for logging.
    fn name(&self) -> &str;

    /// Keys this source reports. When collection fails each key is reported
    /// as `0.0`.
    fn gauge_keys(&self) -> Vec<String>;

    /// Reads current gauge values.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reading fails.
    fn collect(&mut self) -> Result<Vec<(String, f64)>>;
}

/// Collects from every source. A failing source is logged and its keys are
/// reported as `0.0`, which never crosses a positive `>=` threshold.
pub fn collect_gauges(sources: &mut [Box<dyn GaugeSource>]) -> BTreeMap<String, f64> {
    let mut gauges = BTreeMap::new();
    for source in sources.iter_mut() {
        match source.collect() {
            Ok(values) => gauges.extend(values),
            Err(e) => {
                tracing::warn!(source = source.name(), error = %e, "Gauge collection failed");
                for key in source.gauge_keys() {
                    gauges.insert(key, 0.0);
                }
            }
        }
    }
    gauges
}

/// A source that reports fixed values, e.g. from configuration.
pub struct StaticGauges {
    name: String,
    values: BTreeMap<String, f64>,
}

impl StaticGauges {
    pub fn new(name: &str, values: BTreeMap<String, f64>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }
}

impl GaugeSource for StaticGauges {
    fn name(&self) -> &str {
        &self.name
    }

    fn gauge_keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn collect(&mut self) -> Result<Vec<(String, f64)>> {
        Ok(self.values.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }
}
