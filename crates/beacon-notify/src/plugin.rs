use crate::error::{NotifyError, Result};
use crate::utils::redact_sensitive_json;
use crate::NotificationChannel;
use serde_json::Value;
use std::collections::HashMap;

/// Factory for creating [`NotificationChannel`] instances from JSON
/// configuration.
///
/// Each plugin is registered in the [`ChannelRegistry`] by its `name()`.
pub trait ChannelPlugin: Send + Sync {
    /// Returns the plugin type name (e.g., `"webhook"`, `"log"`).
    fn name(&self) -> &str;

    /// Validates a JSON config blob against this plugin's expected schema.
    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Creates a configured channel named `channel_name` from a validated
    /// JSON config.
    fn create_channel(&self, channel_name: &str, config: &Value) -> Result<Box<dyn NotificationChannel>>;

    /// Returns a copy of `config` with secrets replaced by `"***"`, for
    /// logging.
    fn redact_config(&self, config: &Value) -> Value {
        redact_sensitive_json(config)
    }
}

/// Registry of available [`ChannelPlugin`]s, used to instantiate
/// notification channels from configuration.
///
/// # Examples
///
/// ```
/// use beacon_notify::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::default();
/// assert!(registry.has_plugin("log"));
/// assert!(registry.has_plugin("webhook"));
/// assert!(!registry.has_plugin("nonexistent"));
/// ```
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        let name = plugin.name().to_string();
        self.plugins.insert(name, plugin);
    }

    pub fn create_channel(
        &self,
        type_name: &str,
        channel_name: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let plugin = self.plugin(type_name)?;
        plugin.validate_config(config)?;
        plugin.create_channel(channel_name, config)
    }

    pub fn redact_config(&self, type_name: &str, config: &Value) -> Result<Value> {
        Ok(self.plugin(type_name)?.redact_config(config))
    }

    fn plugin(&self, type_name: &str) -> Result<&dyn ChannelPlugin> {
        self.plugins
            .get(type_name)
            .map(|p| p.as_ref())
            .ok_or_else(|| NotifyError::UnknownChannelType(type_name.to_string()))
    }

    pub fn has_plugin(&self, type_name: &str) -> bool {
        self.plugins.contains_key(type_name)
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::log::LogPlugin));
        registry.register(Box::new(crate::channels::webhook::WebhookPlugin));
        registry
    }
}
