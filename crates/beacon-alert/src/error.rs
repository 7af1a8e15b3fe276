/// Errors raised while building an alert definition table.
///
/// Evaluation itself never fails; these only surface at startup.
///
/// # Examples
///
/// ```rust
/// use beacon_alert::AlertError;
///
/// let err = AlertError::DuplicateDefinition("high_error_rate".to_string());
/// assert!(err.to_string().contains("high_error_rate"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// Two definitions share the same name.
    #[error("Alert: duplicate definition '{0}'")]
    DuplicateDefinition(String),

    /// The threshold is NaN or infinite.
    #[error("Alert: definition '{name}' has a non-finite threshold")]
    InvalidThreshold { name: String },

    /// The percentile lies outside `[0, 100]`.
    #[error("Alert: definition '{name}' has percentile {percentile} outside [0, 100]")]
    InvalidPercentile { name: String, percentile: f64 },
}

pub type Result<T> = std::result::Result<T, AlertError>;
