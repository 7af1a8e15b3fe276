use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Longest accepted silence period: one week.
pub const MAX_SILENCE_SECS: u64 = 7 * 24 * 60 * 60;

/// Minimum interval between notifications for the same alert.
///
/// Only gates notification dispatch; evaluation results are unaffected.
pub struct NotificationCooldown {
    silence: Duration,
    last_fired: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl NotificationCooldown {
    /// Silence periods above [`MAX_SILENCE_SECS`] are clamped to it.
    pub fn new(silence_secs: u64) -> Self {
        Self {
            silence: Duration::seconds(silence_secs.min(MAX_SILENCE_SECS) as i64),
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` and records `now` when the alert may notify again.
    pub fn try_acquire(&self, alert_name: &str, now: DateTime<Utc>) -> bool {
        if self.silence <= Duration::zero() {
            return true;
        }

        let mut last_fired = self.last_fired.lock();
        let suppressed = last_fired
            .get(alert_name)
            .is_some_and(|last| now - *last < self.silence);

        if suppressed {
            tracing::debug!(alert = alert_name, "Notification suppressed (silence period)");
            false
        } else {
            last_fired.insert(alert_name.to_string(), now);
            true
        }
    }

    pub fn clear(&self) {
        self.last_fired.lock().clear();
    }
}
