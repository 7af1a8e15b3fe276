use crate::routing::{select_routes, ChannelRoute};
use crate::{Notification, NotificationChannel};
use beacon_common::types::{AlertContext, AlertDefinition, Severity};
use futures::future::join_all;
use serde::Serialize;

/// Result of one channel send.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub channel: String,
    /// `None` on success.
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-channel results of dispatching one notification.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub alert_name: String,
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

pub struct NotificationManager {
    channels: Vec<Box<dyn NotificationChannel>>,
    routes: Vec<ChannelRoute>,
}

impl NotificationManager {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>, routes: Vec<ChannelRoute>) -> Self {
        Self { channels, routes }
    }

    /// Routes every channel at every severity.
    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        let routes = (0..channels.len())
            .map(|channel_index| ChannelRoute::new(channel_index, Severity::Info))
            .collect();
        Self::new(channels, routes)
    }

    /// Notifies every routed channel about a triggered alert. When the
    /// definition names channels, only those are considered.
    pub async fn notify(
        &self,
        definition: &AlertDefinition,
        value: f64,
        context: AlertContext,
    ) -> DispatchReport {
        let notification = Notification::new(definition, value, context);
        self.dispatch(&notification, &definition.notification_channels)
            .await
    }

    /// Sends to all selected channels concurrently and waits for every send
    /// to finish. Failures are logged and recorded, never propagated.
    pub async fn dispatch(&self, notification: &Notification, only: &[String]) -> DispatchReport {
        let targets = self.select_channels(notification.severity, only);

        if targets.is_empty() {
            tracing::debug!(
                alert = %notification.alert_name,
                severity = %notification.severity,
                "No channel routed for notification"
            );
            return DispatchReport {
                alert_name: notification.alert_name.clone(),
                outcomes: Vec::new(),
            };
        }

        let sends = targets.iter().map(|channel| async move {
            let result = channel.send(notification).await;
            (channel.channel_name(), result)
        });

        let outcomes: Vec<ChannelOutcome> = join_all(sends)
            .await
            .into_iter()
            .map(|(channel, result)| match result {
                Ok(()) => ChannelOutcome {
                    channel: channel.to_string(),
                    error: None,
                },
                Err(e) => {
                    tracing::error!(
                        channel,
                        alert = %notification.alert_name,
                        error = %e,
                        "Failed to send notification"
                    );
                    ChannelOutcome {
                        channel: channel.to_string(),
                        error: Some(format!("{e:#}")),
                    }
                }
            })
            .collect();

        let report = DispatchReport {
            alert_name: notification.alert_name.clone(),
            outcomes,
        };

        tracing::info!(
            alert = %report.alert_name,
            sent = report.succeeded(),
            failed = report.failed(),
            "Notification dispatched"
        );

        report
    }

    fn select_channels(&self, severity: Severity, only: &[String]) -> Vec<&dyn NotificationChannel> {
        let allowed = |index: usize| {
            self.channels.get(index).is_some_and(|channel| {
                only.is_empty() || only.iter().any(|name| name == channel.channel_name())
            })
        };

        select_routes(&self.routes, severity, allowed)
            .into_iter()
            .filter_map(|index| self.channels.get(index))
            .map(|channel| channel.as_ref())
            .collect()
    }

    pub fn channels(&self) -> &[Box<dyn NotificationChannel>] {
        &self.channels
    }
}
