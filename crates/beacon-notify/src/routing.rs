use beacon_common::types::Severity;

/// Delivers alerts of `min_severity` or higher to the channel at
/// `channel_index` in the manager's channel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRoute {
    pub min_severity: Severity,
    pub channel_index: usize,
}

impl ChannelRoute {
    pub fn new(channel_index: usize, min_severity: Severity) -> Self {
        Self {
            min_severity,
            channel_index,
        }
    }

    pub fn accepts(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }
}

/// Channel indices an alert of `severity` is delivered to, in route order.
///
/// A channel reachable through several routes appears once. `allowed`
/// filters indices further, e.g. by the alert's own channel list.
pub fn select_routes(
    routes: &[ChannelRoute],
    severity: Severity,
    allowed: impl Fn(usize) -> bool,
) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::new();
    for route in routes.iter().filter(|r| r.accepts(severity)) {
        if !selected.contains(&route.channel_index) && allowed(route.channel_index) {
            selected.push(route.channel_index);
        }
    }
    selected
}
