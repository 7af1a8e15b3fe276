use tracing_subscriber::EnvFilter;

const CRATE_DIRECTIVES: [&str; 5] = [
    "beacon_monitor=info",
    "beacon_alert=info",
    "beacon_metrics=info",
    "beacon_notify=info",
    "beacon_common=info",
];

/// Installs the global fmt subscriber with `RUST_LOG` directives plus an
/// `info` directive per workspace crate.
pub fn init() -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in CRATE_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
