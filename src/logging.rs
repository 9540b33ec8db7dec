use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// filter.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(true);

    if json {
        builder
            .json()
            .flatten_event(true)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))?;
    } else {
        builder
            .compact()
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))?;
    }

    Ok(())
}

/// Scoped subscriber for tests; output goes through the test harness.
#[cfg(test)]
pub(crate) fn setup_test_tracing() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::filter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = filter::Targets::new()
        .with_default(tracing::Level::WARN)
        .with_target("controller", tracing::Level::DEBUG)
        .with_target("dispatch", tracing::Level::DEBUG)
        .with_target("realtime::channel", tracing::Level::DEBUG);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(filter)
        .set_default()
}
