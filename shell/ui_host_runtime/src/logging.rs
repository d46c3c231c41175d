use crate::error::HostError;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: compact lines on stderr, filtered at
/// `level` unless `RUST_LOG` says otherwise. Stdout carries protocol frames
/// and must never see log output.
pub fn init(level: Level) -> Result<(), HostError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env()?,
        )
        .with(
            tracing_subscriber::fmt::Layer::new()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
