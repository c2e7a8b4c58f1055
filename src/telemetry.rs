use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging for the CLI adapter.
///
/// Events and engine operations are logged as JSON lines so a scenario run
/// can be post-processed; `RUST_LOG` overrides the INFO default.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("scrutineer telemetry initialized");
    Ok(())
}

/// Span wrapping one full election cycle, keyed by the engine's cycle id.
pub fn cycle_span(cycle_id: uuid::Uuid) -> tracing::Span {
    tracing::info_span!("election_cycle", cycle.id = %cycle_id)
}
