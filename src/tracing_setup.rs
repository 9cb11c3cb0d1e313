use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers
    #[default]
    Json,
    /// Human-readable multi-line output for development
    Pretty,
}

/// Initialize structured logging, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter, format)?;
    tracing::info!(?format, "Beacon logging initialized");
    Ok(())
}

/// Initialize logging with an explicit filter directive such as `"beacon=debug"`.
pub fn init_tracing_with_level(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level).wrap_err_with(|| format!("Invalid log level: {level}"))?;
    install(filter, format)?;
    tracing::info!(level, ?format, "Beacon logging initialized");
    Ok(())
}

fn install(filter: EnvFilter, format: LogFormat) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(
                fmt_layer
                    .json()
                    .with_current_span(false)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(fmt_layer.pretty())
            .try_init(),
    }
    .wrap_err("A global tracing subscriber is already installed")
}

/// Span grouping everything a long-lived component logs
pub fn component_span(component: &str) -> tracing::Span {
    tracing::info_span!("component", name = component)
}
