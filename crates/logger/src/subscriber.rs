use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log layer, selected with `RUST_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        let raw = var("RUST_LOG_FORMAT")
            .inspect_err(|error| {
                // The subscriber is not installed yet, so this only shows up
                // when a global default already exists.
                warn!("Failed to read RUST_LOG_FORMAT, falling back to default: {error}")
            })
            .unwrap_or_default();
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Initialize tracing with `INFO` as the default level.
pub fn init_tracing() {
    init_tracing_with(LevelFilter::INFO, LogFormat::from_env());
}

/// Initialize tracing subscriber with an explicit default level and format.
///
/// `RUST_LOG` still takes precedence over `level` for any directive it names.
/// Calling this twice is harmless; the second registration is ignored.
pub fn init_tracing_with(level: LevelFilter, format: LogFormat) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };

    let _ = tracing_subscriber::registry().with(log_layer).try_init();
}
