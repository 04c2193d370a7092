//! Tracing setup
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to
//! this crate. Output goes to stderr so command output stays clean.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber described by `config`
pub fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    }
}

fn default_directive(config: &LoggingConfig) -> String {
    let level = match config.level.trim().to_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => level.to_string(),
        _ => "info".to_string(),
    };
    format!("futurecal={}", level)
}
