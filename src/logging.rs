//! Logging setup.
//!
//! `RUST_LOG` takes precedence over the configured default filter. Output
//! goes to stderr so command output on stdout stays machine readable.

use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Build the filter: `RUST_LOG` if set, otherwise the configured default.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Only the first call takes effect.
pub fn init(config: &LoggingConfig) {
    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_filter(build_filter(config));

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}
