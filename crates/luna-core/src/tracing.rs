//! Subscriber setup.
//!
//! `LUNA_LOG` takes precedence over the configured level so operators can
//! raise verbosity without touching the config file.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Environment variable overriding `logging.level`.
pub const LOG_ENV_VAR: &str = "LUNA_LOG";

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(config.effective_level()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.effective_format() {
        "json" => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        "compact" => registry
            .with(fmt::layer().compact().with_writer(io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().pretty().with_writer(io::stderr))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_noop() {
        let config = LoggingConfig {
            level: Some("debug".to_string()),
            format: Some("compact".to_string()),
        };
        init_tracing(&config);
        init_tracing(&config);
    }
}
