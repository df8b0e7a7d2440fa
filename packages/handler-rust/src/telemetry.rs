//! Tracing subscriber initialization.

use std::env::{self, VarError};

use anyhow::{anyhow, Context as _};
use tracing_subscriber::EnvFilter;

use crate::service::LogConfig;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter` when set. Only one
/// subscriber can be installed per process; later calls leave the first in
/// place and return an error.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` or `config.filter` cannot be parsed, or a
/// global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter = select_filter(env::var(EnvFilter::DEFAULT_ENV), config)?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Chooses the filter from the environment value, falling back to the config
/// only when the variable is absent.
fn select_filter(from_env: Result<String, VarError>, config: &LogConfig) -> anyhow::Result<EnvFilter> {
    match from_env {
        Ok(directives) => parse_filter(&directives).context(EnvFilter::DEFAULT_ENV),
        Err(VarError::NotPresent) => parse_filter(&config.filter),
        Err(err) => Err(err).context(EnvFilter::DEFAULT_ENV),
    }
}

fn parse_filter(directive: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter: {directive}"))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    #[test]
    fn parses_valid_directives() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("nexus_handler=debug,warn").is_ok());
    }

    #[test]
    fn rejects_invalid_level() {
        let err = parse_filter("nexus_handler=loud").unwrap_err();
        assert!(err.to_string().contains("invalid log filter"));
    }

    #[test]
    fn config_filter_used_when_env_unset() {
        let config = LogConfig {
            filter: "debug".to_string(),
            json: false,
        };
        let filter = select_filter(Err(VarError::NotPresent), &config).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn env_filter_wins_over_config() {
        let filter = select_filter(Ok("warn".to_string()), &LogConfig::default()).unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn invalid_env_filter_is_reported() {
        let err = select_filter(Ok("nexus_handler=loud".to_string()), &LogConfig::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("RUST_LOG"));

        let err = select_filter(Err(VarError::NotUnicode(OsString::from("x"))), &LogConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("RUST_LOG"));
    }

    #[test]
    fn second_init_keeps_first_subscriber() {
        let config = LogConfig::default();
        // The first call may already lose to another test's subscriber.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
