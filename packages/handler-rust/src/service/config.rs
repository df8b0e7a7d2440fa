/// Handler-level configuration for the dispatch pipeline.
///
/// Controls concurrency limits and log output.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    /// Logging setup applied by `telemetry::init_tracing`.
    pub log: LogConfig,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 1000,
            log: LogConfig::default(),
        }
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit newline-delimited JSON instead of compact text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}
