//! Logging setup for the cascade-ws crates.
//!
//! Builds a `tracing_subscriber` registry with an `EnvFilter` and a plain or
//! JSON `fmt` layer. `RUST_LOG` overrides the configured level when set.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Crates whose events the default filter lets through.
pub const WORKSPACE_TARGETS: &[&str] = &["cws_connectors", "cws_core", "cws_observability"];

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// Emit one JSON object per event.
    pub json_format: bool,
    /// Log span open/close (traversals, report runs, transport calls).
    pub include_spans: bool,
    /// File and line of each event.
    pub include_location: bool,
    pub include_thread_ids: bool,
    /// Module path of each event.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Verbose output for local work: every cache miss and expanded container.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            json_format: false,
            include_spans: true,
            include_location: true,
            include_thread_ids: false,
            include_target: true,
        }
    }

    /// JSON output for log aggregation.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json_format: true,
            include_spans: false,
            include_location: false,
            include_thread_ids: true,
            include_target: true,
        }
    }

    /// Default filter directives, one per workspace crate.
    pub fn directives(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Initializes logging with the default configuration.
///
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes logging with `config`.
///
/// Panics if a global subscriber is already installed; see [`try_init_logging`].
pub fn init_logging_with_config(config: LoggingConfig) {
    if let Err(e) = try_init_logging(config) {
        panic!("Failed to initialize logging: {}", e);
    }
}

/// Initializes logging with `config`, failing if a subscriber is already set.
pub fn try_init_logging(config: LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = config.env_filter();
    let span_events = config.span_events();

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    }
}
