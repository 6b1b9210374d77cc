//! # cws-observability
//!
//! Structured logging for the cascade-ws crates, built on `tracing`.

pub mod logging;

pub use logging::{
    init_logging, init_logging_with_config, try_init_logging, LoggingConfig, WORKSPACE_TARGETS,
};
