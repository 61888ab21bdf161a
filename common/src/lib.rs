//! Shared utilities for the PostgreSQL entrypoint
//!
//! This crate provides common functionality used by the entrypoint binaries:
//! - Structured logging initialization
//! - Environment variable parsing helpers
//! - Command execution utilities
//! - Lifecycle event reporting

pub mod command;
pub mod config;
pub mod logging;
pub mod telemetry;

pub use command::{pg_ctl, pg_isready_probe, psql};
pub use config::{env_opt, ConfigExt, ContainerEnv};
pub use logging::init_logging;
pub use telemetry::{Telemetry, TelemetryEvent};
