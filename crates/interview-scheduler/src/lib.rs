//! Interview scheduling engine.
//!
//! The [`scheduling`] module holds the engine itself; [`config`], [`telemetry`] and
//! [`error`] carry the service plumbing shared with the API binary.

pub mod config;
pub mod error;
pub mod scheduling;
pub mod telemetry;

pub use config::{AppConfig, AppEnvironment, ConfigError, SchedulerConfig};
pub use error::AppError;
