//! Keyturn Log - tracing initialisation for keyturn services
//!
//! ```no_run
//! let _guard = keyturn_log::init()?;
//! tracing::info!("ready");
//! # Ok::<(), keyturn_log::LogError>(())
//! ```
//!
//! The level filter comes from `KEYTURN_LOG`, then `RUST_LOG`, then `info`.
#![deny(unsafe_code)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Fields, Format};
pub use error::{LogError, LogResult};

/// Initialise logging from the environment
///
/// # Errors
///
/// Fails when the filter cannot be parsed or a global subscriber is already set.
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::from_env())
}

/// Initialise logging with an explicit configuration
///
/// # Errors
///
/// Fails when the filter cannot be parsed or a global subscriber is already set.
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
