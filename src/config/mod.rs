//! Configuration for a host embedding `semlayer`.
//!
//! Handles connection configuration, environment variables, and settings.
//! The core itself is side-effect-free; this module exists for the caller
//! that wires up connections, a dialect, and logging.

mod connection;
mod settings;

pub use connection::{ConnectionConfig, ConnectionError, Driver};
pub use settings::{
    expand_env_vars, ConnectionSettings, LoggingSettings, Settings, SettingsError,
};
