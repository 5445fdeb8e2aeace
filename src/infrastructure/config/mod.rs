//! Configuration Module
//!
//! Configuration types and environment loading for the streaming client.

mod settings;

pub use settings::{ConfigError, Credentials, TickerConfig, DEFAULT_ENDPOINT};
