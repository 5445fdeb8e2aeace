//! Infrastructure layer — transport adapters, configuration, and logging.

/// Configuration and environment loading.
pub mod config;

/// WebSocket feed adapters.
pub mod kite;

/// Logging initialization.
pub mod telemetry;
