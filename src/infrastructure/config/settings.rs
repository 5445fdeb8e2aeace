//! Ticker Configuration Settings
//!
//! Configuration for the streaming client: credentials, endpoint, connect
//! timeout, and reconnection behavior. Loadable from environment variables
//! or built programmatically.

use std::time::Duration;

use crate::infrastructure::kite::reconnect::ReconnectConfig;

/// Default WebSocket endpoint for the quote feed.
pub const DEFAULT_ENDPOINT: &str = "wss://ws.kite.trade";

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Credentials
// =============================================================================

/// API credentials for the feed.
///
/// The `Debug` implementation redacts the access token for safe logging.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    access_token: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: access_token.into(),
        }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Replace the API key.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
    }

    /// Replace the access token.
    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = access_token.into();
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Ticker Configuration
// =============================================================================

/// Complete configuration for the streaming client.
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// API credentials used to build the connect URL.
    pub credentials: Credentials,
    /// WebSocket endpoint, without the credential query string.
    pub endpoint: String,
    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,
    /// Whether to reconnect automatically after non-clean disconnects.
    pub enable_reconnect: bool,
    /// Backoff parameters for automatic reconnection.
    pub reconnect: ReconnectConfig,
}

impl TickerConfig {
    /// Create a configuration with default endpoint and timings.
    ///
    /// Reconnection is disabled by default.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            enable_reconnect: false,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `KITE_API_KEY` (required) and `KITE_ACCESS_TOKEN` (optional;
    /// the token can also be set on the client after login), plus optional
    /// overrides `KITE_WS_ENDPOINT`, `KITE_WS_CONNECT_TIMEOUT_SECS`,
    /// `KITE_WS_ENABLE_RECONNECT`, `KITE_WS_MAX_RECONNECT_DELAY_SECS`, and
    /// `KITE_WS_MAX_RECONNECT_TRIES`.
    ///
    /// # Errors
    ///
    /// Returns an error if `KITE_API_KEY` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("KITE_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("KITE_API_KEY".to_string()))?;
        if api_key.is_empty() {
            return Err(ConfigError::EmptyValue("KITE_API_KEY".to_string()));
        }

        let access_token = std::env::var("KITE_ACCESS_TOKEN").unwrap_or_default();

        let endpoint =
            std::env::var("KITE_WS_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let connect_timeout =
            parse_env_duration_secs("KITE_WS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT);

        let enable_reconnect = std::env::var("KITE_WS_ENABLE_RECONNECT")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let defaults = ReconnectConfig::default();
        let reconnect = ReconnectConfig {
            max_delay: parse_env_duration_secs(
                "KITE_WS_MAX_RECONNECT_DELAY_SECS",
                defaults.max_delay,
            ),
            max_tries: parse_env_u32("KITE_WS_MAX_RECONNECT_TRIES", defaults.max_tries),
            ..defaults
        };

        Ok(Self {
            credentials: Credentials::new(api_key, access_token),
            endpoint,
            connect_timeout,
            enable_reconnect,
            reconnect,
        })
    }

    /// Build the connect URL for the given credentials.
    ///
    /// Credentials are passed explicitly because they are runtime-mutable on
    /// the client, and changes only take effect at the next connect attempt.
    #[must_use]
    pub fn connect_url(&self, credentials: &Credentials) -> String {
        format!(
            "{}/?api_key={}&access_token={}",
            self.endpoint.trim_end_matches('/'),
            credentials.api_key(),
            credentials.access_token()
        )
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has an empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}
