//! Tracing Initialization
//!
//! Configures `tracing-subscriber` with an environment-driven filter and a
//! compact fmt layer.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `kite_ticker=info`)
//!
//! # Usage
//!
//! ```ignore
//! kite_ticker::infrastructure::telemetry::init();
//! tracing::info!("starting ticker");
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "kite_ticker=info";

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops. This makes it
/// usable from both binaries and tests.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
