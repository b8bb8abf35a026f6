//! Logging setup for the binaries.

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber.
///
/// Default filter is `info` with engine debug output; `RUST_LOG` overrides it.
/// Calling this twice is harmless: the second call is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pawpos=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
