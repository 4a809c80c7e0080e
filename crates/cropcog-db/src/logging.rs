//! # Logging
//!
//! Tracing subscriber setup for binaries and tests.
//!
//! Library code only emits events (`debug!` per repository call, `info!` on
//! connect, `warn!` on a stopped batch); installing a subscriber is left to
//! the process that owns `main`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,cropcog=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages from every crate
/// - `RUST_LOG=cropcog_db=trace` - Trace the store layer only
/// - Default: [`DEFAULT_FILTER`]
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
        tracing::debug!("subscriber installed");
    }
}
