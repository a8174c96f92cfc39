//! Diagnostic logging for the binary.
//!
//! Library code only emits `tracing` events; the subscriber is
//! installed here, writing to stderr so command output stays clean.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter, e.g. `KDBX_LOG=debug`.
pub const LOG_ENV: &str = "KDBX_LOG";

/// Install the stderr subscriber.  `KDBX_LOG` wins over `fallback`.
/// Calling this twice is harmless.
pub fn init(fallback: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
