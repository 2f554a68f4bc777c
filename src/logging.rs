//! Tracing setup for the command-line front end.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Logs go to stderr so the receipt on stdout stays machine-readable.
/// `RUST_LOG` wins when it is set; otherwise the crate logs at `info`, or
/// `debug` when `verbose` is on. Later calls are no-ops.
pub fn init(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let fallback = if verbose {
            "cart_engine=debug"
        } else {
            "cart_engine=info"
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
            )
            .with_writer(std::io::stderr)
            .try_init();
    });
}
