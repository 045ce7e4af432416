use std::io;

use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr and stay quiet unless asked for: `--debug`
/// turns on this crate's debug events, `RUST_LOG` overrides both.
pub fn init(debug: bool) {
    let fallback = if debug { "warn,ephemeral_keygen=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
