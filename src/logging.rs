//! Log output for the `imgseek` binary
//!
//! The library only emits `tracing` events; installing a subscriber is left to the
//! binary so embedding applications keep control of their own output.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a stderr subscriber filtered by `RUST_LOG`, or by `verbose` when unset
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "imgseek=debug" } else { "imgseek=warn" };

    // A second initialisation (e.g. in tests) is harmless, so its error is ignored
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
