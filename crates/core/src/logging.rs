//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Returns the filter directive used when `RUST_LOG` is unset.
///
/// The debug flag only raises the verbosity of the ringframe crates; it never
/// changes rendering behaviour.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,ringframe=debug,ringframe_renderer=debug,ringframe_rhi=debug,ringframe_platform=debug"
    } else {
        "info,ringframe_rhi=warn"
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over [`default_filter`]. Thread ids are always
/// printed since concurrent workers share the log.
///
/// # Example
/// ```no_run
/// ringframe_core::init_logging(false);
/// tracing::info!("engine starting");
/// ```
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
