//! Logging and tracing configuration
//!
//! Structured logging via the `tracing` crate. Initialize once at startup:
//! ```rust
//! evid_core::logging::init();
//! ```
//!
//! Set `RUST_LOG` to control levels at runtime:
//! ```bash
//! RUST_LOG=evid_core=debug  # detailed pipeline progress
//! RUST_LOG=warn             # only degraded extractions and errors
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging/tracing system
///
/// Call once at application startup; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // info in release, debug in debug builds
        if cfg!(debug_assertions) {
            EnvFilter::new("evid_core=debug")
        } else {
            EnvFilter::new("evid_core=info")
        }
    });

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Verbose variant with file:line and thread IDs, useful while debugging
pub fn init_verbose() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .pretty(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info};

    #[test]
    fn test_init() {
        init();
        info!("test log message");
        debug!(key = "value", "structured log");
    }
}
