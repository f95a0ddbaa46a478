//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SPKCMP_LOG";

/// Install a stderr subscriber filtered by `SPKCMP_LOG`.
///
/// Format: `SPKCMP_LOG=spike_compare::multi=debug,spike_compare=info`.
/// Falls back to `spike_compare=info` when unset or invalid. Calling it again
/// has no effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("spike_compare=info"));

        // A subscriber set elsewhere (e.g. by a test harness) wins.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .try_init();
    });
}
