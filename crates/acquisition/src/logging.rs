//! Tracing subscriber setup for binaries and tests embedding the crate.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber. `RUST_LOG` wins over `level` when set.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
