use tracing_subscriber::EnvFilter;

pub const DEBUG_ENV_VAR: &str = "FLOAT_PANEL_DEBUG";

/// Debug logging is on in debug builds, or when `FLOAT_PANEL_DEBUG=1`.
pub fn debug_requested() -> bool {
    cfg!(debug_assertions)
        || std::env::var(DEBUG_ENV_VAR)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

/// Installs the global subscriber. `log` records from the rest of the crate
/// are forwarded to it. `RUST_LOG` is only consulted when `debug` is set.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
