use tracing_subscriber::{EnvFilter, fmt};

/// Env var holding the filter directive (e.g. `fencepost=debug`).
pub const LOG_ENV: &str = "FENCEPOST_LOG";

/// Install the global stderr subscriber. Safe to call more than once.
pub fn init(
    verbose: bool,
    no_color: bool,
)
{
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .try_init();
}
