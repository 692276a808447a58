//! Installs the process-wide tracing subscriber, only when requested.

use std::io::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;

const LOG_ENV_VAR: &str = "MODLINK_LOG";

/// Initializes logging from `MODLINK_LOG`, or does nothing if it is unset.
///
/// Library crates never call this; only the binary owns the global
/// subscriber, so a caller embedding these crates can install its own.
pub(crate) fn initialize() {
    if std::env::var_os(LOG_ENV_VAR).is_none() {
        return;
    }

    let enable_ansi = std::io::stdout().is_terminal();

    let format = fmt::format()
        .with_ansi(enable_ansi)
        .with_level(true)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime())
        .compact();

    let filter = EnvFilter::from_env(LOG_ENV_VAR);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .fmt_fields(fmt::format::DefaultFields::new())
        .event_format(format)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_without_the_env_var_does_not_panic() {
        assert!(std::env::var_os(LOG_ENV_VAR).is_none());
        initialize();
    }
}
