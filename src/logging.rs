//! Tracing subscriber setup for binaries and demos.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the application. This helper covers the common case.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "EMBEDDED_LOG";

/// Default filter directive for the given debug flag.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Build the filter: `EMBEDDED_LOG`, then `RUST_LOG`, then the default.
pub fn filter(debug: bool) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {} directive ({}); using defaults", LOG_ENV, err);
            EnvFilter::new(default_directive(debug))
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(debug))),
    }
}

/// Install a stderr fmt subscriber.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing(debug: bool) -> bool {
    tracing_subscriber::registry()
        .with(filter(debug))
        .with(fmt::layer().with_target(debug).with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }

    #[test]
    fn test_second_init_is_refused() {
        init_tracing(false);
        assert!(!init_tracing(true));
    }
}
