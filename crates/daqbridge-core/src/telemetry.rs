//! `tracing` subscriber initialisation.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default given by the caller). |
//! | `DAQBRIDGE_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! Logs always go to stderr so they never mix with console output that a
//! host may be capturing.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Returns `false` when another subscriber
/// was installed first; the existing one is left in place.
pub fn init_tracing(default_level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let use_json = std::env::var("DAQBRIDGE_LOG_FORMAT").as_deref() == Ok("json");

    let result = if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_the_first_subscriber() {
        init_tracing("warn");
        assert!(!init_tracing("debug"));
    }
}
