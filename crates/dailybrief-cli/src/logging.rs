//! Process-wide `tracing` subscriber. Logs go to stderr so stdout carries
//! only command output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::CliError;

pub const ENV_LOG_LEVEL: &str = "APP_LOG_LEVEL";
pub const ENV_RUST_LOG: &str = "RUST_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

pub fn init(json: bool) -> Result<(), CliError> {
    let directive = filter_directive(
        std::env::var(ENV_LOG_LEVEL).ok(),
        std::env::var(ENV_RUST_LOG).ok(),
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|error| CliError::Logging(error.to_string()))
}

/// `APP_LOG_LEVEL`, then `RUST_LOG`, then `info`. Blank values are skipped.
pub fn filter_directive(app_level: Option<String>, rust_log: Option<String>) -> String {
    [app_level, rust_log]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_level_wins_over_rust_log() {
        assert_eq!(
            filter_directive(Some(String::from("debug")), Some(String::from("warn"))),
            "debug"
        );
        assert_eq!(filter_directive(Some(String::from(" ")), Some(String::from("warn"))), "warn");
        assert_eq!(filter_directive(None, None), "info");
    }
}
