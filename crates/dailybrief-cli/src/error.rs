use dailybrief_core::{ConfigError, FetchError, PipelineError, StoreError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration in {dir}")]
    InvalidConfig { dir: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::InvalidConfig { .. } | Self::Fetch(_) => 2,
            Self::Pipeline(PipelineError::Lock(_)) => 4,
            Self::Pipeline(_) => 3,
            Self::Store(_) => 5,
            Self::Serialization(_) => 6,
            Self::Logging(_) => 1,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dailybrief_core::LockError;

    #[test]
    fn held_lock_and_failed_run_have_distinct_codes() {
        let held = CliError::from(PipelineError::Lock(LockError::Held {
            location: String::from("output/run.lock"),
            age_seconds: 12,
        }));
        assert_eq!(held.exit_code(), 4);

        let store = CliError::from(PipelineError::Store(StoreError::Unavailable(String::from(
            "db offline",
        ))));
        assert_eq!(store.exit_code(), 3);

        let config = CliError::from(ConfigError::Invalid(String::from("bad")));
        assert_eq!(config.exit_code(), 2);

        let client = CliError::from(FetchError::Client(String::from("bad user agent")));
        assert_eq!(client.exit_code(), 2);
    }
}
