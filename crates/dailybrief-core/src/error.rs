use std::path::PathBuf;

use dailybrief_warehouse::WarehouseError;
use thiserror::Error;

/// Timestamp text that could not be interpreted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid timestamp '{value}'")]
pub struct TimestampError {
    pub value: String,
}

/// Text that does not name a known enum variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {field} '{value}'")]
pub struct InvalidValue {
    pub field: &'static str,
    pub value: String,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("duplicate source id '{id}'")]
    DuplicateSourceId { id: String },

    #[error("source '{id}' requires a url")]
    MissingUrl { id: String },

    #[error("source '{id}' of kind stats_api requires non-empty params")]
    MissingParams { id: String },

    #[error("source '{id}' has unsupported kind '{kind}', expected one of feed, stats_api")]
    UnsupportedSourceKind { id: String, kind: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Outbound fetch failures. URLs carried here are already redacted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("URL not allowed: {url}")]
    NotAllowed { url: String },

    #[error("HTTP status {status} from {url} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("request to {url} failed after {attempts} attempt(s): {message}")]
    Transport {
        url: String,
        message: String,
        attempts: u32,
    },

    /// The transport could not be constructed; no request was attempted.
    #[error("HTTP client unavailable: {0}")]
    Client(String),
}

impl FetchError {
    /// HTTP status of the last attempt, when the server answered at all.
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotAllowed { .. } | Self::Transport { .. } | Self::Client(_) => None,
        }
    }
}

/// Malformed or unexpected payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("missing node '{0}'")]
    MissingNode(&'static str),

    #[error("API reported status {status}: {message}")]
    Api { status: String, message: String },
}

impl From<quick_xml::Error> for ParseError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Xml(error.to_string())
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

/// Failure of a single source within a run. Never aborts the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SourceFailure {
    /// Stable class name recorded on the source run.
    pub const fn error_class(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "FetchError",
            Self::Parse(_) => "ParseError",
        }
    }

    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Fetch(error) => error.http_status(),
            Self::Parse(_) => None,
        }
    }
}

/// Run lock errors.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("another run holds the lock at {location} (age {age_seconds}s)")]
    Held { location: String, age_seconds: u64 },

    #[error("lock I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage errors surfaced through the run store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<TimestampError> for StoreError {
    fn from(error: TimestampError) -> Self {
        Self::Corrupt(error.to_string())
    }
}

impl From<InvalidValue> for StoreError {
    fn from(error: InvalidValue) -> Self {
        Self::Corrupt(error.to_string())
    }
}

/// Export writer errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal run-boundary errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
