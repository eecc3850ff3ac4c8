use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{InvalidValue, SourceFailure, UtcDateTime};

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = InvalidValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            other => Err(InvalidValue {
                field: "run status",
                value: other.to_owned(),
            }),
        }
    }
}

/// How a run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Manual,
    Scheduled,
}

impl RunMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        }
    }
}

impl Display for RunMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = InvalidValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(InvalidValue {
                field: "run mode",
                value: other.to_owned(),
            }),
        }
    }
}

/// One execution of the ingestion cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub run_id: String,
    pub started_at: UtcDateTime,
    pub ended_at: Option<UtcDateTime>,
    pub status: RunStatus,
    pub mode: RunMode,
    pub params: serde_json::Value,
    pub item_count: u64,
    pub source_count: u64,
}

impl Run {
    /// A freshly started run in `running` status.
    pub fn start(run_id: impl Into<String>, mode: RunMode, params: serde_json::Value) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: UtcDateTime::now(),
            ended_at: None,
            status: RunStatus::Running,
            mode,
            params,
            item_count: 0,
            source_count: 0,
        }
    }

    /// Move the run to its terminal state.
    pub fn finish(&mut self, status: RunStatus, item_count: u64, source_count: u64) {
        self.ended_at = Some(UtcDateTime::now());
        self.status = status;
        self.item_count = item_count;
        self.source_count = source_count;
    }
}

/// Outcome status of one source within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRunStatus {
    Success,
    Disabled,
    Failed,
}

impl SourceRunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Disabled => "disabled",
            Self::Failed => "failed",
        }
    }
}

impl Display for SourceRunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceRunStatus {
    type Err = InvalidValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "disabled" => Ok(Self::Disabled),
            "failed" => Ok(Self::Failed),
            other => Err(InvalidValue {
                field: "source run status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Recorded outcome of one source within one run. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRunRecord {
    pub run_id: String,
    pub source_id: String,
    pub started_at: UtcDateTime,
    pub ended_at: Option<UtcDateTime>,
    pub status: SourceRunStatus,
    pub item_count: u64,
    pub error_class: Option<String>,
    pub error_message: Option<String>,
    pub http_status: Option<u16>,
}

impl SourceRunRecord {
    /// Record for a disabled source; no fetch is attempted.
    pub fn disabled(run_id: &str, source_id: &str, at: UtcDateTime) -> Self {
        Self {
            run_id: run_id.to_owned(),
            source_id: source_id.to_owned(),
            started_at: at,
            ended_at: Some(at),
            status: SourceRunStatus::Disabled,
            item_count: 0,
            error_class: None,
            error_message: None,
            http_status: None,
        }
    }

    pub fn success(
        run_id: &str,
        source_id: &str,
        started_at: UtcDateTime,
        ended_at: UtcDateTime,
        item_count: u64,
    ) -> Self {
        Self {
            run_id: run_id.to_owned(),
            source_id: source_id.to_owned(),
            started_at,
            ended_at: Some(ended_at),
            status: SourceRunStatus::Success,
            item_count,
            error_class: None,
            error_message: None,
            http_status: None,
        }
    }

    pub fn failed(
        run_id: &str,
        source_id: &str,
        started_at: UtcDateTime,
        ended_at: UtcDateTime,
        failure: &SourceFailure,
    ) -> Self {
        Self {
            run_id: run_id.to_owned(),
            source_id: source_id.to_owned(),
            started_at,
            ended_at: Some(ended_at),
            status: SourceRunStatus::Failed,
            item_count: 0,
            error_class: Some(failure.error_class().to_owned()),
            error_message: Some(failure.to_string()),
            http_status: failure.http_status(),
        }
    }
}
