use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::{Map, Value};

/// Kind of a configured source, with the parameters only that kind needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// RSS or Atom syndication feed.
    Feed,
    /// Tabular statistics API (e-Stat shaped JSON).
    StatsApi { params: Map<String, Value> },
}

impl SourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::StatsApi { .. } => "stats_api",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated source descriptor. Read-only to the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub category: String,
    pub enabled: bool,
    pub url: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn feed(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::from("general"),
            enabled: true,
            url: url.into(),
            kind: SourceKind::Feed,
        }
    }

    pub fn stats_api(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::from("statistics"),
            enabled: true,
            url: url.into(),
            kind: SourceKind::StatsApi { params },
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub const fn kind_name(&self) -> &'static str {
        self.kind.as_str()
    }
}
