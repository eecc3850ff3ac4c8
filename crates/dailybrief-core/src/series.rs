//! Indicator series resolution.
//!
//! `series.yml` lists series keys, each with a resolver. Every run resolves
//! the whole list and records one outcome per key. A resolver that cannot
//! produce an id leaves the key `unresolved` with a message; it never fails
//! the run.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{parse_yaml, read_optional, SERIES_FILE};
use crate::ConfigError;

/// Resolver types that map the configured value straight to the series id.
const DIRECT_RESOLVERS: [&str; 2] = ["passthrough", "source_id"];

/// Parsed `series.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesConfig {
    pub series: Vec<SeriesEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesEntry {
    pub key: String,
    pub resolver: ResolverSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl SeriesConfig {
    /// Load `series.yml` from `config_dir`. A missing file means no series.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(SERIES_FILE);
        match read_optional(&path)? {
            Some(content) => Self::parse(&content, &path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = parse_yaml(content, path)?;
        config.validate()?;
        Ok(config)
    }

    /// Keys must be non-empty and unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for entry in &self.series {
            let key = entry.key.trim();
            if key.is_empty() {
                return Err(ConfigError::Invalid(String::from(
                    "series key must not be empty",
                )));
            }
            if !seen.insert(key) {
                return Err(ConfigError::Invalid(format!("duplicate series key '{key}'")));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Outcome of resolving one series key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    Unresolved,
}

impl ResolutionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Unresolved => "unresolved",
        }
    }
}

impl Display for ResolutionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesResolution {
    pub series_key: String,
    pub resolver_type: String,
    pub resolver_value: Option<String>,
    pub resolved_id: Option<String>,
    pub status: ResolutionStatus,
    pub message: Option<String>,
}

impl SeriesResolution {
    pub const fn is_resolved(&self) -> bool {
        matches!(self.status, ResolutionStatus::Resolved)
    }
}

pub fn resolve_entry(entry: &SeriesEntry) -> SeriesResolution {
    let kind = entry.resolver.kind.trim();
    let value = entry
        .resolver
        .value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let (resolved_id, message) = if !DIRECT_RESOLVERS.contains(&kind) {
        (None, Some(format!("Unknown resolver type: {kind}")))
    } else if let Some(value) = value {
        (Some(value.to_owned()), None)
    } else {
        (None, Some(String::from("Missing resolver value")))
    };

    SeriesResolution {
        series_key: entry.key.trim().to_owned(),
        resolver_type: kind.to_owned(),
        resolver_value: entry.resolver.value.clone(),
        status: if resolved_id.is_some() {
            ResolutionStatus::Resolved
        } else {
            ResolutionStatus::Unresolved
        },
        resolved_id,
        message,
    }
}

/// Resolve every configured series, in configuration order.
pub fn resolve_series(config: &SeriesConfig) -> Vec<SeriesResolution> {
    config.series.iter().map(resolve_entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SERIES: &str = r#"
series:
  - key: ok_passthrough
    resolver: {type: passthrough, value: headline}
  - key: by_source
    resolver: {type: source_id, value: estat_cpi}
  - key: bad_type
    resolver: {type: nope, value: x}
  - key: missing_value
    resolver: {type: passthrough}
"#;

    #[test]
    fn direct_resolvers_resolve_and_everything_else_is_unresolved() {
        let config = SeriesConfig::parse(SERIES, Path::new(SERIES_FILE)).expect("parse");
        let resolved = resolve_series(&config);

        let summary: Vec<(&str, ResolutionStatus, Option<&str>)> = resolved
            .iter()
            .map(|r| (r.series_key.as_str(), r.status, r.resolved_id.as_deref()))
            .collect();
        assert_eq!(
            summary,
            [
                ("ok_passthrough", ResolutionStatus::Resolved, Some("headline")),
                ("by_source", ResolutionStatus::Resolved, Some("estat_cpi")),
                ("bad_type", ResolutionStatus::Unresolved, None),
                ("missing_value", ResolutionStatus::Unresolved, None),
            ]
        );
        assert_eq!(
            resolved[2].message.as_deref(),
            Some("Unknown resolver type: nope")
        );
        assert_eq!(resolved[3].message.as_deref(), Some("Missing resolver value"));
        assert_eq!(resolved[0].message, None);
    }

    #[test]
    fn blank_resolver_value_counts_as_missing() {
        let entry = SeriesEntry {
            key: String::from("blank"),
            resolver: ResolverSpec {
                kind: String::from("source_id"),
                value: Some(String::from("  ")),
            },
        };
        let resolution = resolve_entry(&entry);
        assert!(!resolution.is_resolved());
        assert_eq!(resolution.resolver_value.as_deref(), Some("  "));
    }

    #[test]
    fn missing_file_means_no_series_but_bad_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        assert!(SeriesConfig::load(temp.path()).expect("missing").is_empty());

        fs::write(
            temp.path().join(SERIES_FILE),
            "series:\n  - {key: a, resolver: {type: passthrough, value: x}}\n  - {key: a, resolver: {type: passthrough, value: y}}\n",
        )
        .expect("write");
        let err = SeriesConfig::load(temp.path()).expect_err("duplicate key");
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("'a'")));

        fs::write(temp.path().join(SERIES_FILE), "series:\n  - key: a\n").expect("write");
        assert!(matches!(
            SeriesConfig::load(temp.path()),
            Err(ConfigError::Yaml { .. })
        ));
    }
}
