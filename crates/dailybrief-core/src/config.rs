//! Settings and source configuration.
//!
//! Nothing here is cached globally: callers load a [`Settings`] value, apply
//! [`EnvOverrides`] explicitly, and pass the result down.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dailybrief_warehouse::WarehouseConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::macros::format_description;
use time::Time;

use crate::series::SeriesConfig;
use crate::{ConfigError, SourceDescriptor, SourceKind};

pub const SOURCES_FILE: &str = "sources.yml";
pub const WATCHLIST_FILE: &str = "watchlist.yml";
pub const GEO_FILE: &str = "geo.yml";
pub const SCHEDULE_FILE: &str = "schedule.yml";
pub const SERIES_FILE: &str = "series.yml";
pub const SCORING_FILE: &str = "scoring.yml";
pub const ALERTS_FILE: &str = "alerts.yml";
pub const SETTINGS_FILE: &str = "settings.yml";

/// Prefectures the `tokyo_metro` rollup must always cover.
pub const TOKYO_METRO_PREFECTURES: [&str; 4] = ["Tokyo", "Kanagawa", "Chiba", "Saitama"];

pub const ENV_DB_PATH: &str = "APP_DB_PATH";
pub const ENV_OUTPUT_ROOT: &str = "APP_OUTPUT_ROOT";
pub const ENV_LOCK_PATH: &str = "APP_LOCK_PATH";
pub const ENV_RUN_ID: &str = "RUN_ID";

/// Outbound fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    pub timeout_ms: u64,
    pub retries: u32,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retries: 2,
            user_agent: format!("DailyBrief/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Process settings, loaded from an optional `settings.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub db_path: PathBuf,
    pub output_root: PathBuf,
    pub lock_path: PathBuf,
    pub lock_stale_minutes: u64,
    pub lookback_runs: usize,
    pub fetch: FetchSettings,
    /// Offset of the reference timezone used for timestamp-derived run ids.
    pub run_id_utc_offset_hours: i8,
    pub run_id_override: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("output").join("db").join("app.duckdb"),
            output_root: PathBuf::from("output").join("runs"),
            lock_path: PathBuf::from("output").join("run.lock"),
            lock_stale_minutes: 30,
            lookback_runs: 20,
            fetch: FetchSettings::default(),
            run_id_utc_offset_hours: 9,
            run_id_override: None,
        }
    }
}

impl Settings {
    /// Load `settings.yml` from `config_dir`; a missing file yields defaults.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(SETTINGS_FILE);
        let settings = match read_optional(&path)? {
            Some(content) if !content.trim().is_empty() => {
                serde_yaml::from_str::<Self>(&content)
                    .map_err(|source| ConfigError::Yaml { path, source })?
            }
            _ => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_runs == 0 {
            return Err(ConfigError::Invalid(String::from(
                "lookback_runs must be at least 1",
            )));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "fetch.timeout_ms must be positive",
            )));
        }
        if !(-23..=23).contains(&self.run_id_utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "run_id_utc_offset_hours {} is outside -23..=23",
                self.run_id_utc_offset_hours
            )));
        }
        Ok(())
    }

    /// Apply environment overrides captured by the caller.
    pub fn with_env(mut self, env: &EnvOverrides) -> Self {
        if let Some(db_path) = &env.db_path {
            self.db_path.clone_from(db_path);
        }
        if let Some(output_root) = &env.output_root {
            self.output_root.clone_from(output_root);
        }
        if let Some(lock_path) = &env.lock_path {
            self.lock_path.clone_from(lock_path);
        }
        if env.run_id.is_some() {
            self.run_id_override.clone_from(&env.run_id);
        }
        self
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_minutes.saturating_mul(60))
    }

    pub fn warehouse_config(&self) -> WarehouseConfig {
        WarehouseConfig::new(self.db_path.clone())
    }
}

/// Environment-level overrides, captured once and applied explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub db_path: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub lock_path: Option<PathBuf>,
    pub run_id: Option<String>,
}

impl EnvOverrides {
    pub fn from_process_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            output_root: read(ENV_OUTPUT_ROOT).map(PathBuf::from),
            lock_path: read(ENV_LOCK_PATH).map(PathBuf::from),
            run_id: read(ENV_RUN_ID),
        }
    }
}

/// Validated snapshot of the configured sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcesConfig {
    pub sources: Vec<SourceDescriptor>,
}

impl SourcesConfig {
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, ConfigError> {
        let config = Self { sources };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::DuplicateSourceId {
                    id: source.id.clone(),
                });
            }
            if source.url.trim().is_empty() {
                return Err(ConfigError::MissingUrl {
                    id: source.id.clone(),
                });
            }
            if let SourceKind::StatsApi { params } = &source.kind {
                if params.is_empty() {
                    return Err(ConfigError::MissingParams {
                        id: source.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter().filter(|source| source.enabled)
    }

    /// URL prefixes the fetch client accepts: every configured source URL.
    pub fn allowed_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = Vec::new();
        for source in &self.sources {
            if !source.url.is_empty() && !prefixes.contains(&source.url) {
                prefixes.push(source.url.clone());
            }
        }
        prefixes
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSourcesFile {
    sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSource {
    id: String,
    name: String,
    category: String,
    kind: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    params: Map<String, Value>,
}

const fn default_enabled() -> bool {
    true
}

impl RawSource {
    fn into_descriptor(self) -> Result<SourceDescriptor, ConfigError> {
        let kind = match self.kind.trim().to_ascii_lowercase().as_str() {
            "feed" | "rss" => SourceKind::Feed,
            "stats_api" | "estat_api" => SourceKind::StatsApi {
                params: self.params,
            },
            other => {
                return Err(ConfigError::UnsupportedSourceKind {
                    id: self.id,
                    kind: other.to_owned(),
                })
            }
        };
        Ok(SourceDescriptor {
            id: self.id,
            name: self.name,
            category: self.category,
            enabled: self.enabled,
            url: self.url.map(|url| url.trim().to_owned()).unwrap_or_default(),
            kind,
        })
    }
}

/// Parse and validate `sources.yml` content.
pub fn parse_sources(content: &str, path: &Path) -> Result<SourcesConfig, ConfigError> {
    if content.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{} is empty; expected a `sources` list",
            path.display()
        )));
    }
    let raw: RawSourcesFile =
        serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
    let sources = raw
        .sources
        .into_iter()
        .map(RawSource::into_descriptor)
        .collect::<Result<Vec<_>, _>>()?;
    SourcesConfig::new(sources)
}

/// Load `sources.yml` from `config_dir`.
pub fn load_sources(config_dir: &Path) -> Result<SourcesConfig, ConfigError> {
    let path = config_dir.join(SOURCES_FILE);
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    parse_sources(&content, &path)
}

/// `watchlist.yml`: entities to watch and how they are matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchlistConfig {
    pub watchlist_policy: WatchlistPolicy,
    pub matching_policy: MatchingPolicy,
    #[serde(default)]
    pub watch_entities: Vec<WatchEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchlistPolicy {
    pub limit_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingPolicy {
    pub match_order: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchEntity {
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// `geo.yml`: named rollups of prefectures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoConfig {
    pub geo_rollups: BTreeMap<String, Vec<String>>,
}

impl GeoConfig {
    /// `tokyo_metro` must list every prefecture in [`TOKYO_METRO_PREFECTURES`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let metro = self
            .geo_rollups
            .get("tokyo_metro")
            .map(Vec::as_slice)
            .unwrap_or_default();
        let missing: Vec<&str> = TOKYO_METRO_PREFECTURES
            .into_iter()
            .filter(|required| !metro.iter().any(|name| name == required))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "geo_rollups.tokyo_metro must include Tokyo/Kanagawa/Chiba/Saitama (missing {})",
                missing.join(", ")
            )))
        }
    }
}

/// `schedule.yml`: local wall-clock time of the daily run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// `HH:MM` or `HH:MM:SS` in the reference timezone.
    pub daily_time_jst: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_time_jst: String::from("07:00"),
        }
    }
}

impl ScheduleConfig {
    pub fn daily_time(&self) -> Result<Time, ConfigError> {
        Time::parse(
            self.daily_time_jst.trim(),
            format_description!("[hour]:[minute][optional [:[second]]]"),
        )
        .map_err(|error| {
            ConfigError::Invalid(format!(
                "daily_time_jst '{}' is not a time of day: {error}",
                self.daily_time_jst
            ))
        })
    }
}

/// `scoring.yml`: weighted scoring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    #[serde(default)]
    pub default_score: f64,
    #[serde(default)]
    pub rules: Vec<ScoringRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringRule {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

const fn default_weight() -> f64 {
    1.0
}

/// `alerts.yml`: alert delivery channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub channels: Vec<AlertChannel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertChannel {
    pub channel: String,
    #[serde(default)]
    pub target: Option<String>,
}

/// Deserialize one YAML config document. An empty document reads as `{}`.
pub(crate) fn parse_yaml<T: DeserializeOwned>(
    content: &str,
    path: &Path,
) -> Result<T, ConfigError> {
    let content = if content.trim().is_empty() { "{}" } else { content };
    serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Validation outcome for one configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Ok,
    /// Optional file absent; defaults apply.
    Defaulted,
    Missing,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigReport {
    pub ok: bool,
    pub files: Vec<FileReport>,
}

/// Validate every configuration file in `config_dir` without stopping at
/// the first failure. `settings.yml` is optional; every other file must be
/// present.
pub fn validate_config_dir(config_dir: &Path) -> ConfigReport {
    let files = vec![
        check_file(config_dir, SOURCES_FILE, |content, path| {
            let config = parse_sources(content, path)?;
            Ok(format!(
                " ({} sources, {} enabled)",
                config.sources.len(),
                config.enabled().count()
            ))
        }),
        check_file(config_dir, WATCHLIST_FILE, |content, path| {
            let config: WatchlistConfig = parse_yaml(content, path)?;
            Ok(format!(" ({} entities)", config.watch_entities.len()))
        }),
        check_file(config_dir, GEO_FILE, |content, path| {
            let config: GeoConfig = parse_yaml(content, path)?;
            config.validate()?;
            Ok(format!(" ({} rollups)", config.geo_rollups.len()))
        }),
        check_file(config_dir, SCHEDULE_FILE, |content, path| {
            let config: ScheduleConfig = parse_yaml(content, path)?;
            config.daily_time()?;
            Ok(String::new())
        }),
        check_file(config_dir, SERIES_FILE, |content, path| {
            let config = SeriesConfig::parse(content, path)?;
            Ok(format!(" ({} series)", config.series.len()))
        }),
        check_file(config_dir, SCORING_FILE, |content, path| {
            let config: ScoringConfig = parse_yaml(content, path)?;
            Ok(format!(" ({} rules)", config.rules.len()))
        }),
        check_file(config_dir, ALERTS_FILE, |content, path| {
            let config: AlertsConfig = parse_yaml(content, path)?;
            Ok(format!(" ({} channels)", config.channels.len()))
        }),
        check_settings(config_dir),
    ];

    let ok = files
        .iter()
        .all(|file| matches!(file.status, FileStatus::Ok | FileStatus::Defaulted));
    ConfigReport { ok, files }
}

/// Read a required file and run `check` over it. `check` returns a detail
/// suffix for the `ok` message.
fn check_file(
    config_dir: &Path,
    file: &str,
    check: impl FnOnce(&str, &Path) -> Result<String, ConfigError>,
) -> FileReport {
    let path = config_dir.join(file);
    let (status, message) = match fs::read_to_string(&path) {
        Err(error) if error.kind() == ErrorKind::NotFound => {
            (FileStatus::Missing, format!("{file}: missing"))
        }
        Err(error) => (FileStatus::Invalid, format!("{file}: {error}")),
        Ok(content) => match check(&content, &path) {
            Ok(detail) => (FileStatus::Ok, format!("{file}: ok{detail}")),
            Err(error) => (FileStatus::Invalid, format!("{file}: {error}")),
        },
    };
    FileReport {
        file: file.to_owned(),
        status,
        message,
    }
}

fn check_settings(config_dir: &Path) -> FileReport {
    let settings_present = config_dir.join(SETTINGS_FILE).exists();
    let (status, message) = match Settings::load(config_dir) {
        Ok(_) if settings_present => (FileStatus::Ok, format!("{SETTINGS_FILE}: ok")),
        Ok(_) => (
            FileStatus::Defaulted,
            format!("{SETTINGS_FILE}: missing, defaults apply"),
        ),
        Err(error) => (FileStatus::Invalid, format!("{SETTINGS_FILE}: {error}")),
    };
    FileReport {
        file: SETTINGS_FILE.to_owned(),
        status,
        message,
    }
}

pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const VALID_SOURCES: &str = r#"
sources:
  - id: nhk
    name: NHK News
    category: news
    kind: rss
    url: https://www3.nhk.or.jp/rss/news/cat0.xml
  - id: cpi
    name: Consumer Price Index
    category: statistics
    kind: estat_api
    url: https://api.e-stat.go.jp/rest/3.0/app/json/getStatsData
    params:
      app_id: demo
      dataset_id: "0003427113"
  - id: paused
    name: Paused Feed
    category: news
    kind: feed
    enabled: false
    url: https://example.test/paused.xml
"#;

    #[test]
    fn parses_sources_with_kind_aliases() {
        let config = parse_sources(VALID_SOURCES, Path::new("sources.yml")).expect("must parse");

        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[0].kind, SourceKind::Feed);
        assert!(matches!(config.sources[1].kind, SourceKind::StatsApi { .. }));
        assert_eq!(config.enabled().count(), 2);
        assert_eq!(config.allowed_prefixes().len(), 3);
    }

    #[test]
    fn rejects_unknown_kind_at_load_time() {
        let yaml = "sources:\n  - {id: x, name: X, category: c, kind: podcast, url: https://x.test}\n";
        let err = parse_sources(yaml, Path::new("sources.yml")).expect_err("must fail");
        assert!(matches!(err, ConfigError::UnsupportedSourceKind { kind, .. } if kind == "podcast"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let yaml = "sources:\n  - {id: a, name: A, category: c, kind: rss, url: https://a.test}\n  - {id: a, name: B, category: c, kind: rss, url: https://b.test}\n";
        let err = parse_sources(yaml, Path::new("sources.yml")).expect_err("must fail");
        assert!(matches!(err, ConfigError::DuplicateSourceId { id } if id == "a"));
    }

    #[test]
    fn stats_api_requires_params() {
        let yaml = "sources:\n  - {id: s, name: S, category: c, kind: stats_api, url: https://s.test}\n";
        let err = parse_sources(yaml, Path::new("sources.yml")).expect_err("must fail");
        assert!(matches!(err, ConfigError::MissingParams { .. }));
    }

    #[test]
    fn feed_requires_url() {
        let yaml = "sources:\n  - {id: f, name: F, category: c, kind: rss}\n";
        let err = parse_sources(yaml, Path::new("sources.yml")).expect_err("must fail");
        assert!(matches!(err, ConfigError::MissingUrl { .. }));
    }

    #[test]
    fn settings_default_when_missing_and_env_overrides_apply() {
        let temp = tempdir().expect("tempdir");
        let settings = Settings::load(temp.path()).expect("defaults");
        assert_eq!(settings, Settings::default());

        let env = EnvOverrides::from_lookup(|key| match key {
            ENV_DB_PATH => Some(String::from("/tmp/other.duckdb")),
            ENV_RUN_ID => Some(String::from("  ")),
            _ => None,
        });
        let settings = settings.with_env(&env);
        assert_eq!(settings.db_path, PathBuf::from("/tmp/other.duckdb"));
        assert_eq!(settings.run_id_override, None);
        assert_eq!(settings.output_root, PathBuf::from("output").join("runs"));
    }

    #[test]
    fn settings_file_overrides_selected_keys() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join(SETTINGS_FILE),
            "lookback_runs: 5\nfetch:\n  retries: 0\n",
        )
        .expect("write settings");

        let settings = Settings::load(temp.path()).expect("load");
        assert_eq!(settings.lookback_runs, 5);
        assert_eq!(settings.fetch.retries, 0);
        assert_eq!(settings.fetch.timeout_ms, 10_000);
        assert_eq!(settings.lock_stale_minutes, 30);
    }

    const VALID_FILES: [(&str, &str); 6] = [
        (
            WATCHLIST_FILE,
            "watchlist_policy: {limit_enabled: true}\nmatching_policy: {match_order: name_first}\nwatch_entities:\n  - name: Bank of Japan\n    metadata: {sector: finance}\n",
        ),
        (
            GEO_FILE,
            "geo_rollups:\n  tokyo_metro: [Tokyo, Kanagawa, Chiba, Saitama]\n  kansai: [Osaka, Kyoto, Hyogo]\n",
        ),
        (SCHEDULE_FILE, "daily_time_jst: \"07:30\"\n"),
        (
            SERIES_FILE,
            "series:\n  - key: cpi_headline\n    resolver: {type: passthrough, value: headline}\n",
        ),
        (SCORING_FILE, "default_score: 0.5\nrules:\n  - name: watchlist_hit\n"),
        (ALERTS_FILE, "channels:\n  - channel: log\n"),
    ];

    fn write_valid_config(dir: &Path) {
        fs::write(dir.join(SOURCES_FILE), VALID_SOURCES).expect("write sources");
        for (file, content) in VALID_FILES {
            fs::write(dir.join(file), content).expect("write config");
        }
    }

    fn status_of<'a>(report: &'a ConfigReport, file: &str) -> &'a FileReport {
        report
            .files
            .iter()
            .find(|entry| entry.file == file)
            .expect("file reported")
    }

    #[test]
    fn validation_report_lists_every_file() {
        let temp = tempdir().expect("tempdir");
        let report = validate_config_dir(temp.path());
        assert!(!report.ok);
        let files: Vec<&str> = report.files.iter().map(|entry| entry.file.as_str()).collect();
        assert_eq!(
            files,
            [
                SOURCES_FILE,
                WATCHLIST_FILE,
                GEO_FILE,
                SCHEDULE_FILE,
                SERIES_FILE,
                SCORING_FILE,
                ALERTS_FILE,
                SETTINGS_FILE
            ]
        );
        assert!(report.files[..7]
            .iter()
            .all(|entry| entry.status == FileStatus::Missing));
        assert_eq!(report.files[7].status, FileStatus::Defaulted);

        write_valid_config(temp.path());
        let report = validate_config_dir(temp.path());
        assert!(report.ok, "{report:?}");
        assert!(report.files[..7]
            .iter()
            .all(|entry| entry.status == FileStatus::Ok));
    }

    #[test]
    fn a_missing_file_is_reported_by_name_and_fails_validation() {
        let temp = tempdir().expect("tempdir");
        write_valid_config(temp.path());
        fs::remove_file(temp.path().join(SCORING_FILE)).expect("remove scoring");

        let report = validate_config_dir(temp.path());
        assert!(!report.ok);
        let scoring = status_of(&report, SCORING_FILE);
        assert_eq!(scoring.status, FileStatus::Missing);
        assert_eq!(scoring.message, "scoring.yml: missing");
        assert_eq!(status_of(&report, ALERTS_FILE).status, FileStatus::Ok);
    }

    #[test]
    fn tokyo_metro_rollup_must_cover_the_four_prefectures() {
        let temp = tempdir().expect("tempdir");
        write_valid_config(temp.path());
        fs::write(
            temp.path().join(GEO_FILE),
            "geo_rollups:\n  tokyo_metro: [Tokyo, Kanagawa, Chiba]\n",
        )
        .expect("write geo");

        let report = validate_config_dir(temp.path());
        assert!(!report.ok);
        let geo = status_of(&report, GEO_FILE);
        assert_eq!(geo.status, FileStatus::Invalid);
        assert!(geo.message.contains("Saitama"), "{}", geo.message);

        let no_metro = GeoConfig {
            geo_rollups: BTreeMap::from([(String::from("kansai"), vec![String::from("Osaka")])]),
        };
        assert!(matches!(no_metro.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_keys_and_bad_times_are_rejected() {
        let path = Path::new(ALERTS_FILE);
        let err = parse_yaml::<AlertsConfig>("enabled: true\nwebhook: https://x.test\n", path)
            .expect_err("unknown key");
        assert!(matches!(err, ConfigError::Yaml { .. }));

        let alerts: AlertsConfig = parse_yaml("", path).expect("empty document uses defaults");
        assert!(alerts.enabled);
        assert!(alerts.channels.is_empty());

        let schedule = ScheduleConfig {
            daily_time_jst: String::from("25:00"),
        };
        assert!(schedule.daily_time().is_err());
        assert_eq!(
            ScheduleConfig::default().daily_time().expect("default time"),
            time::macros::time!(7:00)
        );
    }
}
