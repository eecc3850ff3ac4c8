//! # Dailybrief Warehouse
//!
//! DuckDB-backed storage for ingestion run history.
//!
//! ## Overview
//!
//! The warehouse persists four kinds of rows:
//!
//! - **Runs**: one row per ingestion cycle, created `running` and finished once
//! - **Sources**: the source descriptors as configured for a given run
//! - **Source runs**: per-source outcome of a run (status, item count, error)
//! - **Items**: normalized feed/statistics entries, one live row per `(source_id, url)`
//! - **Series**: indicator series resolutions, the resolved series dimension,
//!   and one fact row per series per run
//!
//! All values are bound as statement parameters; nothing user-supplied is
//! interpolated into SQL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dailybrief_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::new("output/db/app.duckdb"))?;
//!     if let Some(run) = warehouse.latest_run()? {
//!         println!("latest run {} is {}", run.run_id, run.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Timestamps
//!
//! Timestamp columns are `TIMESTAMP` (UTC, no zone). Rows exchange them as
//! strings in the `YYYY-MM-DD HH:MM:SS.ffffff` layout that DuckDB both casts
//! from and formats to with `%Y-%m-%d %H:%M:%S.%f`.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `runs` | One row per ingestion run |
//! | `sources` | Source descriptors snapshot per run |
//! | `source_runs` | Per-source outcome per run |
//! | `items` | Live items keyed by `(source_id, url)` |
//! | `alerts` | Reserved for alert rows |
//! | `dim_series_resolution` | Latest resolution attempt per series key |
//! | `dim_indicator_series` | Series keys that resolved to an id |
//! | `fact_indicator_series_run` | Resolution outcome per series per run |

pub mod duckdb;
pub mod migrations;
pub mod views;

use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection, Row};
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Tables holding rows scoped to a run id, in deletion order.
const RUN_SCOPED_TABLES: &[&str] = &[
    "fact_indicator_series_run",
    "alerts",
    "items",
    "source_runs",
    "sources",
    "runs",
];

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A row failed validation before it reached the database.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            max_pool_size: 4,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("output").join("db").join("app.duckdb"))
    }
}

/// A run row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRow {
    pub run_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub status: String,
    pub run_mode: String,
    pub params_json: String,
    pub item_count: i64,
    pub source_count: i64,
}

/// A source descriptor as configured for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub run_id: String,
    pub source_id: String,
    pub source_name: String,
    pub category: String,
    pub kind: String,
    pub enabled: bool,
}

/// Outcome of one source within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRunRow {
    pub run_id: String,
    pub source_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub status: String,
    pub item_count: i64,
    pub error_class: Option<String>,
    pub error_message: Option<String>,
    pub http_status: Option<i32>,
}

/// A live item row, keyed by `(source_id, url)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub source_id: String,
    pub url: String,
    pub run_id: String,
    pub source_name: String,
    pub category: String,
    pub kind: String,
    pub title: String,
    pub summary: String,
    pub published_at: Option<String>,
    pub fetched_at: String,
}

/// Item count for one source name within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCountRow {
    pub source_name: String,
    pub count: i64,
}

/// Latest resolution attempt for one series key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesResolutionRow {
    pub series_key: String,
    pub resolver_type: String,
    pub resolver_value: Option<String>,
    pub resolved_id: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub updated_at: String,
}

/// A series key that resolved to an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSeriesRow {
    pub series_key: String,
    pub resolved_id: String,
    pub resolver_type: Option<String>,
    pub resolver_value: Option<String>,
    pub message: Option<String>,
}

/// Resolution outcome of one series within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRunRow {
    pub run_id: String,
    pub series_key: String,
    pub resolved_id: Option<String>,
    pub status: String,
    pub message: Option<String>,
}

/// The main warehouse interface for run history storage.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse at the default location.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize database schema and views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Insert a new run row. Fails if the run id already exists.
    pub fn insert_run(&self, run: &RunRow) -> Result<(), WarehouseError> {
        validate_non_empty("run_id", &run.run_id)?;
        let connection = self.manager.acquire()?;
        connection.execute(
            "INSERT INTO runs \
             (run_id, started_at, ended_at, status, run_mode, params_json, item_count, source_count) \
             VALUES (?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?)",
            params![
                run.run_id,
                run.started_at,
                run.ended_at,
                run.status,
                run.run_mode,
                run.params_json,
                run.item_count,
                run.source_count,
            ],
        )?;
        Ok(())
    }

    /// Write the terminal state of a run (end time, status, counts).
    ///
    /// Returns `false` when no row exists for the run id.
    pub fn finish_run(&self, run: &RunRow) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        let updated = connection.execute(
            "UPDATE runs SET ended_at = CAST(? AS TIMESTAMP), status = ?, params_json = ?, \
             item_count = ?, source_count = ? \
             WHERE run_id = ?",
            params![
                run.ended_at,
                run.status,
                run.params_json,
                run.item_count,
                run.source_count,
                run.run_id,
            ],
        )?;
        Ok(updated > 0)
    }

    /// Check whether a run row exists.
    pub fn run_exists(&self, run_id: &str) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM runs WHERE run_id = ?",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete every row attributed to a run id across all run-scoped tables.
    ///
    /// Returns the total number of deleted rows.
    pub fn delete_run(&self, run_id: &str) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut deleted = 0;
            for table in RUN_SCOPED_TABLES {
                // Table names come from the fixed list above.
                let sql = format!("DELETE FROM {table} WHERE run_id = ?");
                deleted += connection.execute(sql.as_str(), params![run_id])?;
            }
            Ok(deleted)
        })();

        let deleted = finalize_transaction(&connection, result)?;
        tracing::info!(run_id, deleted, "deleted existing run data");
        Ok(deleted)
    }

    /// Write the source descriptor snapshot of a run, replacing rows with the same
    /// `(run_id, source_id)`.
    pub fn replace_sources(&self, rows: &[SourceRow]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                connection.execute(
                    "INSERT OR REPLACE INTO sources \
                     (run_id, source_id, source_name, category, kind, enabled) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        row.run_id,
                        row.source_id,
                        row.source_name,
                        row.category,
                        row.kind,
                        row.enabled,
                    ],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Insert or replace per-source outcomes keyed by `(run_id, source_id)`.
    pub fn upsert_source_runs(&self, rows: &[SourceRunRow]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                connection.execute(
                    "INSERT OR REPLACE INTO source_runs \
                     (run_id, source_id, started_at, ended_at, status, item_count, \
                      error_class, error_message, http_status) \
                     VALUES (?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?)",
                    params![
                        row.run_id,
                        row.source_id,
                        row.started_at,
                        row.ended_at,
                        row.status,
                        row.item_count,
                        row.error_class,
                        row.error_message,
                        row.http_status,
                    ],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Upsert items by `(source_id, url)`: a later write replaces content and
    /// provenance of the existing row instead of adding a second one.
    ///
    /// Returns the number of rows written.
    pub fn upsert_items(&self, rows: &[ItemRow]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut written = 0;
            for row in rows {
                validate_non_empty("source_id", &row.source_id)?;
                written += connection.execute(
                    "INSERT OR REPLACE INTO items \
                     (source_id, url, run_id, source_name, category, kind, title, summary, \
                      published_at, fetched_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
                    params![
                        row.source_id,
                        row.url,
                        row.run_id,
                        row.source_name,
                        row.category,
                        row.kind,
                        row.title,
                        row.summary,
                        row.published_at,
                        row.fetched_at,
                    ],
                )?;
            }
            Ok(written)
        })();

        finalize_transaction(&connection, result)
    }

    /// Replace the resolution row of each series key.
    pub fn upsert_series_resolutions(
        &self,
        rows: &[SeriesResolutionRow],
    ) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                validate_non_empty("series_key", &row.series_key)?;
                connection.execute(
                    "INSERT OR REPLACE INTO dim_series_resolution \
                     (series_key, resolver_type, resolver_value, resolved_id, status, message, \
                      updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
                    params![
                        row.series_key,
                        row.resolver_type,
                        row.resolver_value,
                        row.resolved_id,
                        row.status,
                        row.message,
                        row.updated_at,
                    ],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Insert or update resolved series keyed by `series_key`.
    pub fn upsert_indicator_series(
        &self,
        rows: &[IndicatorSeriesRow],
    ) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                validate_non_empty("series_key", &row.series_key)?;
                connection.execute(
                    "INSERT OR REPLACE INTO dim_indicator_series \
                     (series_key, resolved_id, resolver_type, resolver_value, message) \
                     VALUES (?, ?, ?, ?, ?)",
                    params![
                        row.series_key,
                        row.resolved_id,
                        row.resolver_type,
                        row.resolver_value,
                        row.message,
                    ],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Insert or replace per-run series outcomes keyed by `(run_id, series_key)`.
    pub fn upsert_series_runs(&self, rows: &[SeriesRunRow]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                validate_non_empty("run_id", &row.run_id)?;
                validate_non_empty("series_key", &row.series_key)?;
                connection.execute(
                    "INSERT OR REPLACE INTO fact_indicator_series_run \
                     (run_id, series_key, resolved_id, status, message) \
                     VALUES (?, ?, ?, ?, ?)",
                    params![
                        row.run_id,
                        row.series_key,
                        row.resolved_id,
                        row.status,
                        row.message,
                    ],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Every stored resolution, ordered by series key.
    pub fn series_resolutions(&self) -> Result<Vec<SeriesResolutionRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT series_key, resolver_type, resolver_value, resolved_id, status, message, \
                    strftime(updated_at, '%Y-%m-%d %H:%M:%S.%f') \
             FROM dim_series_resolution \
             ORDER BY series_key",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(SeriesResolutionRow {
                series_key: row.get(0)?,
                resolver_type: row.get(1)?,
                resolver_value: row.get(2)?,
                resolved_id: row.get(3)?,
                status: row.get(4)?,
                message: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Resolved series, ordered by series key.
    pub fn indicator_series(&self) -> Result<Vec<IndicatorSeriesRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT series_key, resolved_id, resolver_type, resolver_value, message \
             FROM dim_indicator_series \
             ORDER BY series_key",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(IndicatorSeriesRow {
                series_key: row.get(0)?,
                resolved_id: row.get(1)?,
                resolver_type: row.get(2)?,
                resolver_value: row.get(3)?,
                message: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Series outcomes recorded for a run, ordered by series key.
    pub fn series_runs_for_run(&self, run_id: &str) -> Result<Vec<SeriesRunRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT run_id, series_key, resolved_id, status, message \
             FROM fact_indicator_series_run \
             WHERE run_id = ? \
             ORDER BY series_key",
        )?;
        let rows = statement.query_map(params![run_id], |row| {
            Ok(SeriesRunRow {
                run_id: row.get(0)?,
                series_key: row.get(1)?,
                resolved_id: row.get(2)?,
                status: row.get(3)?,
                message: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Fetch one run row by id.
    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRow>, WarehouseError> {
        self.query_single_run(
            "SELECT run_id, strftime(started_at, '%Y-%m-%d %H:%M:%S.%f'), \
             strftime(ended_at, '%Y-%m-%d %H:%M:%S.%f'), status, run_mode, params_json, \
             item_count, source_count \
             FROM runs WHERE run_id = ?",
            Some(run_id),
        )
    }

    /// Most recent run that produced data (`success` or `partial`).
    pub fn latest_run(&self) -> Result<Option<RunRow>, WarehouseError> {
        self.query_single_run(
            "SELECT run_id, strftime(started_at, '%Y-%m-%d %H:%M:%S.%f'), \
             strftime(ended_at, '%Y-%m-%d %H:%M:%S.%f'), status, run_mode, params_json, \
             item_count, source_count \
             FROM runs WHERE status IN ('success', 'partial') \
             ORDER BY started_at DESC LIMIT 1",
            None,
        )
    }

    /// Most recent fully successful run.
    pub fn latest_success_run(&self) -> Result<Option<RunRow>, WarehouseError> {
        self.query_single_run(
            "SELECT run_id, strftime(started_at, '%Y-%m-%d %H:%M:%S.%f'), \
             strftime(ended_at, '%Y-%m-%d %H:%M:%S.%f'), status, run_mode, params_json, \
             item_count, source_count \
             FROM runs WHERE status = 'success' \
             ORDER BY started_at DESC LIMIT 1",
            None,
        )
    }

    /// All run ids, oldest first.
    pub fn run_ids(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement =
            connection.prepare("SELECT run_id FROM runs ORDER BY started_at, run_id")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Source outcomes belonging to the last `lookback_runs` runs (by run
    /// start time, newest first), ordered by source and then newest first.
    pub fn last_n_source_runs(
        &self,
        lookback_runs: usize,
    ) -> Result<Vec<SourceRunRow>, WarehouseError> {
        let limit = i64::try_from(lookback_runs).unwrap_or(i64::MAX);
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "WITH last_runs AS ( \
                 SELECT run_id, started_at AS run_started_at \
                 FROM runs \
                 WHERE started_at IS NOT NULL \
                 ORDER BY started_at DESC \
                 LIMIT ? \
             ) \
             SELECT sr.run_id, sr.source_id, \
                    strftime(sr.started_at, '%Y-%m-%d %H:%M:%S.%f'), \
                    strftime(sr.ended_at, '%Y-%m-%d %H:%M:%S.%f'), \
                    sr.status, sr.item_count, sr.error_class, sr.error_message, sr.http_status \
             FROM source_runs AS sr \
             JOIN last_runs AS lr ON sr.run_id = lr.run_id \
             ORDER BY sr.source_id, sr.started_at DESC, lr.run_started_at DESC",
        )?;
        let rows = statement.query_map(params![limit], read_source_run_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Items whose provenance is the given run, newest published first.
    pub fn items_for_run(
        &self,
        run_id: &str,
        limit: usize,
    ) -> Result<Vec<ItemRow>, WarehouseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT source_id, url, run_id, source_name, category, kind, title, summary, \
                    strftime(published_at, '%Y-%m-%d %H:%M:%S.%f'), \
                    strftime(fetched_at, '%Y-%m-%d %H:%M:%S.%f') \
             FROM items \
             WHERE run_id = ? \
             ORDER BY published_at DESC NULLS LAST, fetched_at DESC, source_id, url \
             LIMIT ?",
        )?;
        let rows = statement.query_map(params![run_id, limit], read_item_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Item counts per source name for one run, largest first.
    pub fn item_counts_by_source(&self, run_id: &str) -> Result<Vec<ItemCountRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT source_name, item_count FROM vw_item_counts \
             WHERE run_id = ? \
             ORDER BY item_count DESC, source_name",
        )?;
        let rows = statement.query_map(params![run_id], |row| {
            Ok(ItemCountRow {
                source_name: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// `(source_id, source_name)` pairs recorded for a run.
    pub fn source_names_for_run(
        &self,
        run_id: &str,
    ) -> Result<Vec<(String, String)>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT source_id, source_name FROM sources WHERE run_id = ? ORDER BY source_id",
        )?;
        let rows = statement.query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Total number of live item rows.
    pub fn count_items(&self) -> Result<u64, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn query_single_run(
        &self,
        sql: &str,
        run_id: Option<&str>,
    ) -> Result<Option<RunRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(sql)?;
        let mut rows = match run_id {
            Some(run_id) => statement.query(params![run_id])?,
            None => statement.query([])?,
        };
        match rows.next()? {
            Some(row) => Ok(Some(read_run_row(row)?)),
            None => Ok(None),
        }
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn validate_non_empty(field: &str, value: &str) -> Result<(), WarehouseError> {
    if value.trim().is_empty() {
        return Err(WarehouseError::InvalidRecord(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn read_run_row(row: &Row<'_>) -> Result<RunRow, ::duckdb::Error> {
    Ok(RunRow {
        run_id: row.get(0)?,
        started_at: row.get(1)?,
        ended_at: row.get(2)?,
        status: row.get(3)?,
        run_mode: row.get(4)?,
        params_json: row.get(5)?,
        item_count: row.get(6)?,
        source_count: row.get(7)?,
    })
}

fn read_source_run_row(row: &Row<'_>) -> Result<SourceRunRow, ::duckdb::Error> {
    Ok(SourceRunRow {
        run_id: row.get(0)?,
        source_id: row.get(1)?,
        started_at: row.get(2)?,
        ended_at: row.get(3)?,
        status: row.get(4)?,
        item_count: row.get(5)?,
        error_class: row.get(6)?,
        error_message: row.get(7)?,
        http_status: row.get(8)?,
    })
}

fn read_item_row(row: &Row<'_>) -> Result<ItemRow, ::duckdb::Error> {
    Ok(ItemRow {
        source_id: row.get(0)?,
        url: row.get(1)?,
        run_id: row.get(2)?,
        source_name: row.get(3)?,
        category: row.get(4)?,
        kind: row.get(5)?,
        title: row.get(6)?,
        summary: row.get(7)?,
        published_at: row.get(8)?,
        fetched_at: row.get(9)?,
    })
}
