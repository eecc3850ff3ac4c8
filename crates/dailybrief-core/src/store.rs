//! The narrow record/read interface the orchestrator and health engine use,
//! and its DuckDB implementation on [`Warehouse`].

use std::collections::HashMap;

use dailybrief_warehouse::{
    IndicatorSeriesRow, ItemRow, RunRow, SeriesResolutionRow, SeriesRunRow, SourceRow,
    SourceRunRow, Warehouse, WarehouseError,
};
use serde::Serialize;

use crate::series::SeriesResolution;
use crate::{
    Item, Run, RunMode, RunStatus, SourceDescriptor, SourceRunRecord, SourceRunStatus,
    StoreError, UtcDateTime,
};

/// Run-id bookkeeping needed by the run identity allocator.
pub trait RunCatalog {
    fn run_exists(&self, run_id: &str) -> Result<bool, StoreError>;

    /// Delete every persisted row attributed to `run_id`.
    fn delete_run(&self, run_id: &str) -> Result<usize, StoreError>;
}

/// Item count for one source name within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceItemCount {
    pub source_name: String,
    pub count: u64,
}

/// Record and read operations over run history.
pub trait RunStore: RunCatalog {
    fn insert_run(&self, run: &Run) -> Result<(), StoreError>;

    /// Persist the terminal state of `run`.
    fn finish_run(&self, run: &Run) -> Result<(), StoreError>;

    fn replace_sources(&self, run_id: &str, sources: &[SourceDescriptor])
        -> Result<(), StoreError>;

    fn upsert_source_runs(&self, records: &[SourceRunRecord]) -> Result<(), StoreError>;

    /// Upsert by `(source_id, url)`, stamping `run_id` as provenance.
    fn upsert_items(&self, run_id: &str, items: &[Item]) -> Result<usize, StoreError>;

    /// Record this run's series resolutions: the latest resolution per key,
    /// the resolved keys, and one fact row per key scoped to `run_id`.
    fn record_series(
        &self,
        run_id: &str,
        resolutions: &[SeriesResolution],
    ) -> Result<(), StoreError>;

    fn get_run(&self, run_id: &str) -> Result<Option<Run>, StoreError>;

    /// Most recent run with status `success` or `partial`.
    fn latest_run(&self) -> Result<Option<Run>, StoreError>;

    fn latest_success_run(&self) -> Result<Option<Run>, StoreError>;

    /// Source-run records of the last `lookback_runs` runs by start time.
    fn query_last_n_source_runs(
        &self,
        lookback_runs: usize,
    ) -> Result<Vec<SourceRunRecord>, StoreError>;

    fn query_items_for_run(&self, run_id: &str, limit: usize) -> Result<Vec<Item>, StoreError>;

    fn item_counts_by_source(&self, run_id: &str) -> Result<Vec<SourceItemCount>, StoreError>;

    /// `source_id -> source_name` as configured for `run_id`.
    fn source_names_for_run(&self, run_id: &str) -> Result<HashMap<String, String>, StoreError>;

    fn count_items(&self) -> Result<u64, StoreError>;
}

impl RunCatalog for Warehouse {
    fn run_exists(&self, run_id: &str) -> Result<bool, StoreError> {
        Ok(Warehouse::run_exists(self, run_id)?)
    }

    fn delete_run(&self, run_id: &str) -> Result<usize, StoreError> {
        Ok(Warehouse::delete_run(self, run_id)?)
    }
}

impl RunStore for Warehouse {
    fn insert_run(&self, run: &Run) -> Result<(), StoreError> {
        Ok(Warehouse::insert_run(self, &run_row(run)?)?)
    }

    fn finish_run(&self, run: &Run) -> Result<(), StoreError> {
        if Warehouse::finish_run(self, &run_row(run)?)? {
            Ok(())
        } else {
            Err(StoreError::Corrupt(format!(
                "run '{}' vanished before it could be finished",
                run.run_id
            )))
        }
    }

    fn replace_sources(
        &self,
        run_id: &str,
        sources: &[SourceDescriptor],
    ) -> Result<(), StoreError> {
        let rows: Vec<SourceRow> = sources
            .iter()
            .map(|source| SourceRow {
                run_id: run_id.to_owned(),
                source_id: source.id.clone(),
                source_name: source.name.clone(),
                category: source.category.clone(),
                kind: source.kind_name().to_owned(),
                enabled: source.enabled,
            })
            .collect();
        Ok(Warehouse::replace_sources(self, &rows)?)
    }

    fn upsert_source_runs(&self, records: &[SourceRunRecord]) -> Result<(), StoreError> {
        let rows: Vec<SourceRunRow> = records
            .iter()
            .map(|record| SourceRunRow {
                run_id: record.run_id.clone(),
                source_id: record.source_id.clone(),
                started_at: record.started_at.format_storage(),
                ended_at: record.ended_at.map(UtcDateTime::format_storage),
                status: record.status.as_str().to_owned(),
                item_count: to_i64(record.item_count),
                error_class: record.error_class.clone(),
                error_message: record.error_message.clone(),
                http_status: record.http_status.map(i32::from),
            })
            .collect();
        Ok(Warehouse::upsert_source_runs(self, &rows)?)
    }

    fn upsert_items(&self, run_id: &str, items: &[Item]) -> Result<usize, StoreError> {
        let rows: Vec<ItemRow> = items
            .iter()
            .map(|item| ItemRow {
                source_id: item.source_id.clone(),
                url: item.url.clone(),
                run_id: run_id.to_owned(),
                source_name: item.source_name.clone(),
                category: item.category.clone(),
                kind: item.kind.clone(),
                title: item.title.clone(),
                summary: item.summary.clone(),
                published_at: Some(item.published_at.format_storage()),
                fetched_at: item.fetched_at.format_storage(),
            })
            .collect();
        Ok(Warehouse::upsert_items(self, &rows)?)
    }

    fn record_series(
        &self,
        run_id: &str,
        resolutions: &[SeriesResolution],
    ) -> Result<(), StoreError> {
        let updated_at = UtcDateTime::now().format_storage();
        let resolution_rows: Vec<SeriesResolutionRow> = resolutions
            .iter()
            .map(|resolution| SeriesResolutionRow {
                series_key: resolution.series_key.clone(),
                resolver_type: resolution.resolver_type.clone(),
                resolver_value: resolution.resolver_value.clone(),
                resolved_id: resolution.resolved_id.clone(),
                status: resolution.status.as_str().to_owned(),
                message: resolution.message.clone(),
                updated_at: updated_at.clone(),
            })
            .collect();
        let indicator_rows: Vec<IndicatorSeriesRow> = resolutions
            .iter()
            .filter_map(|resolution| {
                Some(IndicatorSeriesRow {
                    series_key: resolution.series_key.clone(),
                    resolved_id: resolution.resolved_id.clone()?,
                    resolver_type: Some(resolution.resolver_type.clone()),
                    resolver_value: resolution.resolver_value.clone(),
                    message: resolution.message.clone(),
                })
            })
            .collect();
        let fact_rows: Vec<SeriesRunRow> = resolutions
            .iter()
            .map(|resolution| SeriesRunRow {
                run_id: run_id.to_owned(),
                series_key: resolution.series_key.clone(),
                resolved_id: resolution.resolved_id.clone(),
                status: resolution.status.as_str().to_owned(),
                message: resolution.message.clone(),
            })
            .collect();

        Warehouse::upsert_series_resolutions(self, &resolution_rows)?;
        Warehouse::upsert_indicator_series(self, &indicator_rows)?;
        Ok(Warehouse::upsert_series_runs(self, &fact_rows)?)
    }

    fn get_run(&self, run_id: &str) -> Result<Option<Run>, StoreError> {
        Warehouse::get_run(self, run_id)?.map(run_from_row).transpose()
    }

    fn latest_run(&self) -> Result<Option<Run>, StoreError> {
        Warehouse::latest_run(self)?.map(run_from_row).transpose()
    }

    fn latest_success_run(&self) -> Result<Option<Run>, StoreError> {
        Warehouse::latest_success_run(self)?
            .map(run_from_row)
            .transpose()
    }

    fn query_last_n_source_runs(
        &self,
        lookback_runs: usize,
    ) -> Result<Vec<SourceRunRecord>, StoreError> {
        Warehouse::last_n_source_runs(self, lookback_runs)?
            .into_iter()
            .map(source_run_from_row)
            .collect()
    }

    fn query_items_for_run(&self, run_id: &str, limit: usize) -> Result<Vec<Item>, StoreError> {
        Warehouse::items_for_run(self, run_id, limit)?
            .into_iter()
            .map(item_from_row)
            .collect()
    }

    fn item_counts_by_source(&self, run_id: &str) -> Result<Vec<SourceItemCount>, StoreError> {
        Ok(Warehouse::item_counts_by_source(self, run_id)?
            .into_iter()
            .map(|row| SourceItemCount {
                source_name: row.source_name,
                count: to_u64(row.count),
            })
            .collect())
    }

    fn source_names_for_run(&self, run_id: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(Warehouse::source_names_for_run(self, run_id)?
            .into_iter()
            .collect())
    }

    fn count_items(&self) -> Result<u64, StoreError> {
        Ok(Warehouse::count_items(self)?)
    }
}

/// Open the warehouse, mapping open failures to [`StoreError::Unavailable`].
pub fn open_warehouse(
    config: dailybrief_warehouse::WarehouseConfig,
) -> Result<Warehouse, StoreError> {
    let location = config.db_path.display().to_string();
    Warehouse::open(config).map_err(|error| match error {
        WarehouseError::InvalidRecord(_) => StoreError::Warehouse(error),
        other => StoreError::Unavailable(format!("{location}: {other}")),
    })
}

fn run_row(run: &Run) -> Result<RunRow, StoreError> {
    Ok(RunRow {
        run_id: run.run_id.clone(),
        started_at: run.started_at.format_storage(),
        ended_at: run.ended_at.map(UtcDateTime::format_storage),
        status: run.status.as_str().to_owned(),
        run_mode: run.mode.as_str().to_owned(),
        params_json: serde_json::to_string(&run.params)
            .map_err(|error| StoreError::Corrupt(error.to_string()))?,
        item_count: to_i64(run.item_count),
        source_count: to_i64(run.source_count),
    })
}

fn run_from_row(row: RunRow) -> Result<Run, StoreError> {
    Ok(Run {
        started_at: UtcDateTime::parse_storage(&row.started_at)?,
        ended_at: row
            .ended_at
            .as_deref()
            .map(UtcDateTime::parse_storage)
            .transpose()?,
        status: row.status.parse::<RunStatus>()?,
        mode: row.run_mode.parse::<RunMode>()?,
        params: serde_json::from_str(&row.params_json).map_err(|error| {
            StoreError::Corrupt(format!("params_json of run '{}': {error}", row.run_id))
        })?,
        item_count: to_u64(row.item_count),
        source_count: to_u64(row.source_count),
        run_id: row.run_id,
    })
}

fn source_run_from_row(row: SourceRunRow) -> Result<SourceRunRecord, StoreError> {
    Ok(SourceRunRecord {
        started_at: UtcDateTime::parse_storage(&row.started_at)?,
        ended_at: row
            .ended_at
            .as_deref()
            .map(UtcDateTime::parse_storage)
            .transpose()?,
        status: row.status.parse::<SourceRunStatus>()?,
        item_count: to_u64(row.item_count),
        http_status: row.http_status.and_then(|status| u16::try_from(status).ok()),
        run_id: row.run_id,
        source_id: row.source_id,
        error_class: row.error_class,
        error_message: row.error_message,
    })
}

fn item_from_row(row: ItemRow) -> Result<Item, StoreError> {
    let fetched_at = UtcDateTime::parse_storage(&row.fetched_at)?;
    let published_at = match row.published_at.as_deref() {
        Some(value) => UtcDateTime::parse_storage(value)?,
        None => fetched_at,
    };
    Ok(Item {
        source_id: row.source_id,
        source_name: row.source_name,
        category: row.category,
        kind: row.kind,
        title: row.title,
        summary: row.summary,
        url: row.url,
        published_at,
        fetched_at,
        run_id: Some(row.run_id),
    })
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dailybrief_warehouse::WarehouseConfig;
    use serde_json::json;
    use tempfile::tempdir;

    fn open(temp: &tempfile::TempDir) -> Warehouse {
        open_warehouse(WarehouseConfig::new(temp.path().join("app.duckdb"))).expect("open")
    }

    #[test]
    fn run_round_trips_through_warehouse() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open(&temp);
        let store: &dyn RunStore = &warehouse;

        let mut run = Run::start("run-20240601-070000", RunMode::Scheduled, json!({"overwrite": false}));
        store.insert_run(&run).expect("insert");
        run.finish(RunStatus::Partial, 4, 2);
        store.finish_run(&run).expect("finish");

        let stored = store.get_run(&run.run_id).expect("get").expect("present");
        assert_eq!(stored, run);
        assert_eq!(store.latest_run().expect("latest").map(|r| r.run_id), Some(run.run_id));
    }

    #[test]
    fn items_carry_provenance_of_last_writer() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open(&temp);
        let store: &dyn RunStore = &warehouse;
        let source = SourceDescriptor::feed("news", "News", "https://news.test/rss");
        let now = UtcDateTime::now();
        let item = Item::from_source(
            &source,
            String::from("Title"),
            String::new(),
            String::from("https://news.test/1"),
            now,
            now,
        );

        store.upsert_items("run-a", &[item.clone()]).expect("first");
        store.upsert_items("run-b", &[item]).expect("second");

        assert_eq!(store.count_items().expect("count"), 1);
        let items = store.query_items_for_run("run-b", 10).expect("items");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].run_id.as_deref(), Some("run-b"));
        assert_eq!(items[0].published_at, now);
        assert!(store.query_items_for_run("run-a", 10).expect("items").is_empty());
    }

    #[test]
    fn finishing_unknown_run_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open(&temp);
        let store: &dyn RunStore = &warehouse;
        let mut run = Run::start("ghost", RunMode::Manual, json!({}));
        run.finish(RunStatus::Failed, 0, 0);

        let err = store.finish_run(&run).expect_err("must fail");
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
