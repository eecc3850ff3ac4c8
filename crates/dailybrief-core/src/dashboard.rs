//! Read model behind the monitoring view: current run, its items, and
//! source health.

use serde::Serialize;

use crate::health::{health, SourceHealth};
use crate::store::{RunStore, SourceItemCount};
use crate::{Item, Run, StoreError};

pub const DEFAULT_ITEM_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Latest `success` or `partial` run.
    pub run: Option<Run>,
    pub items: Vec<Item>,
    pub item_counts: Vec<SourceItemCount>,
    pub health: Vec<SourceHealth>,
    pub total_items: u64,
}

impl DashboardView {
    pub fn empty() -> Self {
        Self {
            run: None,
            items: Vec::new(),
            item_counts: Vec::new(),
            health: Vec::new(),
            total_items: 0,
        }
    }

    pub fn load<S: RunStore + ?Sized>(
        store: &S,
        lookback_runs: usize,
        item_limit: usize,
    ) -> Result<Self, StoreError> {
        let Some(run) = store.latest_run()? else {
            tracing::debug!("no completed run yet, dashboard is empty");
            return Ok(Self::empty());
        };

        Ok(Self {
            items: store.query_items_for_run(&run.run_id, item_limit)?,
            item_counts: store.item_counts_by_source(&run.run_id)?,
            health: health(store, &run.run_id, lookback_runs)?,
            total_items: store.count_items()?,
            run: Some(run),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.run.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{open_warehouse, RunCatalog};
    use crate::{RunMode, RunStatus, SourceDescriptor, SourceRunRecord, UtcDateTime};
    use dailybrief_warehouse::WarehouseConfig;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn empty_store_gives_empty_view() {
        let temp = tempdir().expect("tempdir");
        let warehouse =
            open_warehouse(WarehouseConfig::new(temp.path().join("app.duckdb"))).expect("open");
        let store: &dyn RunStore = &warehouse;

        let view = DashboardView::load(store, 20, DEFAULT_ITEM_LIMIT).expect("load");
        assert!(view.is_empty());
        assert_eq!(view.total_items, 0);
    }

    #[test]
    fn view_reflects_latest_completed_run() {
        let temp = tempdir().expect("tempdir");
        let warehouse =
            open_warehouse(WarehouseConfig::new(temp.path().join("app.duckdb"))).expect("open");
        let store: &dyn RunStore = &warehouse;
        let source = SourceDescriptor::feed("news", "Morning News", "https://news.test/rss");
        let now = UtcDateTime::now();

        let mut run = Run::start("run-1", RunMode::Manual, json!({}));
        store.insert_run(&run).expect("insert run");
        store
            .upsert_source_runs(&[SourceRunRecord::success("run-1", "news", now, now, 2)])
            .expect("source runs");
        store
            .replace_sources("run-1", std::slice::from_ref(&source))
            .expect("sources");
        let items: Vec<Item> = (1..=2)
            .map(|n| {
                Item::from_source(
                    &source,
                    format!("story {n}"),
                    String::new(),
                    format!("https://news.test/{n}"),
                    now,
                    now,
                )
            })
            .collect();
        store.upsert_items("run-1", &items).expect("items");
        run.finish(RunStatus::Success, 2, 1);
        store.finish_run(&run).expect("finish");

        let view = DashboardView::load(store, 20, 1).expect("load");
        assert_eq!(view.run.as_ref().map(|run| run.run_id.as_str()), Some("run-1"));
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total_items, 2);
        assert_eq!(view.item_counts[0].source_name, "Morning News");
        assert_eq!(view.item_counts[0].count, 2);
        assert_eq!(view.health[0].source_name, "Morning News");
        assert!(store.run_exists("run-1").expect("exists"));
    }
}
