//! Run orchestration: lock, allocate, fetch and parse each source, persist,
//! resolve indicator series, export.
//!
//! Sources are processed strictly in sequence. A failing source is recorded
//! and the loop moves on; only lock, storage, and export errors end a run
//! early, and those mark an already created run as `failed` before
//! propagating.

use std::collections::HashSet;
use std::path::PathBuf;
use std::slice;

use serde::Serialize;
use serde_json::json;
use tracing::Instrument;

use crate::config::{Settings, SourcesConfig};
use crate::export::{write_run_export, RunStats, SourceOutcome};
use crate::fetch::Fetcher;
use crate::lock::{RunLock, RunLockGuard};
use crate::parsers;
use crate::run_id::RunIdAllocator;
use crate::series::{resolve_series, SeriesConfig};
use crate::store::RunStore;
use crate::{
    Item, PipelineError, Run, RunMode, RunStatus, SourceDescriptor, SourceFailure,
    SourceRunRecord, SourceRunStatus, UtcDateTime,
};

/// What the caller asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub mode: RunMode,
    pub run_id: Option<String>,
    pub overwrite: bool,
}

impl RunRequest {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            run_id: None,
            overwrite: false,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub stats: RunStats,
    pub export_dir: PathBuf,
}

impl RunReport {
    pub fn run_id(&self) -> &str {
        &self.stats.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.stats.status
    }

    pub fn outcome(&self, source_id: &str) -> Option<&SourceOutcome> {
        self.stats.sources.get(source_id)
    }
}

/// Drives one run against injected collaborators.
pub struct Orchestrator<'a, S: RunStore + ?Sized> {
    settings: &'a Settings,
    store: &'a S,
    fetcher: &'a dyn Fetcher,
    lock: &'a dyn RunLock,
    allocator: RunIdAllocator,
    series: Option<&'a SeriesConfig>,
}

impl<'a, S: RunStore + ?Sized> Orchestrator<'a, S> {
    pub fn new(
        settings: &'a Settings,
        store: &'a S,
        fetcher: &'a dyn Fetcher,
        lock: &'a dyn RunLock,
    ) -> Self {
        Self {
            settings,
            store,
            fetcher,
            lock,
            allocator: RunIdAllocator::from_settings(settings),
            series: None,
        }
    }

    /// Resolve `series` on every run and record one fact row per key.
    pub fn with_series(mut self, series: &'a SeriesConfig) -> Self {
        self.series = Some(series);
        self
    }

    pub fn with_allocator(mut self, allocator: RunIdAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Execute one run. Per-source failures show up in the report, never as
    /// an error.
    pub async fn run(
        &self,
        sources: &SourcesConfig,
        request: RunRequest,
    ) -> Result<RunReport, PipelineError> {
        // Held until return, on success and failure alike.
        let _guard = RunLockGuard::acquire(self.lock)?;

        let run_id = self.allocator.allocate(
            self.store,
            request.run_id.as_deref(),
            request.overwrite,
        );
        let params = json!({
            "requested_run_id": request.run_id,
            "overwrite": request.overwrite,
            "configured_sources": sources.sources.len(),
            "configured_series": self.series.map_or(0, |series| series.series.len()),
        });
        let mut run = Run::start(run_id, request.mode, params);
        self.store.insert_run(&run)?;
        tracing::info!(run_id = %run.run_id, mode = %run.mode, "run started");

        let span = tracing::info_span!("run", run_id = %run.run_id, mode = %run.mode);
        let result = self.execute(&mut run, sources).instrument(span).await;
        if let Err(error) = &result {
            self.mark_failed(&mut run, error);
        }
        result
    }

    async fn execute(
        &self,
        run: &mut Run,
        sources: &SourcesConfig,
    ) -> Result<RunReport, PipelineError> {
        let allowed_prefixes = sources.allowed_prefixes();
        let mut records = Vec::with_capacity(sources.sources.len());

        for source in sources.sources.iter().filter(|source| !source.enabled) {
            let record = SourceRunRecord::disabled(&run.run_id, &source.id, UtcDateTime::now());
            self.store.upsert_source_runs(slice::from_ref(&record))?;
            tracing::debug!(source_id = %source.id, "source disabled");
            records.push(record);
        }

        let mut enabled_sources = 0_u64;
        let mut collected = Vec::new();
        for source in sources.enabled() {
            enabled_sources += 1;
            let span = tracing::info_span!("source", source_id = %source.id, kind = source.kind_name());
            let (record, items) = self
                .process_source(&run.run_id, source, &allowed_prefixes)
                .instrument(span)
                .await;
            self.store.upsert_source_runs(slice::from_ref(&record))?;
            records.push(record);
            collected.extend(items);
        }

        let items = dedupe_items(collected);
        let status = aggregate_status(enabled_sources, &records);
        if enabled_sources == 0 {
            tracing::warn!("no enabled sources, run is failed");
        }

        self.store.replace_sources(&run.run_id, &sources.sources)?;
        let written = self.store.upsert_items(&run.run_id, &items)?;
        self.record_series(&run.run_id)?;
        run.finish(status, items.len() as u64, enabled_sources);
        self.store.finish_run(run)?;
        tracing::info!(status = %status, item_count = written, enabled_sources, "run persisted");

        let export_dir = write_run_export(&self.settings.output_root, run, &items, &records)?;
        Ok(RunReport {
            stats: RunStats::new(run, &records),
            export_dir,
        })
    }

    async fn process_source(
        &self,
        run_id: &str,
        source: &SourceDescriptor,
        allowed_prefixes: &[String],
    ) -> (SourceRunRecord, Vec<Item>) {
        let started_at = UtcDateTime::now();
        match self.fetch_and_parse(source, allowed_prefixes).await {
            Ok(mut items) => {
                for item in &mut items {
                    item.run_id = Some(run_id.to_owned());
                }
                let record = SourceRunRecord::success(
                    run_id,
                    &source.id,
                    started_at,
                    UtcDateTime::now(),
                    items.len() as u64,
                );
                tracing::info!(item_count = items.len(), "source succeeded");
                (record, items)
            }
            Err(failure) => {
                tracing::warn!(error_class = failure.error_class(), error = %failure, "source failed");
                let record =
                    SourceRunRecord::failed(run_id, &source.id, started_at, UtcDateTime::now(), &failure);
                (record, Vec::new())
            }
        }
    }

    async fn fetch_and_parse(
        &self,
        source: &SourceDescriptor,
        allowed_prefixes: &[String],
    ) -> Result<Vec<Item>, SourceFailure> {
        let url = parsers::request_url(source);
        let payload = self.fetcher.fetch(&url, allowed_prefixes).await?;
        Ok(parsers::parse_payload(&payload, source, UtcDateTime::now())?)
    }

    fn record_series(&self, run_id: &str) -> Result<(), PipelineError> {
        let Some(series) = self.series.filter(|series| !series.is_empty()) else {
            return Ok(());
        };
        let resolutions = resolve_series(series);
        for resolution in resolutions.iter().filter(|resolution| !resolution.is_resolved()) {
            tracing::warn!(
                series_key = %resolution.series_key,
                message = resolution.message.as_deref().unwrap_or_default(),
                "series unresolved"
            );
        }
        self.store.record_series(run_id, &resolutions)?;
        tracing::info!(
            series = resolutions.len(),
            resolved = resolutions.iter().filter(|r| r.is_resolved()).count(),
            "series recorded"
        );
        Ok(())
    }

    fn mark_failed(&self, run: &mut Run, error: &PipelineError) {
        tracing::error!(run_id = %run.run_id, %error, "run aborted");
        run.finish(RunStatus::Failed, run.item_count, run.source_count);
        if let Err(store_error) = self.store.finish_run(run) {
            tracing::warn!(run_id = %run.run_id, error = %store_error, "could not mark run failed");
        }
    }
}

/// `failed` with no enabled sources, `partial` when any source failed,
/// otherwise `success`.
pub fn aggregate_status(enabled_sources: u64, records: &[SourceRunRecord]) -> RunStatus {
    if enabled_sources == 0 {
        RunStatus::Failed
    } else if records
        .iter()
        .any(|record| record.status == SourceRunStatus::Failed)
    {
        RunStatus::Partial
    } else {
        RunStatus::Success
    }
}

/// Drop repeated `(source_id, url)` keys; the first occurrence wins.
pub fn dedupe_items(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.source_id.clone(), item.url.clone())))
        .collect()
}
