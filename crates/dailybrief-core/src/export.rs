//! Flat per-run snapshot for downstream tooling:
//! `brief_items.csv`, `alerts.json` (reserved, always empty), `run_stats.json`.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{ExportError, Item, Run, SourceRunRecord, SourceRunStatus, UtcDateTime};

pub const ITEMS_FILE: &str = "brief_items.csv";
pub const ALERTS_FILE: &str = "alerts.json";
pub const STATS_FILE: &str = "run_stats.json";

#[derive(Debug, Serialize)]
struct ItemExportRow<'a> {
    source_id: &'a str,
    source_name: &'a str,
    category: &'a str,
    kind: &'a str,
    title: &'a str,
    summary: &'a str,
    url: &'a str,
    published_at: String,
}

/// Per-source entry of the stats summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub status: SourceRunStatus,
    pub count: u64,
    pub error: Option<String>,
}

/// Contents of `run_stats.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub run_id: String,
    pub status: crate::RunStatus,
    pub mode: crate::RunMode,
    pub started_at: UtcDateTime,
    pub finished_at: Option<UtcDateTime>,
    pub item_count: u64,
    /// Number of enabled sources.
    pub source_count: u64,
    pub sources: BTreeMap<String, SourceOutcome>,
}

impl RunStats {
    pub fn new(run: &Run, records: &[SourceRunRecord]) -> Self {
        let sources = records
            .iter()
            .map(|record| {
                (
                    record.source_id.clone(),
                    SourceOutcome {
                        status: record.status,
                        count: record.item_count,
                        error: record.error_message.clone(),
                    },
                )
            })
            .collect();
        Self {
            run_id: run.run_id.clone(),
            status: run.status,
            mode: run.mode,
            started_at: run.started_at,
            finished_at: run.ended_at,
            item_count: run.item_count,
            source_count: run.source_count,
            sources,
        }
    }
}

/// Write the snapshot for `run` under `output_root/<run_id>` and return
/// that directory. Existing files for the same run id are replaced.
pub fn write_run_export(
    output_root: &Path,
    run: &Run,
    items: &[Item],
    records: &[SourceRunRecord],
) -> Result<PathBuf, ExportError> {
    let dir = output_root.join(&run.run_id);
    fs::create_dir_all(&dir)?;

    let mut writer = csv::Writer::from_path(dir.join(ITEMS_FILE))?;
    for item in items {
        writer.serialize(ItemExportRow {
            source_id: &item.source_id,
            source_name: &item.source_name,
            category: &item.category,
            kind: &item.kind,
            title: &item.title,
            summary: &item.summary,
            url: &item.url,
            published_at: item.published_at.format_rfc3339(),
        })?;
    }
    if items.is_empty() {
        writer.write_record([
            "source_id",
            "source_name",
            "category",
            "kind",
            "title",
            "summary",
            "url",
            "published_at",
        ])?;
    }
    writer.flush()?;

    let alerts: [serde_json::Value; 0] = [];
    write_json(&dir.join(ALERTS_FILE), &alerts)?;
    write_json(&dir.join(STATS_FILE), &RunStats::new(run, records))?;

    tracing::info!(run_id = %run.run_id, dir = %dir.display(), items = items.len(), "run exported");
    Ok(dir)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
