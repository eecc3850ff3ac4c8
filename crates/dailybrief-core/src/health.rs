//! Rolling per-source reliability metrics over recent run history.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::store::RunStore;
use crate::{SourceRunRecord, SourceRunStatus, StoreError, UtcDateTime};

pub const DEFAULT_LOOKBACK_RUNS: usize = 20;

/// Health summary of one source across the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceHealth {
    pub source_id: String,
    pub source_name: String,
    pub runs: u64,
    pub success_count: u64,
    /// Records whose status is anything but `success`, disabled included.
    pub fail_count: u64,
    /// Percentage in `0.0..=100.0`; `None` when there are no records.
    pub success_rate: Option<f64>,
    pub consecutive_failures: u64,
    pub avg_duration_seconds: Option<f64>,
    pub last_status: SourceRunStatus,
    pub last_ended_at: Option<UtcDateTime>,
    pub last_item_count: u64,
    pub last_http_status: Option<u16>,
    pub last_error_class: Option<String>,
    pub last_error_message: Option<String>,
    pub last_success_at: Option<UtcDateTime>,
    pub last_failure_at: Option<UtcDateTime>,
}

/// Health rows for every source with records in the last `lookback_runs`
/// runs, least healthy first. Names come from `latest_run_id`'s source list.
pub fn health<S: RunStore + ?Sized>(
    store: &S,
    latest_run_id: &str,
    lookback_runs: usize,
) -> Result<Vec<SourceHealth>, StoreError> {
    let records = store.query_last_n_source_runs(lookback_runs)?;
    let names = store.source_names_for_run(latest_run_id)?;
    let rows = compute_health(&records, &names);
    tracing::debug!(
        latest_run_id,
        lookback_runs,
        records = records.len(),
        sources = rows.len(),
        "computed source health"
    );
    Ok(rows)
}

/// Pure aggregation over source run records in any order.
pub fn compute_health(
    records: &[SourceRunRecord],
    source_names: &HashMap<String, String>,
) -> Vec<SourceHealth> {
    let mut by_source: BTreeMap<&str, Vec<&SourceRunRecord>> = BTreeMap::new();
    for record in records {
        by_source
            .entry(record.source_id.as_str())
            .or_default()
            .push(record);
    }

    let mut rows: Vec<SourceHealth> = by_source
        .into_iter()
        .filter_map(|(source_id, mut history)| {
            history.sort_by(|left, right| right.started_at.cmp(&left.started_at));
            summarize(source_id, &history, source_names)
        })
        .collect();

    rows.sort_by(|left, right| {
        right
            .consecutive_failures
            .cmp(&left.consecutive_failures)
            .then_with(|| right.fail_count.cmp(&left.fail_count))
            .then_with(|| left.source_id.cmp(&right.source_id))
    });
    rows
}

/// `history` must be ordered newest first.
fn summarize(
    source_id: &str,
    history: &[&SourceRunRecord],
    source_names: &HashMap<String, String>,
) -> Option<SourceHealth> {
    let latest = history.first()?;

    let runs = history.len() as u64;
    let success_count = history
        .iter()
        .filter(|record| is_success(record))
        .count() as u64;
    let fail_count = runs - success_count;

    let mut success_seen = false;
    let mut consecutive_failures = 0;
    for record in history {
        success_seen |= is_success(record);
        if !success_seen {
            consecutive_failures += 1;
        }
    }

    let durations: Vec<f64> = history
        .iter()
        .filter_map(|record| {
            record
                .ended_at
                .map(|ended_at| ended_at.seconds_since(record.started_at))
        })
        .collect();
    let avg_duration_seconds = if durations.is_empty() {
        None
    } else {
        Some(durations.iter().sum::<f64>() / durations.len() as f64)
    };

    let last_success_at = history
        .iter()
        .filter(|record| is_success(record))
        .filter_map(|record| record.ended_at)
        .max();
    let last_failure_at = history
        .iter()
        .filter(|record| !is_success(record))
        .filter_map(|record| record.ended_at)
        .max();

    Some(SourceHealth {
        source_id: source_id.to_owned(),
        source_name: source_names
            .get(source_id)
            .cloned()
            .unwrap_or_else(|| source_id.to_owned()),
        runs,
        success_count,
        fail_count,
        success_rate: Some(success_count as f64 * 100.0 / runs as f64),
        consecutive_failures,
        avg_duration_seconds,
        last_status: latest.status,
        last_ended_at: latest.ended_at,
        last_item_count: latest.item_count,
        last_http_status: latest.http_status,
        last_error_class: latest.error_class.clone(),
        last_error_message: latest.error_message.clone(),
        last_success_at,
        last_failure_at,
    })
}

fn is_success(record: &SourceRunRecord) -> bool {
    record.status == SourceRunStatus::Success
}
