use std::path::Path;

use dailybrief_core::{
    load_sources, open_warehouse, FetchClient, FileRunLock, Orchestrator, RunRequest, RunStatus,
    SeriesConfig, Settings,
};

use crate::cli::RunArgs;
use crate::error::CliError;

use super::CommandResult;

/// Exit code for a run that completed with `failed` status.
const FAILED_RUN_EXIT_CODE: u8 = 3;

pub async fn run(
    args: &RunArgs,
    config_dir: &Path,
    settings: &Settings,
) -> Result<CommandResult, CliError> {
    let sources = load_sources(config_dir)?;
    let series = SeriesConfig::load(config_dir)?;
    let warehouse = open_warehouse(settings.warehouse_config())?;
    let fetcher = FetchClient::from_settings(&settings.fetch)?;
    let lock = FileRunLock::new(&settings.lock_path, settings.lock_stale_after());

    let mut request = RunRequest::new(args.mode.into()).with_overwrite(args.overwrite);
    if let Some(run_id) = &args.run_id {
        request = request.with_run_id(run_id.clone());
    }

    let report = Orchestrator::new(settings, &warehouse, &fetcher, &lock)
        .with_series(&series)
        .run(&sources, request)
        .await?;
    tracing::info!(
        run_id = report.run_id(),
        status = %report.status(),
        item_count = report.stats.item_count,
        export_dir = %report.export_dir.display(),
        "run finished"
    );

    let result = CommandResult::ok(serde_json::to_value(&report)?);
    if report.status() == RunStatus::Failed {
        Ok(result.with_exit_code(FAILED_RUN_EXIT_CODE))
    } else {
        Ok(result)
    }
}
