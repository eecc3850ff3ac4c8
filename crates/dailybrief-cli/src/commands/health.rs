use dailybrief_core::{health, open_warehouse, RunStore, Settings};
use serde_json::json;

use crate::cli::HealthArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &HealthArgs, settings: &Settings) -> Result<CommandResult, CliError> {
    let lookback = args.lookback.unwrap_or(settings.lookback_runs).max(1);
    let warehouse = open_warehouse(settings.warehouse_config())?;
    let store: &dyn RunStore = &warehouse;

    let Some(latest) = store.latest_run()? else {
        tracing::info!("no completed run yet");
        return Ok(CommandResult::ok(json!({
            "run_id": null,
            "lookback_runs": lookback,
            "sources": [],
        })));
    };

    let rows = health(store, &latest.run_id, lookback)?;
    Ok(CommandResult::ok(json!({
        "run_id": latest.run_id,
        "lookback_runs": lookback,
        "sources": rows,
    })))
}
