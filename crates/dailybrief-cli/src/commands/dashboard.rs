use dailybrief_core::{open_warehouse, DashboardView, RunStore, Settings};

use crate::cli::DashboardArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &DashboardArgs, settings: &Settings) -> Result<CommandResult, CliError> {
    let lookback = args.lookback.unwrap_or(settings.lookback_runs).max(1);
    let warehouse = open_warehouse(settings.warehouse_config())?;
    let store: &dyn RunStore = &warehouse;

    let view = DashboardView::load(store, lookback, args.limit)?;
    Ok(CommandResult::ok(serde_json::to_value(&view)?))
}
