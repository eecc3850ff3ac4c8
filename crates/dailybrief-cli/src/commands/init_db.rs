use dailybrief_core::{open_warehouse, RunStore, Settings};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct InitDbResponse {
    db_path: String,
    item_count: u64,
}

pub fn run(settings: &Settings) -> Result<CommandResult, CliError> {
    let warehouse = open_warehouse(settings.warehouse_config())?;
    let store: &dyn RunStore = &warehouse;
    let response = InitDbResponse {
        db_path: warehouse.db_path().display().to_string(),
        item_count: store.count_items()?,
    };
    tracing::info!(db_path = %response.db_path, "warehouse ready");
    Ok(CommandResult::ok(serde_json::to_value(response)?))
}
