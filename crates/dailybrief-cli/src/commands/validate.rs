use std::path::Path;

use dailybrief_core::validate_config_dir;

use crate::error::CliError;

use super::CommandResult;

pub fn run(config_dir: &Path) -> Result<CommandResult, CliError> {
    let report = validate_config_dir(config_dir);
    for file in &report.files {
        tracing::info!(file = %file.file, status = ?file.status, "{}", file.message);
    }

    let result = CommandResult::ok(serde_json::to_value(&report)?);
    if report.ok {
        Ok(result)
    } else {
        let code = CliError::InvalidConfig {
            dir: config_dir.display().to_string(),
        }
        .exit_code();
        Ok(result.with_exit_code(code))
    }
}
