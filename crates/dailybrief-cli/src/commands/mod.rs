mod dashboard;
mod health;
mod init_db;
mod run;
mod validate;

use std::path::Path;

use dailybrief_core::{EnvOverrides, Settings};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// JSON payload to print and the process exit code that goes with it.
pub struct CommandResult {
    pub data: Value,
    pub exit_code: u8,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self { data, exit_code: 0 }
    }

    pub fn with_exit_code(mut self, exit_code: u8) -> Self {
        self.exit_code = exit_code;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::ValidateConfig => validate::run(&cli.config_dir),
        Command::InitDb => init_db::run(&load_settings(&cli.config_dir)?),
        Command::Run(args) => run::run(args, &cli.config_dir, &load_settings(&cli.config_dir)?).await,
        Command::Health(args) => health::run(args, &load_settings(&cli.config_dir)?),
        Command::Dashboard(args) => dashboard::run(args, &load_settings(&cli.config_dir)?),
    }
}

/// Settings from `config_dir` with process environment overrides applied.
fn load_settings(config_dir: &Path) -> Result<Settings, CliError> {
    let settings = Settings::load(config_dir)?.with_env(&EnvOverrides::from_process_env());
    tracing::debug!(
        config_dir = %config_dir.display(),
        db_path = %settings.db_path.display(),
        output_root = %settings.output_root.display(),
        "settings loaded"
    );
    Ok(settings)
}
