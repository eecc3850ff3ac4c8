//! CLI argument definitions for DailyBrief.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `validate-config` | Check every YAML file in the config directory |
//! | `init-db` | Create or migrate the DuckDB schema |
//! | `run` | Execute one ingestion run |
//! | `health` | Per-source health over recent runs |
//! | `dashboard` | Monitoring read model as JSON |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config-dir` | `config` | Directory holding the YAML configuration |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--log-json` | `false` | Emit logs as JSON lines on stderr |
//!
//! # Examples
//!
//! ```bash
//! dailybrief validate-config --config-dir ./config
//! dailybrief run manual --run-id demo-run --overwrite
//! dailybrief health --lookback 10 --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dailybrief_core::RunMode;

/// DailyBrief - scheduled feed and statistics ingestion with source health.
#[derive(Debug, Parser)]
#[command(
    name = "dailybrief",
    author,
    version,
    about = "Feed and statistics ingestion with per-source health tracking"
)]
pub struct Cli {
    /// Directory containing sources.yml and the optional settings.yml.
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate configuration files and print a per-file report.
    ///
    /// Exits with code 2 when any required file is missing or invalid.
    ValidateConfig,

    /// Create the warehouse schema and print the database path.
    InitDb,

    /// Execute one ingestion run.
    ///
    /// # Examples
    ///
    ///   dailybrief run manual
    ///   dailybrief run scheduled --run-id nightly --overwrite
    Run(RunArgs),

    /// Print source health rows for the latest completed run.
    Health(HealthArgs),

    /// Print the dashboard read model.
    Dashboard(DashboardArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Manual,
    Scheduled,
}

impl From<ModeArg> for RunMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Manual => Self::Manual,
            ModeArg::Scheduled => Self::Scheduled,
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// How the run was triggered.
    #[arg(value_enum)]
    pub mode: ModeArg,

    /// Explicit run id; collisions get a numeric suffix unless --overwrite.
    #[arg(long)]
    pub run_id: Option<String>,

    /// Delete an existing run with the same id before running.
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

#[derive(Debug, Args)]
pub struct HealthArgs {
    /// Number of most recent runs to consider. Defaults to settings.
    #[arg(long)]
    pub lookback: Option<usize>,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Maximum number of items to include.
    #[arg(long, default_value_t = 200)]
    pub limit: usize,

    /// Number of most recent runs for the health section. Defaults to settings.
    #[arg(long)]
    pub lookback: Option<usize>,
}
