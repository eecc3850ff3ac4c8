//! # DailyBrief Core
//!
//! Ingestion run orchestration and source-health analytics for the DailyBrief
//! toolkit.
//!
//! ## Overview
//!
//! A run pulls items from configured sources (syndication feeds and a
//! tabular statistics API), normalizes them, upserts them by
//! `(source_id, url)`, and records a per-source outcome. Configured indicator
//! series are resolved on every run. Health metrics are computed on demand
//! from that recorded history.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Settings, environment overrides, source configuration |
//! | [`dashboard`] | Read model for the monitoring view |
//! | [`domain`] | Runs, source runs, items, source descriptors |
//! | [`error`] | Error types |
//! | [`export`] | Per-run CSV/JSON snapshot |
//! | [`fetch`] | Allow-listed fetch client with bounded retries |
//! | [`health`] | Rolling per-source reliability metrics |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`lock`] | Single-run mutual exclusion |
//! | [`parsers`] | Feed and stats API payload parsers |
//! | [`pipeline`] | Run orchestrator |
//! | [`redact`] | Secret masking for logged URLs |
//! | [`retry`] | Fixed-delay retry policy |
//! | [`run_id`] | Run identity allocation |
//! | [`series`] | Indicator series resolution |
//! | [`store`] | Storage seam over the warehouse |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dailybrief_core::{
//!     load_sources, open_warehouse, FetchClient, FileRunLock, Orchestrator, RunMode,
//!     RunRequest, SeriesConfig, Settings,
//! };
//!
//! let settings = Settings::load(dir)?;
//! let sources = load_sources(dir)?;
//! let series = SeriesConfig::load(dir)?;
//! let warehouse = open_warehouse(settings.warehouse_config())?;
//! let fetcher = FetchClient::from_settings(&settings.fetch)?;
//! let lock = FileRunLock::new(&settings.lock_path, settings.lock_stale_after());
//!
//! let report = Orchestrator::new(&settings, &warehouse, &fetcher, &lock)
//!     .with_series(&series)
//!     .run(&sources, RunRequest::new(RunMode::Manual))
//!     .await?;
//! println!("{} -> {}", report.run_id(), report.status());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ RunIdAlloc.  │   │   RunLock    │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼
//!        ┌─────────────────┐     ┌──────────────┐
//!        │  Orchestrator   │────▶│ FetchClient  │
//!        └────────┬────────┘     └──────┬───────┘
//!                 │                     ▼
//!                 │              ┌──────────────┐
//!                 │              │   Parsers    │
//!                 ▼              └──────────────┘
//!        ┌─────────────────┐     ┌──────────────┐
//!        │    RunStore     │────▶│ HealthEngine │
//!        │   (DuckDB)      │     └──────────────┘
//!        └─────────────────┘
//! ```

pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod export;
pub mod fetch;
pub mod health;
pub mod http_client;
pub mod lock;
pub mod parsers;
pub mod pipeline;
pub mod redact;
pub mod retry;
pub mod run_id;
pub mod series;
pub mod store;

// Configuration
pub use config::{
    load_sources, validate_config_dir, AlertsConfig, ConfigReport, EnvOverrides, FetchSettings,
    FileReport, FileStatus, GeoConfig, ScheduleConfig, ScoringConfig, Settings, SourcesConfig,
    WatchlistConfig,
};

// Read models
pub use dashboard::DashboardView;
pub use health::{compute_health, health, SourceHealth};

// Domain models
pub use domain::{
    Item, Run, RunMode, RunStatus, SourceDescriptor, SourceKind, SourceRunRecord,
    SourceRunStatus, UtcDateTime,
};

// Error types
pub use error::{
    ConfigError, ExportError, FetchError, InvalidValue, LockError, ParseError, PipelineError,
    SourceFailure, StoreError, TimestampError,
};

// Export
pub use export::{write_run_export, RunStats, SourceOutcome};

// Fetching
pub use fetch::{FetchClient, Fetcher};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use retry::RetryPolicy;

// Run control
pub use lock::{FileRunLock, MemoryRunLock, RunLock, RunLockGuard};
pub use pipeline::{Orchestrator, RunReport, RunRequest};
pub use run_id::RunIdAllocator;
pub use series::{resolve_series, ResolutionStatus, SeriesConfig, SeriesResolution};

// Storage (warehouse re-exported from dailybrief-warehouse)
pub use dailybrief_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
pub use store::{open_warehouse, RunCatalog, RunStore, SourceItemCount};
