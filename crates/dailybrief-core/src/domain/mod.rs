//! # Domain Models
//!
//! Types shared by the run orchestrator, the parsers, and the health engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SourceDescriptor`] | Validated source configuration |
//! | [`SourceKind`] | Closed set of source kinds with per-kind parameters |
//! | [`Run`] | One ingestion cycle |
//! | [`SourceRunRecord`] | Outcome of one source in one run |
//! | [`Item`] | Normalized entry keyed by `(source_id, url)` |
//! | [`UtcDateTime`] | UTC timestamp |

mod item;
mod run;
mod source;
mod timestamp;

pub use item::Item;
pub use run::{Run, RunMode, RunStatus, SourceRunRecord, SourceRunStatus};
pub use source::{SourceDescriptor, SourceKind};
pub use timestamp::UtcDateTime;
