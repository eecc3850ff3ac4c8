//! Run identity allocation with collision handling.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::config::Settings;
use crate::store::RunCatalog;

const DEFAULT_ID_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("run-[year][month][day]-[hour][minute][second]");

/// Highest numbered suffix tried before falling back to a timestamp suffix.
const MAX_SUFFIX: u32 = 999;

/// Derives run ids and resolves collisions against persisted history.
///
/// Allocation never fails. A catalog that cannot answer `run_exists` is
/// treated as having no such run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdAllocator {
    env_override: Option<String>,
    utc_offset: UtcOffset,
}

impl RunIdAllocator {
    pub fn new(env_override: Option<String>, utc_offset: UtcOffset) -> Self {
        Self {
            env_override: non_empty(env_override.as_deref()),
            utc_offset,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let offset = UtcOffset::from_hms(settings.run_id_utc_offset_hours, 0, 0)
            .unwrap_or(UtcOffset::UTC);
        Self::new(settings.run_id_override.clone(), offset)
    }

    /// Candidate id before collision handling: explicit, then environment
    /// override, then `run-YYYYMMDD-HHMMSS` in the reference timezone.
    ///
    /// The id names the export directory, so a requested id that is not a
    /// single plain path component is replaced by the timestamp default.
    pub fn base_id(&self, explicit: Option<&str>, now: OffsetDateTime) -> String {
        match non_empty(explicit).or_else(|| self.env_override.clone()) {
            Some(requested) if is_path_safe(&requested) => requested,
            Some(requested) => {
                let fallback = default_run_id(now, self.utc_offset);
                tracing::warn!(
                    requested = %requested,
                    run_id = %fallback,
                    "requested run id is not a plain file name, using default"
                );
                fallback
            }
            None => default_run_id(now, self.utc_offset),
        }
    }

    pub fn allocate<C: RunCatalog + ?Sized>(
        &self,
        catalog: &C,
        explicit: Option<&str>,
        overwrite: bool,
    ) -> String {
        self.allocate_at(catalog, explicit, overwrite, OffsetDateTime::now_utc())
    }

    pub fn allocate_at<C: RunCatalog + ?Sized>(
        &self,
        catalog: &C,
        explicit: Option<&str>,
        overwrite: bool,
        now: OffsetDateTime,
    ) -> String {
        let base = self.base_id(explicit, now);

        if overwrite {
            if exists(catalog, &base) {
                match catalog.delete_run(&base) {
                    Ok(deleted) => {
                        tracing::info!(run_id = %base, deleted, "overwriting existing run");
                    }
                    Err(error) => {
                        tracing::warn!(run_id = %base, %error, "could not delete run for overwrite");
                    }
                }
            }
            return base;
        }

        if !exists(catalog, &base) {
            return base;
        }
        for suffix in 2..=MAX_SUFFIX {
            let candidate = format!("{base}-{suffix:02}");
            if !exists(catalog, &candidate) {
                tracing::info!(requested = %base, run_id = %candidate, "run id taken, using suffix");
                return candidate;
            }
        }

        let fallback = format!("{base}-{}", now.unix_timestamp_nanos());
        tracing::warn!(requested = %base, run_id = %fallback, "suffixes exhausted, using timestamp suffix");
        fallback
    }
}

/// `run-YYYYMMDD-HHMMSS` for `now` shifted to `offset`.
pub fn default_run_id(now: OffsetDateTime, offset: UtcOffset) -> String {
    now.to_offset(offset)
        .format(DEFAULT_ID_FORMAT)
        .unwrap_or_else(|_| format!("run-{}", now.unix_timestamp()))
}

/// Whether `run_id` can be joined onto a directory without leaving it.
pub fn is_path_safe(run_id: &str) -> bool {
    !run_id.is_empty()
        && run_id != "."
        && !run_id.contains("..")
        && !run_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
}

fn exists<C: RunCatalog + ?Sized>(catalog: &C, run_id: &str) -> bool {
    match catalog.run_exists(run_id) {
        Ok(found) => found,
        Err(error) => {
            tracing::warn!(run_id, %error, "run existence check failed, assuming free");
            false
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use time::macros::datetime;

    #[derive(Default)]
    struct Catalog {
        runs: RefCell<BTreeSet<String>>,
        deleted: RefCell<Vec<String>>,
    }

    impl Catalog {
        fn with(ids: &[&str]) -> Self {
            let catalog = Self::default();
            catalog
                .runs
                .borrow_mut()
                .extend(ids.iter().map(|id| (*id).to_owned()));
            catalog
        }
    }

    impl RunCatalog for Catalog {
        fn run_exists(&self, run_id: &str) -> Result<bool, StoreError> {
            Ok(self.runs.borrow().contains(run_id))
        }

        fn delete_run(&self, run_id: &str) -> Result<usize, StoreError> {
            self.deleted.borrow_mut().push(run_id.to_owned());
            Ok(usize::from(self.runs.borrow_mut().remove(run_id)))
        }
    }

    struct Unreachable;

    impl RunCatalog for Unreachable {
        fn run_exists(&self, _run_id: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable(String::from("db offline")))
        }

        fn delete_run(&self, _run_id: &str) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable(String::from("db offline")))
        }
    }

    fn allocator() -> RunIdAllocator {
        RunIdAllocator::new(None, UtcOffset::from_hms(9, 0, 0).expect("offset"))
    }

    #[test]
    fn default_id_uses_reference_timezone() {
        let now = datetime!(2024-12-31 22:30:05 UTC);
        assert_eq!(allocator().base_id(None, now), "run-20250101-073005");
    }

    #[test]
    fn explicit_beats_env_override_and_blank_is_ignored() {
        let allocator = RunIdAllocator::new(Some(String::from("from-env")), UtcOffset::UTC);
        let now = datetime!(2024-01-01 00:00:00 UTC);
        assert_eq!(allocator.base_id(Some("explicit"), now), "explicit");
        assert_eq!(allocator.base_id(Some("  "), now), "from-env");
        assert_eq!(allocator.base_id(None, now), "from-env");
    }

    #[test]
    fn ids_that_escape_the_export_root_fall_back_to_default() {
        let now = datetime!(2024-06-03 00:00:00 UTC);
        let expected = "run-20240603-090000";
        for requested in ["/tmp/escape", "../../elsewhere", "a/b", "..", "c:\\temp", "x\\..\\y"] {
            assert_eq!(allocator().base_id(Some(requested), now), expected, "{requested}");
        }

        let from_env = RunIdAllocator::new(
            Some(String::from("../outside")),
            UtcOffset::from_hms(9, 0, 0).expect("offset"),
        );
        assert_eq!(from_env.base_id(None, now), expected);
        assert_eq!(allocator().base_id(Some("nightly.v2-rerun"), now), "nightly.v2-rerun");
    }

    #[test]
    fn collisions_try_increasing_suffixes() {
        let catalog = Catalog::with(&["demo-run", "demo-run-02"]);
        let run_id = allocator().allocate(&catalog, Some("demo-run"), false);
        assert_eq!(run_id, "demo-run-03");
        assert!(catalog.deleted.borrow().is_empty());
    }

    #[test]
    fn overwrite_deletes_existing_and_keeps_id() {
        let catalog = Catalog::with(&["demo-run"]);
        let run_id = allocator().allocate(&catalog, Some("demo-run"), true);
        assert_eq!(run_id, "demo-run");
        assert_eq!(catalog.deleted.borrow().as_slice(), ["demo-run".to_owned()]);
    }

    #[test]
    fn overwrite_of_unknown_id_deletes_nothing() {
        let catalog = Catalog::default();
        assert_eq!(allocator().allocate(&catalog, Some("fresh"), true), "fresh");
        assert!(catalog.deleted.borrow().is_empty());
    }

    #[test]
    fn unreachable_catalog_still_allocates() {
        assert_eq!(allocator().allocate(&Unreachable, Some("demo-run"), false), "demo-run");
        assert_eq!(allocator().allocate(&Unreachable, Some("demo-run"), true), "demo-run");
    }

    #[test]
    fn exhausted_suffixes_fall_back_to_timestamp() {
        let mut taken = vec![String::from("busy")];
        taken.extend((2..=MAX_SUFFIX).map(|n| format!("busy-{n:02}")));
        let refs: Vec<&str> = taken.iter().map(String::as_str).collect();
        let catalog = Catalog::with(&refs);
        let now = datetime!(2024-01-01 00:00:00 UTC);

        let run_id = allocator().allocate_at(&catalog, Some("busy"), false, now);
        assert_eq!(run_id, format!("busy-{}", now.unix_timestamp_nanos()));
    }
}
