//! Behavior-driven tests for run identity
//!
//! These tests verify HOW run ids are chosen against real persisted history:
//! explicit ids, environment overrides, collision suffixes, and overwrite.

use dailybrief_core::{
    EnvOverrides, Item, Run, RunCatalog, RunIdAllocator, RunMode, RunStore, Settings,
    SourceRunRecord, UtcDateTime,
};
use dailybrief_tests::{news_source, Workspace};
use serde_json::json;
use time::macros::datetime;
use time::UtcOffset;

fn record_run(store: &dyn RunStore, run_id: &str) {
    let now = UtcDateTime::now();
    let source = news_source();
    store
        .insert_run(&Run::start(run_id, RunMode::Manual, json!({})))
        .expect("insert run");
    store
        .upsert_source_runs(&[SourceRunRecord::success(run_id, &source.id, now, now, 1)])
        .expect("source run");
    store
        .replace_sources(run_id, std::slice::from_ref(&source))
        .expect("sources");
    let item = Item::from_source(
        &source,
        format!("story of {run_id}"),
        String::new(),
        format!("https://news.example.test/{run_id}"),
        now,
        now,
    );
    store.upsert_items(run_id, &[item]).expect("items");
}

// =============================================================================
// Allocation: Collisions
// =============================================================================

#[test]
fn when_an_id_is_requested_twice_the_second_gets_a_numeric_suffix() {
    // Given: An empty history
    let workspace = Workspace::new();
    let store = workspace.store();
    let allocator = RunIdAllocator::from_settings(&workspace.settings);

    // When: "demo-run" is allocated and recorded twice
    let first = allocator.allocate(store, Some("demo-run"), false);
    record_run(store, &first);
    let second = allocator.allocate(store, Some("demo-run"), false);
    record_run(store, &second);
    let third = allocator.allocate(store, Some("demo-run"), false);

    // Then: Suffixes increase without touching earlier runs
    assert_eq!(first, "demo-run");
    assert_eq!(second, "demo-run-02");
    assert_eq!(third, "demo-run-03");
    assert!(store.run_exists("demo-run").expect("exists"));
    assert_eq!(store.count_items().expect("count"), 2);
}

#[test]
fn when_overwrite_is_requested_the_old_run_is_deleted_and_the_id_reused() {
    // Given: A recorded run with items and source runs
    let workspace = Workspace::new();
    let store = workspace.store();
    record_run(store, "nightly");
    let allocator = RunIdAllocator::from_settings(&workspace.settings);

    // When: The id is allocated with overwrite
    let run_id = allocator.allocate(store, Some("nightly"), true);

    // Then: Same id, and every row of the old run is gone
    assert_eq!(run_id, "nightly");
    assert!(!store.run_exists("nightly").expect("exists"));
    assert_eq!(store.count_items().expect("count"), 0);
    assert!(store
        .query_last_n_source_runs(10)
        .expect("source runs")
        .is_empty());
    assert!(store
        .source_names_for_run("nightly")
        .expect("names")
        .is_empty());
}

// =============================================================================
// Allocation: Id sources
// =============================================================================

#[test]
fn when_run_id_env_is_set_it_is_used_unless_an_explicit_id_is_given() {
    // Given: RUN_ID captured from the environment
    let workspace = Workspace::new();
    let env = EnvOverrides::from_lookup(|key| (key == "RUN_ID").then(|| String::from("from-env")));
    let settings = Settings::default().with_env(&env);
    let allocator = RunIdAllocator::from_settings(&settings);

    // When/Then: The override applies only without an explicit id
    assert_eq!(allocator.allocate(workspace.store(), None, false), "from-env");
    assert_eq!(
        allocator.allocate(workspace.store(), Some("explicit"), false),
        "explicit"
    );
}

#[test]
fn when_no_id_is_given_the_default_is_derived_from_the_reference_clock() {
    // Given: The default reference timezone (UTC+9)
    let settings = Settings::default();
    let allocator = RunIdAllocator::from_settings(&settings);

    // When: A base id is derived late on New Year's Eve UTC
    let id = allocator.base_id(None, datetime!(2024-12-31 20:00:00 UTC));

    // Then: The date rolls over in the reference timezone
    assert_eq!(id, "run-20250101-050000");

    let utc = RunIdAllocator::new(None, UtcOffset::UTC);
    assert_eq!(
        utc.base_id(None, datetime!(2024-12-31 20:00:00 UTC)),
        "run-20241231-200000"
    );
}
