//! Behavior-driven tests for source health
//!
//! These tests verify HOW recorded run history turns into per-source health:
//! failure streaks, success rates, the lookback window, and the dashboard
//! read model built on top.

use dailybrief_core::{
    health, DashboardView, RunMode, RunRequest, RunStatus, SourceDescriptor, SourceRunStatus,
};
use dailybrief_tests::{news_source, sources, RoutedFetcher, Workspace, NEWS_URL, RSS};

const FLAKY_URL: &str = "https://flaky.example.test/rss";

fn flaky_source() -> SourceDescriptor {
    SourceDescriptor::feed("flaky", "Flaky Feed", FLAKY_URL)
}

/// Run the steady and flaky sources once; `flaky_ok` decides the flaky outcome.
async fn run_once(workspace: &Workspace, run_id: &str, flaky_ok: bool) -> RunStatus {
    let config = sources(vec![news_source(), flaky_source()]);
    let fetcher = RoutedFetcher::new().body(NEWS_URL, RSS);
    let fetcher = if flaky_ok {
        fetcher.body(FLAKY_URL, RSS)
    } else {
        fetcher.status(FLAKY_URL, 502)
    };
    workspace
        .run(
            &config,
            &fetcher,
            RunRequest::new(RunMode::Scheduled).with_run_id(run_id),
        )
        .await
        .expect("run")
        .status()
}

// =============================================================================
// Health: Streaks and rates
// =============================================================================

#[tokio::test]
async fn when_a_source_failed_twice_since_its_last_success_the_streak_is_two() {
    // Given: Oldest to newest, the flaky source fails, succeeds, fails, fails
    let workspace = Workspace::new();
    assert_eq!(run_once(&workspace, "r1", false).await, RunStatus::Partial);
    assert_eq!(run_once(&workspace, "r2", true).await, RunStatus::Success);
    run_once(&workspace, "r3", false).await;
    run_once(&workspace, "r4", false).await;

    // When: Health is computed for the latest run
    let rows = health(workspace.store(), "r4", 20).expect("health");

    // Then: The flaky source leads with a streak of 2
    assert_eq!(rows.len(), 2);
    let flaky = &rows[0];
    assert_eq!(flaky.source_id, "flaky");
    assert_eq!(flaky.source_name, "Flaky Feed");
    assert_eq!(flaky.consecutive_failures, 2);
    assert_eq!(flaky.runs, 4);
    assert_eq!(flaky.success_count, 1);
    assert_eq!(flaky.fail_count, 3);
    assert_eq!(flaky.success_rate, Some(25.0));
    assert_eq!(flaky.last_status, SourceRunStatus::Failed);
    assert_eq!(flaky.last_http_status, Some(502));
    assert_eq!(flaky.last_error_class.as_deref(), Some("FetchError"));
    assert!(flaky.last_success_at.is_some());

    let steady = &rows[1];
    assert_eq!(steady.source_id, "morning");
    assert_eq!(steady.consecutive_failures, 0);
    assert_eq!(steady.success_rate, Some(100.0));
    assert_eq!(steady.last_item_count, 3);
    assert!(steady.avg_duration_seconds.is_some());
}

#[tokio::test]
async fn when_the_lookback_is_short_older_runs_are_ignored() {
    // Given: Flaky fails in the two oldest runs, then succeeds twice
    let workspace = Workspace::new();
    run_once(&workspace, "r1", false).await;
    run_once(&workspace, "r2", false).await;
    run_once(&workspace, "r3", true).await;
    run_once(&workspace, "r4", true).await;

    // When: Only the last two runs are considered
    let rows = health(workspace.store(), "r4", 2).expect("health");

    // Then: The old failures no longer count
    let flaky = rows
        .iter()
        .find(|row| row.source_id == "flaky")
        .expect("flaky row");
    assert_eq!(flaky.runs, 2);
    assert_eq!(flaky.fail_count, 0);
    assert_eq!(flaky.consecutive_failures, 0);
}

#[tokio::test]
async fn when_a_source_is_renamed_health_uses_the_current_name() {
    // Given: A run under the old name, then one under a new name
    let workspace = Workspace::new();
    run_once(&workspace, "r1", true).await;
    let renamed = sources(vec![SourceDescriptor::feed(
        "flaky",
        "Renamed Feed",
        FLAKY_URL,
    )]);
    let fetcher = RoutedFetcher::new().body(FLAKY_URL, RSS);
    workspace
        .run(
            &renamed,
            &fetcher,
            RunRequest::new(RunMode::Manual).with_run_id("r2"),
        )
        .await
        .expect("run");

    // When: Health is computed for the latest run
    let rows = health(workspace.store(), "r2", 20).expect("health");

    // Then: The current name wins; sources absent from it fall back to ids
    let flaky = rows.iter().find(|row| row.source_id == "flaky").expect("flaky");
    assert_eq!(flaky.source_name, "Renamed Feed");
    let morning = rows
        .iter()
        .find(|row| row.source_id == "morning")
        .expect("morning");
    assert_eq!(morning.source_name, "morning");
}

// =============================================================================
// Dashboard read model
// =============================================================================

#[tokio::test]
async fn when_runs_exist_the_dashboard_shows_the_latest_completed_run() {
    // Given: Two completed runs
    let workspace = Workspace::new();
    run_once(&workspace, "r1", true).await;
    run_once(&workspace, "r2", false).await;

    // When: The dashboard view is loaded
    let view = DashboardView::load(workspace.store(), 20, 200).expect("dashboard");

    // Then: It reflects r2 with its items, counts, and health rows
    let run = view.run.as_ref().expect("run");
    assert_eq!(run.run_id, "r2");
    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(view.items.len(), 3);
    assert_eq!(view.item_counts.len(), 1);
    assert_eq!(view.item_counts[0].source_name, "Morning Wire");
    assert_eq!(view.health[0].source_id, "flaky");
    assert_eq!(view.total_items, 6);
}

#[test]
fn when_nothing_has_run_the_dashboard_is_empty() {
    let workspace = Workspace::new();

    let view = DashboardView::load(workspace.store(), 20, 200).expect("dashboard");

    assert!(view.is_empty());
    assert!(view.items.is_empty());
    assert!(view.health.is_empty());
}
