use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Tables written with `INSERT OR REPLACE` carry no secondary indexes: DuckDB
// refuses those assignments to columns referenced by an index.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_run_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    started_at TIMESTAMP NOT NULL,
    ended_at TIMESTAMP,
    status TEXT NOT NULL,
    run_mode TEXT NOT NULL,
    params_json TEXT NOT NULL DEFAULT '{}',
    item_count BIGINT NOT NULL DEFAULT 0,
    source_count BIGINT NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sources (
    run_id TEXT NOT NULL,
    source_id TEXT NOT NULL,
    source_name TEXT NOT NULL,
    category TEXT NOT NULL,
    kind TEXT NOT NULL,
    enabled BOOLEAN NOT NULL,
    PRIMARY KEY(run_id, source_id)
);

CREATE TABLE IF NOT EXISTS source_runs (
    run_id TEXT NOT NULL,
    source_id TEXT NOT NULL,
    started_at TIMESTAMP NOT NULL,
    ended_at TIMESTAMP,
    status TEXT NOT NULL,
    item_count BIGINT NOT NULL DEFAULT 0,
    error_class TEXT,
    error_message TEXT,
    http_status INTEGER,
    PRIMARY KEY(run_id, source_id)
);

CREATE TABLE IF NOT EXISTS items (
    source_id TEXT NOT NULL,
    url TEXT NOT NULL,
    run_id TEXT NOT NULL,
    source_name TEXT NOT NULL,
    category TEXT NOT NULL,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    published_at TIMESTAMP,
    fetched_at TIMESTAMP NOT NULL,
    PRIMARY KEY(source_id, url)
);

CREATE TABLE IF NOT EXISTS alerts (
    run_id TEXT NOT NULL,
    alert_type TEXT NOT NULL,
    message TEXT NOT NULL
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);
CREATE INDEX IF NOT EXISTS idx_alerts_run_id ON alerts(run_id);
"#,
    },
    Migration {
        version: "0003_series_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS dim_series_resolution (
    series_key TEXT PRIMARY KEY,
    resolver_type TEXT NOT NULL,
    resolver_value TEXT,
    resolved_id TEXT,
    status TEXT NOT NULL,
    message TEXT,
    updated_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_indicator_series (
    series_key TEXT PRIMARY KEY,
    resolved_id TEXT NOT NULL,
    resolver_type TEXT,
    resolver_value TEXT,
    message TEXT
);

CREATE TABLE IF NOT EXISTS fact_indicator_series_run (
    run_id TEXT NOT NULL,
    series_key TEXT NOT NULL,
    resolved_id TEXT,
    status TEXT NOT NULL,
    message TEXT,
    PRIMARY KEY(run_id, series_key)
);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying warehouse migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
