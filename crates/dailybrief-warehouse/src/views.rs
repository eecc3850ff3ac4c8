//! Database views for the monitoring read path.

use ::duckdb::Connection;

/// Create database views used by the dashboard queries.
///
/// Creates the following views:
/// - `vw_item_counts`: number of live items per run and source name
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_item_counts AS
SELECT
    run_id,
    source_name,
    COUNT(*) AS item_count
FROM items
GROUP BY run_id, source_name;

",
    )?;

    Ok(())
}
