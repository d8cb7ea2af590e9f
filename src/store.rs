//! The bookkeeping store: schema of the migration history table and the
//! queries against it. All access goes through the generic
//! [QueryHandle](crate::QueryHandle), so the store builds plain SQL text.

use crate::core::HistoryRow;
use crate::error::Error;
use crate::handle::QueryHandle;

/// Default name of the migration history table.
pub const HISTORY_TABLE_NAME: &str = "_trackway_history_";

/// Owns the history table's schema and the read/write queries against it.
pub(crate) struct HistoryTable {
    pub name: String,
}

impl HistoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Create the history table if it does not exist. Safe to run on every
    /// invocation; never alters or drops an existing table.
    pub fn ensure(&self, handle: &mut dyn QueryHandle) -> Result<(), Error> {
        handle.execute(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                installed_rank INTEGER PRIMARY KEY NOT NULL,
                version TEXT NOT NULL,
                name TEXT NOT NULL,
                checksum TEXT NOT NULL,
                execution_time INTEGER NOT NULL,
                success INTEGER NOT NULL,
                installed_on TEXT NOT NULL
            )",
            self.name
        ))?;
        Ok(())
    }

    /// Fetch all history rows, ordered by `installed_rank`. The sort happens
    /// here as well: install order is decided by rank, never by physical row
    /// order.
    pub fn fetch(&self, handle: &mut dyn QueryHandle) -> Result<Vec<HistoryRow>, Error> {
        let result = handle.execute(&format!(
            "SELECT installed_rank, version, name, checksum, execution_time, success, installed_on \
             FROM {} ORDER BY installed_rank",
            self.name
        ))?;
        let mut rows = result.into_rows();
        rows.sort_by_key(|row| row.installed_rank);
        Ok(rows)
    }

    /// Persist all rows as one bulk insert, so a run is never partially
    /// recorded. Callers skip the append entirely when there is nothing new.
    pub fn append(&self, handle: &mut dyn QueryHandle, rows: &[HistoryRow]) -> Result<(), Error> {
        if rows.is_empty() {
            return Ok(());
        }
        let values = rows.iter().map(row_values).collect::<Vec<_>>().join(", ");
        handle.execute(&format!(
            "INSERT INTO {} (installed_rank, version, name, checksum, execution_time, success, installed_on) \
             VALUES {}",
            self.name, values
        ))?;
        Ok(())
    }

    /// The highest rank currently in history, or 0 when history is empty.
    pub fn last_rank(rows: &[HistoryRow]) -> i64 {
        rows.iter().map(|row| row.installed_rank).max().unwrap_or(0)
    }
}

fn row_values(row: &HistoryRow) -> String {
    format!(
        "({}, {}, {}, {}, {}, {}, {})",
        row.installed_rank,
        quote(&row.version.to_string()),
        quote(&row.name),
        quote(&row.checksum),
        row.execution_time_ms,
        row.success,
        quote(&row.installed_on.to_rfc3339()),
    )
}

/// SQL string literal, with embedded single quotes doubled.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::core::Version;
    use chrono::Utc;
    use rusqlite::Connection;

    fn row(rank: i64, version: u32, name: &str) -> HistoryRow {
        HistoryRow {
            installed_rank: rank,
            version: Version { version, idx: 0 },
            name: name.to_string(),
            checksum: crate::core::checksum(name),
            execution_time_ms: 12,
            success: 1,
            installed_on: Utc::now(),
        }
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        let table = HistoryTable::new(HISTORY_TABLE_NAME);
        table.ensure(&mut conn).unwrap();
        table.append(&mut conn, &[row(1, 1, "first")]).unwrap();
        // a second ensure must not touch the existing table or its rows
        table.ensure(&mut conn).unwrap();
        let rows = table.fetch(&mut conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "first");
    }

    #[test]
    fn append_then_fetch_round_trips() {
        let mut conn = Connection::open_in_memory().unwrap();
        let table = HistoryTable::new(HISTORY_TABLE_NAME);
        table.ensure(&mut conn).unwrap();
        let written = vec![row(1, 1, "add 'legacy' column"), row(2, 2, "second")];
        table.append(&mut conn, &written).unwrap();
        let fetched = table.fetch(&mut conn).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].name, "add 'legacy' column");
        assert_eq!(fetched[0].version, Version { version: 1, idx: 0 });
        assert_eq!(fetched[1].checksum, written[1].checksum);
        assert_eq!(fetched[1].execution_time_ms, 12);
        // timestamps survive the rfc3339 round trip to second precision
        assert_eq!(
            fetched[0].installed_on.timestamp(),
            written[0].installed_on.timestamp()
        );
    }

    #[test]
    fn fetch_orders_by_rank_not_insertion_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        let table = HistoryTable::new(HISTORY_TABLE_NAME);
        table.ensure(&mut conn).unwrap();
        table.append(&mut conn, &[row(2, 2, "second")]).unwrap();
        table.append(&mut conn, &[row(1, 1, "first")]).unwrap();
        let fetched = table.fetch(&mut conn).unwrap();
        assert_eq!(
            fetched.iter().map(|r| r.installed_rank).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn last_rank_of_empty_history_is_zero() {
        assert_eq!(HistoryTable::last_rank(&[]), 0);
        assert_eq!(HistoryTable::last_rank(&[row(3, 1, "a"), row(7, 2, "b")]), 7);
    }

    #[test]
    fn custom_table_name_is_respected() {
        let mut conn = Connection::open_in_memory().unwrap();
        let table = HistoryTable::new("my_history");
        table.ensure(&mut conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='my_history'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
