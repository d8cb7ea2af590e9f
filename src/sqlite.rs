//! SQLite support via the [`rusqlite`](https://crates.io/crates/rusqlite)
//! crate: a [QueryHandle] implementation for `rusqlite::Connection`.
//!
//! Multi-statement migration scripts run through `execute_batch`. SQLite has
//! no per-statement status packet, so a successful execution reports status
//! `1`. SELECT statements are decoded into [HistoryRow]s; the bookkeeping
//! store's history select is the only query the core issues, so that is the
//! only row shape this adapter knows how to read.
//!
//! # Example
//!
//! ```
//! use trackway::{migrations, Migrator};
//! use rusqlite::Connection;
//!
//! let migrator = Migrator::new(migrations![
//!     (1, 0, "create users", "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"),
//! ]);
//! let mut conn = Connection::open_in_memory().unwrap();
//! let applied = migrator.run(&mut conn).unwrap();
//! assert_eq!(applied.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::core::{HistoryRow, Version};
use crate::error::Error;
use crate::handle::{ExecutionResult, QueryHandle};

// Re-export for convenience in application code
pub use rusqlite::Connection as SqliteConnection;

impl QueryHandle for Connection {
    fn execute(&mut self, statement: &str) -> Result<ExecutionResult, Error> {
        if is_query(statement) {
            let mut stmt = self.prepare(statement)?;
            let raw = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, rusqlite::Error>>()?;
            let rows = raw
                .into_iter()
                .map(|(rank, version, name, checksum, execution_time, success, installed_on)| {
                    let version: Version = version.parse()?;
                    let installed_on = DateTime::parse_from_rfc3339(&installed_on)
                        .map_err(|e| Error::Generic(format!("failed to parse installed_on: {e}")))?
                        .with_timezone(&Utc);
                    Ok(HistoryRow {
                        installed_rank: rank,
                        version,
                        name,
                        checksum,
                        execution_time_ms: execution_time,
                        success,
                        installed_on,
                    })
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(ExecutionResult::Rows(rows))
        } else {
            self.execute_batch(statement)?;
            Ok(ExecutionResult::Statement { status: 1 })
        }
    }
}

fn is_query(statement: &str) -> bool {
    let trimmed = statement.trim_start();
    trimmed
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
}
