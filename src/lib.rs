#![cfg_attr(docsrs, feature(doc_cfg))]
//! `trackway` is the embeddable core of a database migration runner.
//!
//! It applies an ordered list of SQL migrations exactly once each, records
//! every applied migration in a persisted history table, and detects content
//! drift via checksums, so re-running the same migrator is always safe.
//!
//! Core concepts:
//! - A [Migration] is plain data: a name, a `(version, idx)` ordering key,
//!   and the literal SQL to execute. Loading and ordering migration files is
//!   the caller's job; `trackway` validates the order and enforces it.
//! - All database access goes through a single [QueryHandle] capability, so
//!   the core carries no connection setup of its own. An implementation for
//!   `rusqlite::Connection` ships behind the `sqlite` feature (enabled by
//!   default).
//! - Every applied migration becomes a [HistoryRow] with a runner-assigned,
//!   gap-free `installed_rank`; history rows are append-only. A migration
//!   whose version matches history but whose checksum differs fails the run
//!   with [Error::Drift] rather than being silently skipped.
//!
//! # Example
//!
//! ```
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! # #[cfg(feature = "sqlite")]
//! # fn main() {
//! use trackway::{migrations, Migrator};
//! use rusqlite::Connection;
//!
//! let migrator = Migrator::new(migrations![
//!     (1, 0, "create users", "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"),
//!     (2, 0, "add email", "ALTER TABLE users ADD COLUMN email TEXT"),
//! ]);
//!
//! let mut conn = Connection::open_in_memory().unwrap();
//! let applied = migrator.run(&mut conn).unwrap();
//! assert_eq!(applied.len(), 2);
//! assert_eq!(applied[0].installed_rank, 1);
//! assert_eq!(applied[1].installed_rank, 2);
//!
//! // a second run applies nothing
//! let applied = migrator.run(&mut conn).unwrap();
//! assert!(applied.is_empty());
//! # }
//! ```
//!
//! # Features
//!
//! - `sqlite` (default) - [QueryHandle] for `rusqlite::Connection`.
//! - `tracing` - structured logging of each run via the `tracing` crate.
//! - `testing` - the `testing` module: scripted and recording query handles.

mod core;
pub use crate::core::{check_sequence, checksum, HistoryRow, Migration, Version};

mod error;
pub use error::Error;

mod handle;
pub use handle::{ExecutionResult, QueryHandle};

mod store;
pub use store::HISTORY_TABLE_NAME;

mod runner;
pub use runner::Migrator;

#[macro_use]
mod macros;

#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite;

#[cfg(feature = "testing")]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;
