use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// A named, versioned unit of SQL to apply exactly once.
///
/// Migrations are plain data: they are constructed by the caller (usually via
/// the [migrations!](crate::migrations) macro), handed to a
/// [Migrator](crate::Migrator) per run, and never persisted themselves. What
/// gets persisted is the [HistoryRow] produced when a migration is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Human-readable identifier, recorded in the history table.
    pub name: String,
    /// Primary ordering key (e.g. the major component of a semantic version).
    pub version: u32,
    /// Secondary ordering key disambiguating same-version migrations.
    pub idx: u32,
    /// The literal statement(s) to execute. May be a multi-statement script.
    pub sql: String,
}

impl Migration {
    pub fn new(
        name: impl Into<String>,
        version: u32,
        idx: u32,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            idx,
            sql: sql.into(),
        }
    }

    /// The composite ordering key derived from `(version, idx)`.
    pub fn version_key(&self) -> Version {
        Version {
            version: self.version,
            idx: self.idx,
        }
    }

    /// The checksum of this migration's SQL text. See [checksum].
    pub fn checksum(&self) -> String {
        checksum(&self.sql)
    }
}

/// The ordering key of a migration: `(version, idx)`, compared
/// lexicographically. Persisted in the history table as `"{version}.{idx}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub version: u32,
    pub idx: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.version, self.idx)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn invalid(s: &str) -> Error {
            Error::Generic(format!("invalid version string '{s}'"))
        }
        let (version, idx) = s.split_once('.').ok_or_else(|| invalid(s))?;
        Ok(Version {
            version: version.parse().map_err(|_| invalid(s))?,
            idx: idx.parse().map_err(|_| invalid(s))?,
        })
    }
}

/// One persisted record of an applied migration. Append-only: once written,
/// rows are never mutated or deleted by this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    /// Sequence number assigned by the runner at the time the migration was
    /// recorded. Unique, strictly increasing, gap-free in insertion order.
    pub installed_rank: i64,
    pub version: Version,
    pub name: String,
    /// Checksum of the SQL text at the time of execution.
    pub checksum: String,
    /// Wall-clock duration of the execution, in milliseconds.
    pub execution_time_ms: i64,
    /// The driver's status signal for the last statement executed.
    pub success: i64,
    pub installed_on: DateTime<Utc>,
}

/// Calculate the checksum of a migration's SQL text: SHA-256, lowercase hex.
///
/// Deterministic and stable across runs and processes. This is used to detect
/// content drift in previously-applied migrations; it is an integrity signal,
/// not a security boundary.
pub fn checksum(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify that the migrations, in the caller-supplied order, have strictly
/// increasing version keys (which also makes them pairwise distinct).
///
/// The list is never sorted: the caller's order is the canonical intended
/// order, and this check enforces it. Runs before any database I/O.
pub fn check_sequence(migrations: &[Migration]) -> Result<(), Error> {
    let mut previous: Option<(Version, &str)> = None;
    for migration in migrations {
        let version = migration.version_key();
        if let Some((prev_version, prev_name)) = previous {
            if version == prev_version {
                return Err(Error::Sequence {
                    name: migration.name.clone(),
                    version,
                    detail: format!("duplicates the version of '{prev_name}'"),
                });
            }
            if version < prev_version {
                return Err(Error::Sequence {
                    name: migration.name.clone(),
                    version,
                    detail: format!(
                        "is listed after '{prev_name}' ({prev_version}) but has a lower version"
                    ),
                });
            }
        }
        previous = Some((version, &migration.name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic_and_content_sensitive() {
        let a = checksum("CREATE TABLE a (id INTEGER)");
        let b = checksum("CREATE TABLE a (id INTEGER)");
        let c = checksum("CREATE TABLE a (id INTEGER, x TEXT)");
        assert_eq!(a, b);
        assert_ne!(a, c);
        // stable across processes: pin the value for a known input
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn version_key_orders_by_version_then_idx() {
        let v = |version, idx| Version { version, idx };
        assert!(v(1, 0) < v(1, 1));
        assert!(v(1, 1) < v(2, 0));
        assert!(v(2, 0) < v(10, 0));
        assert_eq!(v(3, 2), v(3, 2));
    }

    #[test]
    fn version_displays_and_parses() {
        let version = Version { version: 4, idx: 7 };
        assert_eq!(version.to_string(), "4.7");
        assert_eq!("4.7".parse::<Version>().unwrap(), version);
        assert!("4".parse::<Version>().is_err());
        assert!("4.x".parse::<Version>().is_err());
    }

    #[test]
    fn check_sequence_accepts_strictly_increasing_versions() {
        let migrations = vec![
            Migration::new("one", 1, 0, "SELECT 1"),
            Migration::new("one-b", 1, 1, "SELECT 1"),
            Migration::new("two", 2, 0, "SELECT 1"),
        ];
        assert!(check_sequence(&migrations).is_ok());
        assert!(check_sequence(&[]).is_ok());
    }

    #[test]
    fn check_sequence_rejects_duplicate_versions() {
        let migrations = vec![
            Migration::new("one", 1, 0, "SELECT 1"),
            Migration::new("also-one", 1, 0, "SELECT 2"),
        ];
        let err = check_sequence(&migrations).unwrap_err();
        match err {
            Error::Sequence { name, version, .. } => {
                assert_eq!(name, "also-one");
                assert_eq!(version, Version { version: 1, idx: 0 });
            }
            other => panic!("expected sequence error, got {other:?}"),
        }
    }

    #[test]
    fn check_sequence_rejects_decreasing_versions() {
        let migrations = vec![
            Migration::new("two", 2, 0, "SELECT 1"),
            Migration::new("one", 1, 0, "SELECT 1"),
        ];
        assert!(matches!(
            check_sequence(&migrations),
            Err(Error::Sequence { name, .. }) if name == "one"
        ));
    }

    #[test]
    fn check_sequence_rejects_decreasing_idx_within_a_version() {
        let migrations = vec![
            Migration::new("one-b", 1, 1, "SELECT 1"),
            Migration::new("one-a", 1, 0, "SELECT 1"),
        ];
        assert!(check_sequence(&migrations).is_err());
    }
}
