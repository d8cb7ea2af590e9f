use crate::core::Version;

/// Error type for the trackway crate.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// The supplied migration list is not strictly increasing by version.
    /// Detected before any database I/O; nothing is executed.
    #[error("migration '{name}' ({version}) breaks the sequence: {detail}")]
    Sequence {
        name: String,
        version: Version,
        detail: String,
    },
    /// A migration's version matches history but its checksum differs,
    /// meaning its content changed after it was applied.
    #[error(
        "migration '{name}' ({version}) changed after it was applied: \
         recorded checksum '{recorded}', computed '{computed}'"
    )]
    Drift {
        name: String,
        version: Version,
        recorded: String,
        computed: String,
    },
    /// The executor produced a different number of history rows than the
    /// number of migrations expected to run.
    #[error("expected {expected} migrations to produce history rows but got {actual}")]
    RunIntegrity { expected: usize, actual: usize },
    #[cfg(feature = "sqlite")]
    #[error("{0}")]
    Rusqlite(rusqlite::Error),
    #[error("{0}")]
    Generic(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Self::Rusqlite(value)
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Generic(value)
    }
}
