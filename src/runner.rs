use std::time::Instant;

use chrono::Utc;

use crate::core::{check_sequence, HistoryRow, Migration, Version};
use crate::error::Error;
use crate::handle::QueryHandle;
use crate::store::{HistoryTable, HISTORY_TABLE_NAME};

/// The entrypoint for running a sequence of [Migration]s.
///
/// Construct this struct with the list of all migrations to be applied, in
/// the intended order. Version keys must be strictly increasing in that
/// order. Running the same migrator repeatedly is safe: already-applied
/// migrations (matched by version key and checksum against the history
/// table) are skipped.
///
/// Each execution and the final bulk history append are independent
/// statements against the [QueryHandle]: a failing migration aborts the run,
/// but statements already executed in that run are not rolled back.
pub struct Migrator {
    migrations: Vec<Migration>,
    history_table: HistoryTable,
    on_migration_start: Option<Box<dyn Fn(Version, &str) + Send + Sync>>,
    on_migration_complete: Option<Box<dyn Fn(Version, &str, std::time::Duration) + Send + Sync>>,
    on_migration_skipped: Option<Box<dyn Fn(Version, &str) + Send + Sync>>,
    on_migration_error: Option<Box<dyn Fn(Version, &str, &Error) + Send + Sync>>,
}

// Manual Debug impl since closures don't implement Debug
impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("migrations", &self.migrations)
            .field("history_table_name", &self.history_table.name)
            .field("on_migration_start", &self.on_migration_start.is_some())
            .field(
                "on_migration_complete",
                &self.on_migration_complete.is_some(),
            )
            .field("on_migration_skipped", &self.on_migration_skipped.is_some())
            .field("on_migration_error", &self.on_migration_error.is_some())
            .finish()
    }
}

impl Migrator {
    /// Create a new Migrator, validating the migration sequence.
    /// Returns an error if the sequence is invalid.
    pub fn try_new(migrations: Vec<Migration>) -> Result<Self, Error> {
        check_sequence(&migrations)?;
        Ok(Self {
            migrations,
            history_table: HistoryTable::new(HISTORY_TABLE_NAME),
            on_migration_start: None,
            on_migration_complete: None,
            on_migration_skipped: None,
            on_migration_error: None,
        })
    }

    /// Create a new Migrator, panicking if the migration sequence is invalid.
    /// For a non-panicking version, use `try_new`.
    pub fn new(migrations: Vec<Migration>) -> Self {
        match Self::try_new(migrations) {
            Ok(migrator) => migrator,
            Err(err) => panic!("{}", err),
        }
    }

    /// Set a custom name for the migration history table.
    /// Defaults to [HISTORY_TABLE_NAME].
    pub fn with_history_table_name(mut self, name: impl Into<String>) -> Self {
        self.history_table = HistoryTable::new(name);
        self
    }

    /// Set a callback to be invoked when a migration starts.
    /// The callback receives the migration version and name.
    pub fn on_migration_start<F>(mut self, callback: F) -> Self
    where
        F: Fn(Version, &str) + Send + Sync + 'static,
    {
        self.on_migration_start = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked when a migration completes successfully.
    /// The callback receives the migration version, name, and duration.
    pub fn on_migration_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(Version, &str, std::time::Duration) + Send + Sync + 'static,
    {
        self.on_migration_complete = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked when a migration is skipped because it
    /// was already applied. The callback receives the version and name.
    pub fn on_migration_skipped<F>(mut self, callback: F) -> Self
    where
        F: Fn(Version, &str) + Send + Sync + 'static,
    {
        self.on_migration_skipped = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked when a migration fails or drifts.
    /// The callback receives the version, name, and error.
    pub fn on_migration_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(Version, &str, &Error) + Send + Sync + 'static,
    {
        self.on_migration_error = Some(Box::new(callback));
        self
    }

    /// Get a reference to all migrations in this migrator.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn history_table_name(&self) -> &str {
        &self.history_table.name
    }

    /// Get the history of all migrations recorded as applied, ordered by
    /// installed rank. Returns an empty vector on a fresh database.
    pub fn history(&self, handle: &mut dyn QueryHandle) -> Result<Vec<HistoryRow>, Error> {
        // the generic handle has no portable table-existence probe, so rely
        // on the ensure DDL being idempotent
        self.history_table.ensure(handle)?;
        self.history_table.fetch(handle)
    }

    /// The version key of the most recently installed migration, or `None`
    /// if no migrations have been applied.
    pub fn current_version(&self, handle: &mut dyn QueryHandle) -> Result<Option<Version>, Error> {
        Ok(self.history(handle)?.last().map(|row| row.version))
    }

    /// Preview which migrations [run](Migrator::run) would execute, without
    /// executing any of them. Surfaces drift the same way `run` does.
    pub fn pending(&self, handle: &mut dyn QueryHandle) -> Result<Vec<&Migration>, Error> {
        check_sequence(&self.migrations)?;
        let history = self.history(handle)?;
        let mut pending = Vec::new();
        for migration in &self.migrations {
            if self.disposition(migration, &history)?.is_some() {
                pending.push(migration);
            }
        }
        Ok(pending)
    }

    /// Apply all previously-unapplied migrations through the given handle.
    ///
    /// Steps: validate the sequence (pure, before any I/O), ensure the
    /// history table, fetch the full history once, execute every pending
    /// migration in list order, then persist all new history rows in one
    /// bulk append. Returns the newly applied rows in list order; a second
    /// run with the same inputs returns an empty vector.
    pub fn run(&self, handle: &mut dyn QueryHandle) -> Result<Vec<HistoryRow>, Error> {
        check_sequence(&self.migrations)?;

        self.history_table.ensure(handle)?;
        let history = self.history_table.fetch(handle)?;
        let last_rank = HistoryTable::last_rank(&history);
        // one batch timestamp per run
        let installed_on = Utc::now();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            last_rank = last_rank,
            history_rows = history.len(),
            migrations = self.migrations.len(),
            "Considering migrations to run"
        );

        let mut expected = 0usize;
        let mut rows: Vec<HistoryRow> = Vec::new();
        for migration in &self.migrations {
            let version = migration.version_key();
            let checksum = match self.disposition(migration, &history) {
                Ok(Some(checksum)) => checksum,
                Ok(None) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        version = %version,
                        name = %migration.name,
                        "Skipping migration (already applied)"
                    );
                    if let Some(ref callback) = self.on_migration_skipped {
                        callback(version, &migration.name);
                    }
                    continue;
                }
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        version = %version,
                        name = %migration.name,
                        error = %error,
                        "Migration content changed after being applied"
                    );
                    if let Some(ref callback) = self.on_migration_error {
                        callback(version, &migration.name, &error);
                    }
                    return Err(error);
                }
            };
            expected += 1;

            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!(
                "migration_up",
                version = %version,
                name = %migration.name
            )
            .entered();

            #[cfg(feature = "tracing")]
            tracing::info!("Starting migration");

            if let Some(ref callback) = self.on_migration_start {
                callback(version, &migration.name);
            }

            let started = Instant::now();
            let result = match handle.execute(&migration.sql) {
                Ok(result) => result,
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %error, "Migration failed");

                    if let Some(ref callback) = self.on_migration_error {
                        callback(version, &migration.name, &error);
                    }
                    // already-executed statements from this run are not
                    // rolled back; nothing is recorded for this migration
                    return Err(error);
                }
            };
            let duration = started.elapsed();

            #[cfg(feature = "tracing")]
            tracing::info!(
                duration_ms = duration.as_millis() as u64,
                "Migration completed successfully"
            );

            if let Some(ref callback) = self.on_migration_complete {
                callback(version, &migration.name, duration);
            }

            rows.push(HistoryRow {
                // running counter over executed migrations keeps ranks
                // gap-free even when earlier list entries were skipped
                installed_rank: last_rank + rows.len() as i64 + 1,
                version,
                name: migration.name.clone(),
                checksum,
                execution_time_ms: duration.as_millis() as i64,
                success: result.status(),
                installed_on,
            });
        }

        if rows.len() != expected {
            return Err(Error::RunIntegrity {
                expected,
                actual: rows.len(),
            });
        }

        self.history_table.append(handle, &rows)?;

        Ok(rows)
    }

    /// Decide what to do with one migration against the pre-fetched history
    /// snapshot: `Some(checksum)` means it needs to execute, `None` means it
    /// was already applied with matching content, and a version match with a
    /// different checksum is drift.
    fn disposition(
        &self,
        migration: &Migration,
        history: &[HistoryRow],
    ) -> Result<Option<String>, Error> {
        let version = migration.version_key();
        let computed = migration.checksum();
        match history.iter().find(|row| row.version == version) {
            Some(row) if row.checksum == computed => Ok(None),
            Some(row) => Err(Error::Drift {
                name: migration.name.clone(),
                version,
                recorded: row.checksum.clone(),
                computed,
            }),
            None => Ok(Some(computed)),
        }
    }
}
