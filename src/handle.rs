use crate::core::HistoryRow;
use crate::error::Error;

/// The single capability the runner needs from a database: execute one
/// statement (or script) and report back what happened.
///
/// This is the seam between the migration core and whatever owns the actual
/// connection. The crate ships an implementation for `rusqlite::Connection`
/// behind the `sqlite` feature; anything else can implement this trait.
pub trait QueryHandle {
    fn execute(&mut self, statement: &str) -> Result<ExecutionResult, Error>;
}

/// What a driver reports back for an executed statement.
///
/// Drivers may return a single result or a nested batch of results for
/// multi-statement scripts; the success signal is always taken from the last
/// result, recursively.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// A statement that produced no rows, with the driver's status signal.
    Statement { status: i64 },
    /// A result set, decoded into history rows. Only the bookkeeping store's
    /// history select goes through the handle, so this is the only row shape
    /// the core ever reads back.
    Rows(Vec<HistoryRow>),
    /// The results of a multi-statement script, in execution order.
    Batch(Vec<ExecutionResult>),
}

impl ExecutionResult {
    /// The driver's success signal: for a batch, the status of the last
    /// result, recursively. Result sets and empty batches report `1`.
    pub fn status(&self) -> i64 {
        match self {
            ExecutionResult::Statement { status } => *status,
            ExecutionResult::Rows(_) => 1,
            ExecutionResult::Batch(results) => {
                results.last().map(ExecutionResult::status).unwrap_or(1)
            }
        }
    }

    /// The decoded rows, empty for non-query results.
    pub fn into_rows(self) -> Vec<HistoryRow> {
        match self {
            ExecutionResult::Statement { .. } => Vec::new(),
            ExecutionResult::Rows(rows) => rows,
            ExecutionResult::Batch(results) => results
                .into_iter()
                .flat_map(ExecutionResult::into_rows)
                .collect(),
        }
    }
}
