//! Testing utilities for migration development.
//!
//! [ScriptedHandle] drives the runner without a database by replaying queued
//! results; [RecordingHandle] wraps a real handle and captures every
//! statement it forwards. Both are meant for tests of application migration
//! lists and of custom [QueryHandle] integrations.

use std::collections::VecDeque;

use crate::error::Error;
use crate::handle::{ExecutionResult, QueryHandle};

/// A [QueryHandle] that replays scripted results in order.
///
/// Every executed statement is captured in `statements`. When the script is
/// exhausted, further statements succeed with `Statement { status: 1 }`,
/// which is enough for the bookkeeping store's DDL and insert traffic.
#[derive(Debug, Default)]
pub struct ScriptedHandle {
    script: VecDeque<Result<ExecutionResult, Error>>,
    /// Every statement executed, in order.
    pub statements: Vec<String>,
}

impl ScriptedHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next executed statement.
    pub fn push_result(&mut self, result: Result<ExecutionResult, Error>) -> &mut Self {
        self.script.push_back(result);
        self
    }
}

impl QueryHandle for ScriptedHandle {
    fn execute(&mut self, statement: &str) -> Result<ExecutionResult, Error> {
        self.statements.push(statement.to_string());
        self.script
            .pop_front()
            .unwrap_or(Ok(ExecutionResult::Statement { status: 1 }))
    }
}

/// A [QueryHandle] wrapper that records every statement it forwards to the
/// inner handle.
pub struct RecordingHandle<H> {
    inner: H,
    /// Every statement forwarded, in order.
    pub statements: Vec<String>,
}

impl<H: QueryHandle> RecordingHandle<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            statements: Vec::new(),
        }
    }

    /// Take back the wrapped handle.
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: QueryHandle> QueryHandle for RecordingHandle<H> {
    fn execute(&mut self, statement: &str) -> Result<ExecutionResult, Error> {
        self.statements.push(statement.to_string());
        self.inner.execute(statement)
    }
}
