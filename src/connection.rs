//! # Connection - External Collaborator Contract
//!
//! The cursor engine never talks to the remote store directly; it consumes
//! exactly six synchronous primitives from a [`Connection`] implementation.
//! The transport behind them (network, shared memory, in-process map) is the
//! implementation's business, as are retries: a failed primitive surfaces
//! immediately and the engine never re-issues it.
//!
//! ## Sharing
//!
//! One connection serves many cursors. Cursors hold a [`SharedConnection`]
//! and lock it around exactly one primitive call per step, so two steps,
//! even on different cursors, can never interleave their request/response
//! round trips on the same session.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::record::GlobalRecord;
use crate::sql::SqlColumn;

/// Traversal direction passed through to every stepping primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// +1 / -1, the wire-level direction argument.
    pub fn signum(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Outcome of `execute_statement`. A statement-level failure is reported
/// here (nonzero `status_code`, `error` set) rather than as an `Err`, so the
/// caller sees the remote status pair verbatim; `Err` is reserved for the
/// session itself failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementReply {
    pub handle: u64,
    pub columns: Vec<SqlColumn>,
    pub status_code: i32,
    pub status_state: String,
    pub error: Option<String>,
}

/// Synchronous session to a hierarchical global store with an embedded SQL
/// layer. All six calls complete or fail atomically from the caller's point
/// of view; none accept deferred completion.
pub trait Connection {
    /// Rewrites `record`'s last subscript with the next/previous subscript
    /// in collation order at that level, or with an empty subscript at the
    /// end of the order. When `want_data` is set and the landed-on node
    /// holds a value, `record.data` is populated; otherwise it is cleared.
    fn order_next(
        &mut self,
        record: &mut GlobalRecord,
        direction: Direction,
        want_data: bool,
    ) -> Result<()>;

    /// Writes the record following `prev` (in full depth-first key order)
    /// into `next`. Returns `false` when no further record exists, in which
    /// case `next` is unspecified and must not be used. Reading `prev` while
    /// writing `next` is the double-buffer contract: the engine never needs
    /// a second round trip to learn the walk is finished.
    fn range_query_step(
        &mut self,
        prev: &GlobalRecord,
        next: &mut GlobalRecord,
        direction: Direction,
        want_data: bool,
    ) -> Result<bool>;

    /// Steps through the namespace's global names. `counter` is the listing
    /// position, updated in place; `None` means the listing is exhausted in
    /// the given direction.
    fn directory_step(&mut self, counter: &mut u64, direction: Direction) -> Result<Option<String>>;

    /// Runs a statement, producing column metadata and the remote status.
    fn execute_statement(&mut self, statement: &str, params: &[&str]) -> Result<StatementReply>;

    /// Releases server-side resources of an executed statement and returns
    /// a caller-facing status string.
    fn cleanup_statement(&mut self, handle: u64) -> Result<String>;

    /// Materializes row `row_no` (1-based) of an executed statement as a
    /// value-block buffer, or `None` when no row exists at that position.
    fn sql_row(&mut self, handle: u64, row_no: i64, direction: Direction) -> Result<Option<Vec<u8>>>;
}

/// A connection shared by many cursors; see the module docs for the
/// lock-per-step discipline.
pub type SharedConnection<C> = Arc<Mutex<C>>;

/// Wraps a connection for sharing across cursors.
pub fn shared<C: Connection>(connection: C) -> SharedConnection<C> {
    Arc::new(Mutex::new(connection))
}
