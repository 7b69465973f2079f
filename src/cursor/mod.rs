//! # Cursor - Traversal State Machine
//!
//! A `Cursor` orchestrates one of four traversal modes over a shared
//! [`Connection`]:
//!
//! - **GlobalOrder**: the subscripts of one global, in collation order
//! - **Range**: all records of a multi-key query, depth-first, double-buffered
//! - **Directory**: the namespace's global names
//! - **Sql**: the rows of an executed statement
//!
//! The mode is a tagged variant carrying only the state its algorithm needs,
//! fixed at [`Cursor::reset`] time and dispatched exhaustively on every
//! step. Stepping returns `Ok(Some(output))` or the end-of-data sentinel
//! `Ok(None)`; a repeated call continues where the previous one stopped.
//!
//! ## Synchronous only
//!
//! Cursor state (the double-buffered range records, the SQL row position,
//! the directory counter) is mutated across a step, so a step must never be
//! split over a suspension point or run concurrently with another step on
//! the same cursor. Hosts that support deferred completion must pass
//! [`CallMode::Deferred`] through [`Cursor::step_with`], which rejects the
//! call up front, before any state change or I/O. Each step acquires the
//! shared connection for exactly one primitive call and releases it before
//! rendering.

mod render;

pub use render::{OutputFormat, StepOutput};

use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::OutputBuf;
use crate::connection::{Connection, Direction, SharedConnection};
use crate::error::{CursorError, Result};
use crate::record::GlobalRecord;
use crate::sql::{decode_row, ExecuteSummary, SqlResult};

/// How the host invoked a cursor operation. Deferred completion is a usage
/// error for cursors (other database operations in a surrounding system may
/// well be asynchronous; cursors opt out).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Sync,
    Deferred,
}

/// What a cursor traverses, fixed per reset.
#[derive(Debug, Clone)]
enum Traversal {
    GlobalOrder {
        record: GlobalRecord,
    },
    Range {
        /// Two positions: `records[front]` is the confirmed one, the other
        /// is the candidate the connection writes into.
        records: Box<[GlobalRecord; 2]>,
        front: usize,
    },
    Directory {
        counter: u64,
    },
    Sql {
        result: Option<SqlResult>,
    },
    /// Inert; every operation fails `Unbound`.
    Closed,
}

/// Traversal specification accepted by [`Cursor::open`] and
/// [`Cursor::reset`].
#[derive(Debug, Clone)]
pub struct CursorSpec {
    target: TargetSpec,
    fetch_data: bool,
    format: OutputFormat,
}

#[derive(Debug, Clone)]
enum TargetSpec {
    GlobalOrder { global: String, keys: Vec<String> },
    Range { global: String, keys: Vec<String> },
    Directory,
    Sql,
}

impl CursorSpec {
    /// Walk the subscripts of `global` starting from the given key; the
    /// last subscript is the starting position ("" starts before the first,
    /// or after the last when stepping backward).
    pub fn global_order<I, S>(global: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: TargetSpec::GlobalOrder {
                global: global.into(),
                keys: keys.into_iter().map(Into::into).collect(),
            },
            fetch_data: false,
            format: OutputFormat::Structured,
        }
    }

    /// Walk every record of `global` under the seed key, depth-first.
    pub fn range<I, S>(global: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: TargetSpec::Range {
                global: global.into(),
                keys: keys.into_iter().map(Into::into).collect(),
            },
            fetch_data: false,
            format: OutputFormat::Structured,
        }
    }

    /// Walk the namespace's global names.
    pub fn directory() -> Self {
        Self {
            target: TargetSpec::Directory,
            fetch_data: false,
            format: OutputFormat::Structured,
        }
    }

    /// Iterate the rows of statements run through [`Cursor::execute`].
    pub fn sql() -> Self {
        Self {
            target: TargetSpec::Sql,
            fetch_data: false,
            format: OutputFormat::Structured,
        }
    }

    /// Also retrieve each record's data value, not just its key.
    pub fn fetch_data(mut self, fetch_data: bool) -> Self {
        self.fetch_data = fetch_data;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Shorthand for the escaped `key=..&data=..` output format.
    pub fn flattened(self) -> Self {
        self.format(OutputFormat::Flattened)
    }
}

#[derive(Debug)]
pub struct Cursor<C: Connection> {
    conn: Option<SharedConnection<C>>,
    traversal: Traversal,
    fetch_data: bool,
    format: OutputFormat,
    render: OutputBuf,
}

impl<C: Connection> Cursor<C> {
    /// Opens a cursor bound to `conn` with the given traversal.
    pub fn open(conn: SharedConnection<C>, spec: CursorSpec) -> Result<Self> {
        let mut cursor = Self {
            conn: Some(conn),
            traversal: Traversal::Closed,
            fetch_data: false,
            format: OutputFormat::Structured,
            render: OutputBuf::new(),
        };
        cursor.reset(spec)?;
        Ok(cursor)
    }

    /// Discards all position state and rebinds the traversal. After a
    /// reset, the next step returns the first element of the new traversal
    /// regardless of where the cursor stood before.
    pub fn reset(&mut self, spec: CursorSpec) -> Result<()> {
        if self.conn.is_none() {
            return Err(CursorError::Unbound);
        }
        self.traversal = Traversal::from_spec(&spec.target)?;
        self.fetch_data = spec.fetch_data;
        self.format = spec.format;
        self.render.reset();
        debug!(mode = self.traversal.mode_name(), fetch_data = self.fetch_data, "cursor reset");
        Ok(())
    }

    /// Steps forward; `Ok(None)` is end-of-data.
    pub fn next(&mut self) -> Result<Option<StepOutput>> {
        self.step_with(Direction::Forward, CallMode::Sync)
    }

    /// Steps backward; `Ok(None)` is end-of-data.
    pub fn previous(&mut self) -> Result<Option<StepOutput>> {
        self.step_with(Direction::Backward, CallMode::Sync)
    }

    /// The full stepping entry point. A `Deferred` call mode fails with
    /// [`CursorError::AsyncNotSupported`] before any state change or I/O.
    pub fn step_with(&mut self, direction: Direction, mode: CallMode) -> Result<Option<StepOutput>> {
        if mode == CallMode::Deferred {
            return Err(CursorError::AsyncNotSupported);
        }
        let conn = match &self.conn {
            Some(conn) => Arc::clone(conn),
            None => return Err(CursorError::Unbound),
        };
        let want_data = self.fetch_data;
        let format = self.format;
        let buf = &mut self.render;
        trace!(?direction, mode = self.traversal.mode_name(), "cursor step");

        match &mut self.traversal {
            Traversal::GlobalOrder { record } => {
                order_step(&conn, record, direction, want_data, format, buf)
            }
            Traversal::Range { records, front } => {
                range_step(&conn, records, front, direction, want_data, format, buf)
            }
            Traversal::Directory { counter } => {
                let name = {
                    let mut session = conn.lock();
                    session.directory_step(counter, direction)?
                };
                Ok(name.map(|name| render::name_output(&name, format, buf)))
            }
            Traversal::Sql { result } => sql_step(&conn, result.as_mut(), direction),
            Traversal::Closed => Err(CursorError::Unbound),
        }
    }

    /// Runs a statement on an SQL-mode cursor. The summary carries the
    /// remote status pair verbatim; the column list is present only when
    /// execution reported no error. Rows are then iterated with
    /// [`Cursor::next`]/[`Cursor::previous`].
    pub fn execute(&mut self, statement: &str, params: &[&str]) -> Result<ExecuteSummary> {
        let conn = match &self.conn {
            Some(conn) => Arc::clone(conn),
            None => return Err(CursorError::Unbound),
        };
        let Traversal::Sql { result } = &mut self.traversal else {
            return Err(CursorError::invalid("execute requires an SQL-mode cursor"));
        };
        if statement.trim().is_empty() {
            return Err(CursorError::invalid("cannot execute an empty statement"));
        }

        let reply = {
            let mut session = conn.lock();
            session.execute_statement(statement, params)?
        };
        debug!(
            status_code = reply.status_code,
            status_state = %reply.status_state,
            columns = reply.columns.len(),
            "statement executed"
        );

        let summary = ExecuteSummary {
            status_code: reply.status_code,
            status_state: reply.status_state.clone(),
            error: reply.error.clone(),
            columns: reply.error.is_none().then(|| reply.columns.clone()),
        };
        *result = Some(SqlResult::from_reply(reply));
        Ok(summary)
    }

    /// Releases the server-side resources of the executed statement and
    /// returns the connection's status string. Without an executed
    /// statement there is nothing to release, which is not an error.
    pub fn cleanup(&mut self) -> Result<String> {
        let conn = match &self.conn {
            Some(conn) => Arc::clone(conn),
            None => return Err(CursorError::Unbound),
        };
        let Traversal::Sql { result } = &mut self.traversal else {
            return Err(CursorError::invalid("cleanup requires an SQL-mode cursor"));
        };
        match result.take() {
            None => Ok("no statement to release".to_string()),
            Some(executed) => {
                let status = {
                    let mut session = conn.lock();
                    session.cleanup_statement(executed.handle)?
                };
                Ok(status)
            }
        }
    }

    /// Releases every owned buffer and the SQL metadata and unbinds the
    /// connection. The cursor is inert afterwards: any further operation
    /// fails with [`CursorError::Unbound`].
    pub fn close(&mut self) {
        debug!(mode = self.traversal.mode_name(), "cursor closed");
        self.conn = None;
        self.traversal = Traversal::Closed;
        self.render = OutputBuf::new();
    }

    pub fn is_bound(&self) -> bool {
        self.conn.is_some()
    }

    /// Metadata of the most recent execution, when in SQL mode.
    pub fn sql_result(&self) -> Option<&SqlResult> {
        match &self.traversal {
            Traversal::Sql { result } => result.as_ref(),
            _ => None,
        }
    }
}

impl Traversal {
    fn from_spec(target: &TargetSpec) -> Result<Self> {
        match target {
            TargetSpec::GlobalOrder { global, keys } => {
                if global.is_empty() {
                    return Err(CursorError::invalid("global order reset requires a global name"));
                }
                Ok(Traversal::GlobalOrder {
                    record: GlobalRecord::with_keys(global.clone(), keys.iter().cloned()),
                })
            }
            TargetSpec::Range { global, keys } => {
                if global.is_empty() {
                    return Err(CursorError::invalid("range reset requires a global name"));
                }
                let seed = GlobalRecord::with_keys(global.clone(), keys.iter().cloned());
                let spare = GlobalRecord::new(global.clone());
                Ok(Traversal::Range {
                    records: Box::new([seed, spare]),
                    front: 0,
                })
            }
            TargetSpec::Directory => Ok(Traversal::Directory { counter: 0 }),
            TargetSpec::Sql => Ok(Traversal::Sql { result: None }),
        }
    }

    fn mode_name(&self) -> &'static str {
        match self {
            Traversal::GlobalOrder { .. } => "global_order",
            Traversal::Range { .. } => "range",
            Traversal::Directory { .. } => "directory",
            Traversal::Sql { .. } => "sql",
            Traversal::Closed => "closed",
        }
    }
}

fn order_step<C: Connection>(
    conn: &SharedConnection<C>,
    record: &mut GlobalRecord,
    direction: Direction,
    want_data: bool,
    format: OutputFormat,
    buf: &mut OutputBuf,
) -> Result<Option<StepOutput>> {
    if record.keyn() == 0 {
        return Ok(None);
    }
    {
        let mut session = conn.lock();
        session.order_next(record, direction, want_data)?;
    }
    // A zero-length subscript is the order's end marker.
    if record.last_key().map_or(true, str::is_empty) {
        record.data = None;
        return Ok(None);
    }
    Ok(Some(render::order_output(record, want_data, format, buf)))
}

fn range_step<C: Connection>(
    conn: &SharedConnection<C>,
    records: &mut [GlobalRecord; 2],
    front: &mut usize,
    direction: Direction,
    want_data: bool,
    format: OutputFormat,
    buf: &mut OutputBuf,
) -> Result<Option<StepOutput>> {
    let (prev, candidate) = split_records(records, *front);
    let found = {
        let mut session = conn.lock();
        session.range_query_step(prev, candidate, direction, want_data)?
    };
    if !found {
        // No further record: keep the confirmed position, do not swap.
        return Ok(None);
    }
    let output = render::range_output(candidate, want_data, format, buf);
    *front = 1 - *front;
    Ok(Some(output))
}

fn sql_step<C: Connection>(
    conn: &SharedConnection<C>,
    result: Option<&mut SqlResult>,
    direction: Direction,
) -> Result<Option<StepOutput>> {
    // No executed statement: nothing to iterate, which is not an error.
    let Some(result) = result else {
        return Ok(None);
    };
    let target = result.row_no + direction.signum();
    if target < 1 {
        return Ok(None);
    }
    let bytes = {
        let mut session = conn.lock();
        session.sql_row(result.handle, target, direction)?
    };
    let Some(row_buf) = bytes else {
        return Ok(None);
    };
    let pairs = decode_row(&result.columns, &row_buf)?;
    result.row_no = target;
    Ok(Some(StepOutput::Row(pairs)))
}

/// Splits the double buffer into the confirmed record and the candidate the
/// connection writes into.
fn split_records(records: &mut [GlobalRecord; 2], front: usize) -> (&GlobalRecord, &mut GlobalRecord) {
    let (left, right) = records.split_at_mut(1);
    if front == 0 {
        (&left[0], &mut right[0])
    } else {
        (&right[0], &mut left[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builders_set_options() {
        let spec = CursorSpec::global_order("customer", ["5"]).fetch_data(true).flattened();
        assert!(spec.fetch_data);
        assert_eq!(spec.format, OutputFormat::Flattened);
    }

    #[test]
    fn order_spec_without_global_is_rejected() {
        let spec = CursorSpec::global_order("", [""; 0]);
        assert!(matches!(
            Traversal::from_spec(&spec.target),
            Err(CursorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn range_spec_seeds_front_record() {
        let spec = CursorSpec::range("customer", ["uk"]);
        let Ok(Traversal::Range { records, front }) = Traversal::from_spec(&spec.target) else {
            panic!("expected a range traversal");
        };
        assert_eq!(front, 0);
        assert_eq!(records[0].keys.as_slice(), ["uk".to_string()]);
        assert_eq!(records[1].keyn(), 0);
        assert_eq!(records[0].name, records[1].name);
    }

    #[test]
    fn split_records_pairs_front_with_spare() {
        let mut records = [
            GlobalRecord::with_keys("g", ["a"]),
            GlobalRecord::with_keys("g", ["b"]),
        ];
        let (prev, cand) = split_records(&mut records, 1);
        assert_eq!(prev.keys.as_slice(), ["b".to_string()]);
        cand.set_last_key("c");
        assert_eq!(records[0].keys.as_slice(), ["c".to_string()]);
    }
}
