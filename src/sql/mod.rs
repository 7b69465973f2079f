//! # SQL Result Metadata and Row Decoding
//!
//! Statement execution produces a [`SqlResult`]: the ordered column
//! definitions, the remote status pair, and a row position the cursor
//! advances with next/previous. Row buffers come back from the connection as
//! value-block sequences (see [`crate::encoding::block`]) and are decoded
//! here column-by-column.
//!
//! Decoding stops early at an end-of-data or error block: columns past the
//! stopping point are omitted from the decoded row, never zero-filled, so a
//! short row is observable as a short result rather than as fabricated
//! empty values.

use crate::connection::StatementReply;
use crate::encoding::block::{read_block, DataSort};
use crate::error::{CursorError, Result};

/// One column of an executed statement: name plus the declared type when the
/// remote store reported one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlColumn {
    pub name: String,
    pub declared_type: Option<String>,
}

impl SqlColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
        }
    }

    pub fn with_type(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
        }
    }
}

/// Metadata of the most recent statement execution, owned by an SQL-mode
/// cursor. `row_no` is 1-based; 0 means "before the first row".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlResult {
    pub(crate) handle: u64,
    pub columns: Vec<SqlColumn>,
    pub status_code: i32,
    pub status_state: String,
    pub row_no: i64,
}

impl SqlResult {
    pub(crate) fn from_reply(reply: StatementReply) -> Self {
        Self {
            handle: reply.handle,
            columns: reply.columns,
            status_code: reply.status_code,
            status_state: reply.status_state,
            row_no: 0,
        }
    }
}

/// What `execute` reports back to the caller. `columns` is present only when
/// the statement produced no error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub status_code: i32,
    pub status_state: String,
    pub error: Option<String>,
    pub columns: Option<Vec<SqlColumn>>,
}

/// Decodes one row buffer against the declared columns, returning ordered
/// `(column name, value)` pairs. An error-sorted block surfaces its payload
/// as a remote failure.
pub fn decode_row(columns: &[SqlColumn], buf: &[u8]) -> Result<Vec<(String, String)>> {
    let mut row = Vec::with_capacity(columns.len());
    let mut offset = 0;
    for column in columns {
        let Some((block, next)) = read_block(buf, offset)? else {
            break;
        };
        match block.sort {
            DataSort::Eod => break,
            DataSort::Error => {
                let message = String::from_utf8_lossy(block.payload).into_owned();
                return Err(CursorError::malformed(format!(
                    "row stream reported an error: {}",
                    message
                )));
            }
            _ => {
                let value = std::str::from_utf8(block.payload).map_err(|_| {
                    CursorError::malformed(format!(
                        "non-UTF-8 payload in column {:?}",
                        column.name
                    ))
                })?;
                row.push((column.name.clone(), value.to_string()));
                offset = next;
            }
        }
    }
    Ok(row)
}
