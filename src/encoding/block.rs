//! # Value-Block Codec
//!
//! SQL row buffers are a contiguous sequence of value blocks. Each block is
//! a fixed 5-byte header followed by exactly `len` payload bytes:
//!
//! ```text
//! ┌────────────────────┬─────────┬──────────────┐
//! │ len: u32 (LE)      │ tag: u8 │ payload      │
//! └────────────────────┴─────────┴──────────────┘
//! ```
//!
//! The tag combines a *sort* (what role the value plays in the stream) and a
//! *kind* (the value's declared type) as `tag = sort * 20 + kind`. Both are
//! decoded exactly once, at the block boundary; downstream code matches on
//! the enums, never on raw bytes.
//!
//! A row buffer normally carries one `Data`-sorted block per column and ends
//! with an `Eod` block. An `Error`-sorted block carries a remote error
//! message as its payload and terminates the row. This layout must be
//! preserved bit-exactly: existing row producers emit it on the wire.

use zerocopy::{
    byteorder::{LittleEndian, U32},
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
};

use crate::error::{CursorError, Result};

pub const BLOCK_HEADER_LEN: usize = 5;

/// Role of a block within a row stream. Unknown bytes decode as `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSort {
    Invalid,
    Data,
    Subscript,
    Global,
    Eod,
    Status,
    Error,
}

impl DataSort {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => DataSort::Data,
            2 => DataSort::Subscript,
            3 => DataSort::Global,
            9 => DataSort::Eod,
            10 => DataSort::Status,
            11 => DataSort::Error,
            _ => DataSort::Invalid,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            DataSort::Invalid => 0,
            DataSort::Data => 1,
            DataSort::Subscript => 2,
            DataSort::Global => 3,
            DataSort::Eod => 9,
            DataSort::Status => 10,
            DataSort::Error => 11,
        }
    }

    /// Sorts that terminate row decoding.
    pub fn is_terminal(self) -> bool {
        matches!(self, DataSort::Eod | DataSort::Error)
    }
}

/// Declared type of a block's payload. The payload itself is always the
/// textual value bytes; the kind is preserved for consumers that interpret
/// numerics, not acted on here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Str,
    Int,
    Int64,
    Double,
    Oref,
    Null,
}

impl DataKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(DataKind::Str),
            4 => Some(DataKind::Int),
            5 => Some(DataKind::Int64),
            6 => Some(DataKind::Double),
            7 => Some(DataKind::Oref),
            10 => Some(DataKind::Null),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            DataKind::Str => 1,
            DataKind::Int => 4,
            DataKind::Int64 => 5,
            DataKind::Double => 6,
            DataKind::Oref => 7,
            DataKind::Null => 10,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct BlockHeader {
    len: U32<LittleEndian>,
    tag: u8,
}

impl BlockHeader {
    pub fn new(len: u32, sort: DataSort, kind: DataKind) -> Self {
        Self {
            len: U32::new(len),
            tag: sort.as_byte() * 20 + kind.as_byte(),
        }
    }

    pub fn len(&self) -> u32 {
        self.len.get()
    }

    pub fn sort(&self) -> DataSort {
        DataSort::from_byte(self.tag / 20)
    }

    pub fn kind(&self) -> Option<DataKind> {
        DataKind::from_byte(self.tag % 20)
    }
}

/// One decoded block borrowing its payload from the row buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub sort: DataSort,
    pub kind: Option<DataKind>,
    pub payload: &'a [u8],
}

/// Appends one block to a row buffer under construction.
pub fn append_block(buf: &mut Vec<u8>, sort: DataSort, kind: DataKind, payload: &[u8]) {
    let header = BlockHeader::new(payload.len() as u32, sort, kind);
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(payload);
}

/// Appends the end-of-data terminator block.
pub fn append_eod(buf: &mut Vec<u8>) {
    append_block(buf, DataSort::Eod, DataKind::Str, &[]);
}

/// Reads the block starting at `offset`. Returns the block and the offset of
/// the next one, or `None` when `offset` sits exactly at the buffer's end.
/// A partial header or a payload overrunning the buffer is a remote decode
/// failure, never a panic.
pub fn read_block(buf: &[u8], offset: usize) -> Result<Option<(Block<'_>, usize)>> {
    if offset == buf.len() {
        return Ok(None);
    }
    if offset > buf.len() || buf.len() - offset < BLOCK_HEADER_LEN {
        return Err(CursorError::malformed(format!(
            "truncated block header at offset {} of {}-byte row buffer",
            offset,
            buf.len()
        )));
    }
    let header = BlockHeader::read_from_bytes(&buf[offset..offset + BLOCK_HEADER_LEN])
        .map_err(|_| CursorError::malformed("unreadable block header"))?;
    let payload_start = offset + BLOCK_HEADER_LEN;
    let payload_len = header.len() as usize;
    if buf.len() - payload_start < payload_len {
        return Err(CursorError::malformed(format!(
            "block payload of {} bytes overruns row buffer ({} remaining)",
            payload_len,
            buf.len() - payload_start
        )));
    }
    let block = Block {
        sort: header.sort(),
        kind: header.kind(),
        payload: &buf[payload_start..payload_start + payload_len],
    };
    Ok(Some((block, payload_start + payload_len)))
}
