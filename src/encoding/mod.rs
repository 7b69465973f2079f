//! # Encoding Module
//!
//! Wire formats owned by the cursor engine, reproduced bit-exactly for
//! interoperability with existing row producers:
//!
//! - **Value-block encoding**: the binary block format SQL row buffers are
//!   built from (length header + sort/kind tag + payload)
//! - **Percent escaping**: the flattened `name=value&...` output format,
//!   safe to embed as a URL-encoded query string

pub mod block;
pub mod escape;

pub use block::{read_block, Block, BlockHeader, DataKind, DataSort, BLOCK_HEADER_LEN};
pub use escape::{append_pair, escape, escape_into, unescape};
