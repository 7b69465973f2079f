//! # mgx - Cursor Engine for Hierarchical Global Storage
//!
//! mgx is the client-side traversal core for a hierarchical, persistent
//! key-value store ("globals") with an embedded SQL layer. A caller opens a
//! [`Cursor`] over one of four data shapes and steps through results
//! forward or backward without re-issuing the full query each time:
//!
//! - the ordered subscripts of a single global
//! - a multi-key range query over a global's records
//! - the namespace's list of global names
//! - the rows of an executed SQL statement
//!
//! ## Quick Start
//!
//! ```
//! use mgx::{shared, Cursor, CursorSpec, MemStore, StepOutput};
//!
//! let mut store = MemStore::new();
//! store.set("customer", &["1"], "Smith");
//! store.set("customer", &["2"], "Jones");
//!
//! let conn = shared(store);
//! let mut cursor = Cursor::open(conn, CursorSpec::global_order("customer", [""]))?;
//!
//! assert_eq!(cursor.next()?, Some(StepOutput::Value("1".to_string())));
//! assert_eq!(cursor.next()?, Some(StepOutput::Value("2".to_string())));
//! assert_eq!(cursor.next()?, None); // end of data, not an error
//! # Ok::<(), mgx::CursorError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Cursor (state machine)          │
//! │   GlobalOrder │ Range │ Directory │ Sql      │
//! ├──────────────────────┬──────────────────────┤
//! │  render (Structured/ │  sql (row decode,    │
//! │  Flattened output)   │  result metadata)    │
//! ├──────────────────────┴──────────────────────┤
//! │  encoding (value blocks, percent escaping)   │
//! ├─────────────────────────────────────────────┤
//! │  Connection trait  ←  MemStore / remote impl │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The transport behind the [`Connection`] trait is out of scope: a remote
//! implementation performs network or shared-memory calls, while the
//! bundled [`MemStore`] serves an ordered in-memory map for embedding,
//! demos, and tests.
//!
//! ## Synchronous only
//!
//! Cursor steps never split across a suspension point and never accept
//! deferred completion: cursor state (the double-buffered range records,
//! the SQL row position, the directory counter) is not safe to mutate
//! concurrently with another in-flight step. See [`cursor::CallMode`].
//!
//! ## Module Overview
//!
//! - [`cursor`]: the traversal state machine and output rendering
//! - [`connection`]: the external-collaborator contract and sharing
//! - [`encoding`]: the value-block and percent-escape wire formats
//! - [`sql`]: SQL result metadata and row decoding
//! - [`record`]: the in-place-mutated traversal position
//! - [`memstore`]: the in-process reference connection
//! - [`buffer`]: the reusable output buffer

pub mod buffer;
pub mod connection;
pub mod cursor;
pub mod encoding;
pub mod error;
pub mod memstore;
pub mod record;
pub mod sql;

pub use connection::{shared, Connection, Direction, SharedConnection, StatementReply};
pub use cursor::{CallMode, Cursor, CursorSpec, OutputFormat, StepOutput};
pub use error::CursorError;
pub use memstore::{MemStore, StagedStatement};
pub use record::GlobalRecord;
pub use sql::{ExecuteSummary, SqlColumn, SqlResult};
