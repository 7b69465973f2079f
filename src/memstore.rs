//! # MemStore - In-Process Reference Connection
//!
//! A [`Connection`] implementation backed by an ordered in-memory map. It
//! exists so the cursor engine is usable and testable without a remote
//! store, and it doubles as the executable documentation of the connection
//! contract: every primitive's edge behavior (end markers, counter
//! semantics, staged statement replies) is spelled out here.
//!
//! Subscripts collate byte-lexicographically. An empty subscript is
//! reserved as the order-traversal end marker and should not be stored.
//! Value nodes only: the range walk visits exactly the nodes that hold
//! data, in depth-first key order, from the seed position to the end of the
//! global.
//!
//! ## SQL primitives
//!
//! `MemStore` does not parse SQL. Callers stage result sets with
//! [`MemStore::stage_statement`]; each `execute_statement` consumes the
//! oldest staged entry (FIFO) and serves its rows as value-block buffers.
//! Executing with nothing staged produces a failure reply with the
//! general-error state, the same shape a remote store uses for a malformed
//! statement.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;
use tracing::trace;

use crate::connection::{Connection, Direction, StatementReply};
use crate::encoding::block::{append_block, append_eod, DataKind, DataSort};
use crate::error::{Result, GENERAL_ERROR_STATE};
use crate::record::GlobalRecord;
use crate::sql::SqlColumn;

/// A result set staged for the next `execute_statement` call.
#[derive(Debug, Clone)]
pub struct StagedStatement {
    pub columns: Vec<SqlColumn>,
    /// Row values in column order; `None` encodes SQL NULL.
    pub rows: Vec<Vec<Option<String>>>,
    pub status_code: i32,
    pub status_state: String,
    pub error: Option<String>,
}

impl StagedStatement {
    /// A successful result set.
    pub fn ok(columns: Vec<SqlColumn>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            rows,
            status_code: 0,
            status_state: "00000".to_string(),
            error: None,
        }
    }

    /// A statement-level failure reply.
    pub fn failure(status_code: i32, status_state: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            status_code,
            status_state: status_state.into(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
struct OpenStatement {
    rows: Vec<Vec<Option<String>>>,
}

/// Ordered in-memory global store implementing [`Connection`].
#[derive(Debug, Default)]
pub struct MemStore {
    /// Global name -> subscript path -> value. Only value-holding nodes are
    /// stored; intermediate levels exist implicitly through their children.
    globals: BTreeMap<String, BTreeMap<Vec<String>, String>>,
    staged: VecDeque<StagedStatement>,
    open_statements: HashMap<u64, OpenStatement>,
    next_handle: u64,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            ..Self::default()
        }
    }

    /// Stores `value` at `^global(keys...)`.
    pub fn set(&mut self, global: &str, keys: &[&str], value: &str) {
        let path: Vec<String> = keys.iter().map(|part| part.to_string()).collect();
        self.globals
            .entry(global.to_string())
            .or_default()
            .insert(path, value.to_string());
    }

    /// Removes the node at `keys` and its entire subtree; with no keys,
    /// removes the whole global.
    pub fn kill(&mut self, global: &str, keys: &[&str]) {
        if keys.is_empty() {
            self.globals.remove(global);
            return;
        }
        if let Some(tree) = self.globals.get_mut(global) {
            let prefix: Vec<String> = keys.iter().map(|part| part.to_string()).collect();
            tree.retain(|path, _| {
                path.len() < prefix.len() || path[..prefix.len()] != prefix[..]
            });
            if tree.is_empty() {
                self.globals.remove(global);
            }
        }
    }

    pub fn get(&self, global: &str, keys: &[&str]) -> Option<&str> {
        let path: Vec<String> = keys.iter().map(|part| part.to_string()).collect();
        self.globals.get(global)?.get(&path).map(String::as_str)
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.keys().cloned().collect()
    }

    /// Queues a result set for the next `execute_statement` call.
    pub fn stage_statement(&mut self, staged: StagedStatement) {
        self.staged.push_back(staged);
    }
}

impl Connection for MemStore {
    fn order_next(
        &mut self,
        record: &mut GlobalRecord,
        direction: Direction,
        want_data: bool,
    ) -> Result<()> {
        let depth = record.keyn();
        if depth == 0 {
            return Ok(());
        }
        let Some(tree) = self.globals.get(&record.name) else {
            record.set_last_key("");
            record.data = None;
            return Ok(());
        };
        let parent = &record.keys[..depth - 1];
        let current = record.keys[depth - 1].clone();

        // Siblings at this depth appear in one contiguous, sorted run of
        // the tree; deeper descendants repeat a sibling, so runs of equal
        // values collapse into one candidate.
        let mut found: Option<String> = None;
        let mut in_block = false;
        for path in tree.keys() {
            let matches = path.len() >= depth && path[..depth - 1] == parent[..];
            if !matches {
                if in_block {
                    break;
                }
                continue;
            }
            in_block = true;
            let sibling = &path[depth - 1];
            match direction {
                Direction::Forward => {
                    if *sibling > current {
                        found = Some(sibling.clone());
                        break;
                    }
                }
                Direction::Backward => {
                    // An empty current subscript starts from the top end.
                    if current.is_empty() || *sibling < current {
                        found = Some(sibling.clone());
                    }
                }
            }
        }

        match found {
            Some(sibling) => {
                record.set_last_key(sibling);
                record.data = if want_data {
                    tree.get(&record.keys.to_vec()).cloned()
                } else {
                    None
                };
            }
            None => {
                record.set_last_key("");
                record.data = None;
            }
        }
        Ok(())
    }

    fn range_query_step(
        &mut self,
        prev: &GlobalRecord,
        next: &mut GlobalRecord,
        direction: Direction,
        want_data: bool,
    ) -> Result<bool> {
        use std::ops::Bound;

        let Some(tree) = self.globals.get(&prev.name) else {
            return Ok(false);
        };
        let position = prev.keys.to_vec();
        let found = match direction {
            Direction::Forward => tree
                .range((Bound::Excluded(position), Bound::Unbounded))
                .next(),
            Direction::Backward => {
                if position.is_empty() {
                    tree.iter().next_back()
                } else {
                    tree.range((Bound::Unbounded, Bound::Excluded(position)))
                        .next_back()
                }
            }
        };
        match found {
            None => Ok(false),
            Some((path, value)) => {
                next.name.clone_from(&prev.name);
                next.set_position(path.iter().cloned());
                next.data = want_data.then(|| value.clone());
                Ok(true)
            }
        }
    }

    fn directory_step(&mut self, counter: &mut u64, direction: Direction) -> Result<Option<String>> {
        let len = self.globals.len() as u64;
        match direction {
            Direction::Forward => {
                let index = *counter;
                if index >= len {
                    return Ok(None);
                }
                *counter = index + 1;
                Ok(self.globals.keys().nth(index as usize).cloned())
            }
            Direction::Backward => {
                let index = (*counter).min(len);
                if index == 0 {
                    return Ok(None);
                }
                *counter = index - 1;
                Ok(self.globals.keys().nth(index as usize - 1).cloned())
            }
        }
    }

    fn execute_statement(&mut self, statement: &str, _params: &[&str]) -> Result<StatementReply> {
        match self.staged.pop_front() {
            Some(staged) => {
                trace!(statement, "serving staged statement result");
                if let Some(error) = staged.error {
                    return Ok(StatementReply {
                        handle: 0,
                        columns: Vec::new(),
                        status_code: staged.status_code,
                        status_state: staged.status_state,
                        error: Some(error),
                    });
                }
                let handle = self.next_handle;
                self.next_handle += 1;
                self.open_statements
                    .insert(handle, OpenStatement { rows: staged.rows });
                Ok(StatementReply {
                    handle,
                    columns: staged.columns,
                    status_code: staged.status_code,
                    status_state: staged.status_state,
                    error: None,
                })
            }
            None => Ok(StatementReply {
                handle: 0,
                columns: Vec::new(),
                status_code: -1,
                status_state: GENERAL_ERROR_STATE.to_string(),
                error: Some(format!("no result staged for statement: {}", statement)),
            }),
        }
    }

    fn cleanup_statement(&mut self, handle: u64) -> Result<String> {
        match self.open_statements.remove(&handle) {
            Some(_) => Ok(format!("statement {} released", handle)),
            None => Ok("no open statement".to_string()),
        }
    }

    fn sql_row(&mut self, handle: u64, row_no: i64, _direction: Direction) -> Result<Option<Vec<u8>>> {
        let Some(statement) = self.open_statements.get(&handle) else {
            return Ok(None);
        };
        if row_no < 1 || row_no as usize > statement.rows.len() {
            return Ok(None);
        }
        let row = &statement.rows[row_no as usize - 1];
        let mut buf = Vec::new();
        for value in row {
            match value {
                Some(text) => append_block(&mut buf, DataSort::Data, DataKind::Str, text.as_bytes()),
                None => append_block(&mut buf, DataSort::Data, DataKind::Null, &[]),
            }
        }
        append_eod(&mut buf);
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemStore {
        let mut store = MemStore::new();
        store.set("customer", &["1"], "Smith");
        store.set("customer", &["2"], "Jones");
        store.set("customer", &["2", "addr"], "London");
        store.set("customer", &["3"], "Brown");
        store.set("order", &["9"], "pending");
        store
    }

    #[test]
    fn order_walks_siblings_forward_from_empty() {
        let mut store = seeded();
        let mut rec = GlobalRecord::with_keys("customer", [""]);

        let mut seen = Vec::new();
        loop {
            store.order_next(&mut rec, Direction::Forward, false).unwrap();
            match rec.last_key() {
                Some("") | None => break,
                Some(part) => seen.push(part.to_string()),
            }
        }
        assert_eq!(seen, ["1", "2", "3"]);
    }

    #[test]
    fn order_backward_from_empty_starts_at_the_end() {
        let mut store = seeded();
        let mut rec = GlobalRecord::with_keys("customer", [""]);
        store.order_next(&mut rec, Direction::Backward, false).unwrap();
        assert_eq!(rec.last_key(), Some("3"));
    }

    #[test]
    fn order_collapses_deeper_descendants_into_one_sibling() {
        let mut store = seeded();
        let mut rec = GlobalRecord::with_keys("customer", ["1"]);
        store.order_next(&mut rec, Direction::Forward, true).unwrap();
        assert_eq!(rec.last_key(), Some("2"));
        assert_eq!(rec.data.as_deref(), Some("Jones"));

        store.order_next(&mut rec, Direction::Forward, true).unwrap();
        assert_eq!(rec.last_key(), Some("3"));
    }

    #[test]
    fn order_at_second_level_sees_only_children() {
        let mut store = seeded();
        let mut rec = GlobalRecord::with_keys("customer", ["2", ""]);
        store.order_next(&mut rec, Direction::Forward, false).unwrap();
        assert_eq!(rec.last_key(), Some("addr"));
        store.order_next(&mut rec, Direction::Forward, false).unwrap();
        assert_eq!(rec.last_key(), Some(""));
    }

    #[test]
    fn order_on_missing_global_ends_immediately() {
        let mut store = seeded();
        let mut rec = GlobalRecord::with_keys("missing", [""]);
        store.order_next(&mut rec, Direction::Forward, false).unwrap();
        assert_eq!(rec.last_key(), Some(""));
    }

    #[test]
    fn range_walk_visits_value_nodes_depth_first() {
        let mut store = seeded();
        let prev = GlobalRecord::new("customer");
        let mut next = GlobalRecord::new("customer");

        let mut seen = Vec::new();
        let mut position = prev;
        while store
            .range_query_step(&position, &mut next, Direction::Forward, true)
            .unwrap()
        {
            seen.push((next.keys.to_vec(), next.data.clone().unwrap()));
            std::mem::swap(&mut position, &mut next);
        }
        assert_eq!(
            seen,
            vec![
                (vec!["1".to_string()], "Smith".to_string()),
                (vec!["2".to_string()], "Jones".to_string()),
                (vec!["2".to_string(), "addr".to_string()], "London".to_string()),
                (vec!["3".to_string()], "Brown".to_string()),
            ]
        );
    }

    #[test]
    fn range_backward_from_empty_seed_starts_at_the_last_node() {
        let mut store = seeded();
        let prev = GlobalRecord::new("customer");
        let mut next = GlobalRecord::new("customer");
        let found = store
            .range_query_step(&prev, &mut next, Direction::Backward, false)
            .unwrap();
        assert!(found);
        assert_eq!(next.keys.as_slice(), ["3".to_string()]);
    }

    #[test]
    fn directory_counter_walks_names_both_ways() {
        let mut store = seeded();
        let mut counter = 0;
        assert_eq!(
            store.directory_step(&mut counter, Direction::Forward).unwrap(),
            Some("customer".to_string())
        );
        assert_eq!(
            store.directory_step(&mut counter, Direction::Forward).unwrap(),
            Some("order".to_string())
        );
        assert_eq!(store.directory_step(&mut counter, Direction::Forward).unwrap(), None);

        assert_eq!(
            store.directory_step(&mut counter, Direction::Backward).unwrap(),
            Some("order".to_string())
        );
        assert_eq!(
            store.directory_step(&mut counter, Direction::Backward).unwrap(),
            Some("customer".to_string())
        );
        assert_eq!(store.directory_step(&mut counter, Direction::Backward).unwrap(), None);
    }

    #[test]
    fn kill_removes_the_subtree() {
        let mut store = seeded();
        store.kill("customer", &["2"]);
        assert_eq!(store.get("customer", &["2"]), None);
        assert_eq!(store.get("customer", &["2", "addr"]), None);
        assert_eq!(store.get("customer", &["1"]), Some("Smith"));
    }

    #[test]
    fn kill_without_keys_drops_the_global_from_the_directory() {
        let mut store = seeded();
        store.kill("order", &[]);
        assert_eq!(store.global_names(), ["customer"]);
    }

    #[test]
    fn execute_with_nothing_staged_is_a_failure_reply() {
        let mut store = seeded();
        let reply = store.execute_statement("SELECT 1", &[]).unwrap();
        assert_eq!(reply.status_code, -1);
        assert_eq!(reply.status_state, GENERAL_ERROR_STATE);
        assert!(reply.error.is_some());
        assert!(reply.columns.is_empty());
    }

    #[test]
    fn staged_rows_come_back_as_block_buffers() {
        let mut store = seeded();
        store.stage_statement(StagedStatement::ok(
            vec![SqlColumn::new("id"), SqlColumn::new("name")],
            vec![vec![Some("1".to_string()), None]],
        ));
        let reply = store.execute_statement("SELECT id, name FROM t", &[]).unwrap();
        assert_eq!(reply.status_code, 0);

        let buf = store.sql_row(reply.handle, 1, Direction::Forward).unwrap().unwrap();
        let (first, next) = crate::encoding::read_block(&buf, 0).unwrap().unwrap();
        assert_eq!(first.payload, b"1");
        let (second, _) = crate::encoding::read_block(&buf, next).unwrap().unwrap();
        assert_eq!(second.kind, Some(DataKind::Null));
        assert!(second.payload.is_empty());

        assert_eq!(store.sql_row(reply.handle, 2, Direction::Forward).unwrap(), None);
        assert_eq!(store.sql_row(reply.handle, 0, Direction::Forward).unwrap(), None);
    }

    #[test]
    fn cleanup_releases_the_handle() {
        let mut store = seeded();
        store.stage_statement(StagedStatement::ok(vec![SqlColumn::new("id")], vec![]));
        let reply = store.execute_statement("SELECT id FROM t", &[]).unwrap();
        let status = store.cleanup_statement(reply.handle).unwrap();
        assert!(status.contains("released"));
        assert_eq!(store.sql_row(reply.handle, 1, Direction::Forward).unwrap(), None);
        assert_eq!(store.cleanup_statement(reply.handle).unwrap(), "no open statement");
    }
}
