//! # Integration Tests for SQL Row Traversal
//!
//! Exercises the SQL cursor mode end-to-end: statement execution, row
//! iteration in both directions, value-block decoding edge cases, and
//! statement cleanup.

use mgx::{
    shared, Cursor, CursorError, CursorSpec, MemStore, SharedConnection, SqlColumn,
    StagedStatement, StepOutput,
};

fn staged_connection() -> SharedConnection<MemStore> {
    let mut store = MemStore::new();
    store.stage_statement(StagedStatement::ok(
        vec![
            SqlColumn::with_type("id", "INTEGER"),
            SqlColumn::with_type("name", "VARCHAR"),
        ],
        vec![
            vec![Some("1".to_string()), Some("bob".to_string())],
            vec![Some("2".to_string()), Some("alice".to_string())],
        ],
    ));
    shared(store)
}

fn row(output: Option<StepOutput>) -> Vec<(String, String)> {
    match output {
        Some(StepOutput::Row(pairs)) => pairs,
        other => panic!("expected a row, got {:?}", other),
    }
}

#[test]
fn execute_reports_columns_and_status() {
    let conn = staged_connection();
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();

    let summary = cursor.execute("SELECT id, name FROM customer", &[]).unwrap();
    assert_eq!(summary.status_code, 0);
    assert_eq!(summary.status_state, "00000");
    assert_eq!(summary.error, None);

    let columns = summary.columns.unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[0].declared_type.as_deref(), Some("INTEGER"));
    assert_eq!(columns[1].name, "name");
}

#[test]
fn rows_decode_column_by_column() {
    let conn = staged_connection();
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();
    cursor.execute("SELECT id, name FROM customer", &[]).unwrap();

    assert_eq!(
        row(cursor.next().unwrap()),
        vec![
            ("id".to_string(), "1".to_string()),
            ("name".to_string(), "bob".to_string()),
        ]
    );
    assert_eq!(
        row(cursor.next().unwrap()),
        vec![
            ("id".to_string(), "2".to_string()),
            ("name".to_string(), "alice".to_string()),
        ]
    );
    assert_eq!(cursor.next().unwrap(), None);
}

#[test]
fn previous_steps_back_through_fetched_rows() {
    let conn = staged_connection();
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();
    cursor.execute("SELECT id, name FROM customer", &[]).unwrap();

    while cursor.next().unwrap().is_some() {}

    // The failed advance did not move the row position, so stepping back
    // revisits everything before the last row, then hits the front edge.
    let back = row(cursor.previous().unwrap());
    assert_eq!(back[0].1, "1");
    assert_eq!(cursor.previous().unwrap(), None);
}

#[test]
fn next_without_execute_is_exhausted_not_an_error() {
    let conn = staged_connection();
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();
    assert_eq!(cursor.next().unwrap(), None);
    assert_eq!(cursor.previous().unwrap(), None);
}

#[test]
fn null_column_arrives_as_an_empty_value() {
    let mut store = MemStore::new();
    store.stage_statement(StagedStatement::ok(
        vec![SqlColumn::new("id"), SqlColumn::new("nickname")],
        vec![vec![Some("1".to_string()), None]],
    ));
    let conn = shared(store);
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();
    cursor.execute("SELECT id, nickname FROM t", &[]).unwrap();

    let pairs = row(cursor.next().unwrap());
    assert_eq!(pairs[1], ("nickname".to_string(), String::new()));
}

#[test]
fn failed_execution_surfaces_the_remote_status() {
    let mut store = MemStore::new();
    store.stage_statement(StagedStatement::failure(-76, "42000", "syntax error near FROM"));
    let conn = shared(store);
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();

    let summary = cursor.execute("SELEC id FROM t", &[]).unwrap();
    assert_eq!(summary.status_code, -76);
    assert_eq!(summary.status_state, "42000");
    assert_eq!(summary.error.as_deref(), Some("syntax error near FROM"));
    assert_eq!(summary.columns, None);

    // A failed statement has no rows to iterate.
    assert_eq!(cursor.next().unwrap(), None);
}

#[test]
fn execute_with_nothing_staged_reports_the_general_error_state() {
    let conn = shared(MemStore::new());
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();
    let summary = cursor.execute("SELECT 1", &[]).unwrap();
    assert_eq!(summary.status_code, -1);
    assert_eq!(summary.status_state, "HY000");
    assert!(summary.error.is_some());
}

#[test]
fn execute_outside_sql_mode_is_invalid() {
    let mut store = MemStore::new();
    store.set("customer", &["1"], "x");
    let conn = shared(store);
    let mut cursor = Cursor::open(conn, CursorSpec::global_order("customer", [""])).unwrap();
    let err = cursor.execute("SELECT 1", &[]).unwrap_err();
    assert!(matches!(err, CursorError::InvalidArgument(_)));
}

#[test]
fn empty_statement_is_rejected_before_any_io() {
    let conn = staged_connection();
    let mut cursor = Cursor::open(conn.clone(), CursorSpec::sql()).unwrap();
    let err = cursor.execute("   ", &[]).unwrap_err();
    assert!(matches!(err, CursorError::InvalidArgument(_)));

    // The staged result was not consumed by the rejected call.
    let summary = cursor.execute("SELECT id, name FROM customer", &[]).unwrap();
    assert_eq!(summary.status_code, 0);
}

#[test]
fn re_execute_replaces_the_previous_result() {
    let mut store = MemStore::new();
    store.stage_statement(StagedStatement::ok(
        vec![SqlColumn::new("a")],
        vec![vec![Some("first".to_string())]],
    ));
    store.stage_statement(StagedStatement::ok(
        vec![SqlColumn::new("b")],
        vec![vec![Some("second".to_string())]],
    ));
    let conn = shared(store);
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();

    cursor.execute("SELECT a FROM t1", &[]).unwrap();
    assert_eq!(row(cursor.next().unwrap())[0].1, "first");

    cursor.execute("SELECT b FROM t2", &[]).unwrap();
    // Position restarts before the first row of the new result.
    assert_eq!(
        row(cursor.next().unwrap()),
        vec![("b".to_string(), "second".to_string())]
    );
}

#[test]
fn cleanup_releases_and_reports_idempotently() {
    let conn = staged_connection();
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();
    cursor.execute("SELECT id, name FROM customer", &[]).unwrap();

    let status = cursor.cleanup().unwrap();
    assert!(status.contains("released"), "status: {}", status);

    // Metadata is gone: iteration is exhausted, cleanup has nothing left.
    assert_eq!(cursor.next().unwrap(), None);
    assert_eq!(cursor.cleanup().unwrap(), "no statement to release");
}

#[test]
fn sql_result_exposes_row_position() {
    let conn = staged_connection();
    let mut cursor = Cursor::open(conn, CursorSpec::sql()).unwrap();
    cursor.execute("SELECT id, name FROM customer", &[]).unwrap();
    assert_eq!(cursor.sql_result().unwrap().row_no, 0);

    cursor.next().unwrap();
    assert_eq!(cursor.sql_result().unwrap().row_no, 1);

    cursor.next().unwrap();
    cursor.next().unwrap(); // failed advance keeps the position
    assert_eq!(cursor.sql_result().unwrap().row_no, 2);
}
