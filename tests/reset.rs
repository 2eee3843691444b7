use rusqlite::Connection;
use tempfile::tempdir;

use school_manager::bridge::contract::Request;
use school_manager::db::{fetch_classes, fetch_students};
use school_manager::error::{ResetStep, StoreError};
use school_manager::{Router, Store};

/// `(type, name, sql)` for every schema object, in a stable order.
fn schema(conn: &Connection) -> Vec<(String, String, Option<String>)> {
    let mut stmt = conn
        .prepare(
            "SELECT type, name, sql FROM sqlite_master
             WHERE name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
             ORDER BY type, name",
        )
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

fn seed(router: &mut Router) {
    let requests = [
        Request::from_parts("add-class", serde_json::json!({ "name": "Grade 1", "class_fees": 10 })),
        Request::from_parts(
            "add-student",
            serde_json::json!({ "name": "Ada", "surname": "Lovelace", "classId": 1 }),
        ),
        Request::from_parts(
            "add-employee",
            serde_json::json!({ "name": "Grace", "surname": "Hopper", "role": "Teacher" }),
        ),
        Request::from_parts(
            "make-payment",
            serde_json::json!({ "title": "Tuition Fee", "amount_paid": 5, "student_id": 1 }),
        ),
    ];
    for request in requests {
        router.handle(request.unwrap()).unwrap();
    }
}

#[test]
fn reset_rebuilds_an_identical_empty_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("school.sqlite");
    let mut store = Store::open(&path).unwrap();
    let fresh = schema(store.connection());

    let mut router = Router::new(store);
    seed(&mut router);
    router.reset_database().unwrap();
    let after_first = schema(router.store().connection());

    seed(&mut router);
    let message = router.reset_database().unwrap();
    assert_eq!(message.message, "Database reset successfully.");
    let after_second = schema(router.store().connection());

    assert_eq!(fresh, after_first);
    assert_eq!(after_first, after_second);

    let conn = router.store().connection();
    for table in ["students", "employees", "classes", "student_payments"] {
        assert_eq!(count(conn, table), 0, "{table} should be empty");
    }

    // Autoincrement counters start over.
    seed(&mut router);
    let conn = router.store().connection();
    assert_eq!(fetch_classes(conn).unwrap()[0].id, 1);
    assert_eq!(fetch_students(conn).unwrap()[0].id, 1);

    router.shutdown().unwrap();
    store = Store::open(&path).unwrap();
    assert_eq!(count(store.connection(), "students"), 1);
    store.close().unwrap();
}

#[test]
fn reset_keeps_foreign_keys_enforced() {
    let dir = tempdir().unwrap();
    let mut store = Store::open(dir.path().join("school.sqlite")).unwrap();
    store.reset().unwrap();

    let enabled: i64 = store
        .connection()
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = store
        .connection()
        .execute("INSERT INTO students (name, surname, class_id) VALUES ('A', 'B', 9)", [])
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"), "{err}");
}

#[test]
fn in_memory_stores_reset_in_place() {
    let mut router = Router::new(Store::open_in_memory().unwrap());
    seed(&mut router);
    router.reset_database().unwrap();

    let conn = router.store().connection();
    assert_eq!(count(conn, "students"), 0);
    assert_eq!(count(conn, "classes"), 0);

    seed(&mut router);
    assert_eq!(router.get_students().unwrap().students.len(), 1);
}

#[test]
fn extra_tables_are_dropped_on_reset() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .connection()
        .execute_batch("CREATE TABLE scratch (id INTEGER PRIMARY KEY)")
        .unwrap();
    store.reset().unwrap();

    let names: Vec<String> = schema(store.connection())
        .into_iter()
        .filter(|(kind, _, _)| kind == "table")
        .map(|(_, name, _)| name)
        .collect();
    assert_eq!(
        names,
        vec!["classes", "employees", "student_payments", "students"]
    );
}

#[test]
fn failed_resets_name_their_step_and_keep_the_data() {
    let mut router = Router::new(Store::open_in_memory().unwrap());
    seed(&mut router);
    // A view squatting on an index name survives the table drops and makes
    // the schema script fail.
    router
        .store()
        .connection()
        .execute_batch(
            "DROP INDEX idx_students_class_id;
             CREATE VIEW idx_students_class_id AS SELECT 1;",
        )
        .unwrap();

    let response = router.dispatch_value(serde_json::json!({ "operation": "reset-database" }));
    assert_eq!(response["success"], false);
    let error = response["error"].as_str().unwrap();
    assert!(error.starts_with("reset failed while applying schema"), "{error}");

    let conn = router.store().connection();
    assert_eq!(count(conn, "students"), 1);
    assert_eq!(count(conn, "student_payments"), 1);
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn reset_errors_carry_the_failing_step() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .connection()
        .execute_batch(
            "DROP INDEX idx_student_payments_student_id;
             CREATE VIEW idx_student_payments_student_id AS SELECT 1;",
        )
        .unwrap();

    match store.reset() {
        Err(StoreError::Reset { step, .. }) => assert_eq!(step, ResetStep::ApplySchema),
        other => panic!("expected a reset failure, got {other:?}"),
    }
}
