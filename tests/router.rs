use serde_json::{json, Value};

use school_manager::error::NOT_FOUND_MESSAGE;
use school_manager::{Router, Store};

fn router() -> Router {
    Router::new(Store::open_in_memory().unwrap())
}

fn run(router: &mut Router, operation: &str, args: Value) -> Value {
    let mut request = json!({ "operation": operation });
    if !args.is_null() {
        request["args"] = args;
    }
    router.dispatch_value(request)
}

/// Run an operation that must succeed and return its envelope.
fn ok(router: &mut Router, operation: &str, args: Value) -> Value {
    let response = run(router, operation, args);
    assert_eq!(response["success"], true, "{operation} failed: {response}");
    response
}

fn failure(router: &mut Router, operation: &str, args: Value) -> String {
    let response = run(router, operation, args);
    assert_eq!(response["success"], false, "{operation} succeeded: {response}");
    response["error"].as_str().unwrap().to_string()
}

fn add_class(router: &mut Router, name: &str, fees: f64) -> i64 {
    ok(router, "add-class", json!({ "name": name, "class_fees": fees }))["insertedId"]
        .as_i64()
        .unwrap()
}

fn add_student(router: &mut Router, name: &str, class_id: Option<i64>, fee: f64) -> i64 {
    ok(
        router,
        "add-student",
        json!({
            "name": name,
            "surname": "Test",
            "classId": class_id,
            "schoolFee": fee,
        }),
    )["id"]
        .as_i64()
        .unwrap()
}

fn pay(router: &mut Router, student_id: i64, title: &str, amount: f64) -> i64 {
    ok(
        router,
        "make-payment",
        json!({
            "title": title,
            "amount_paid": amount,
            "payment_date": "2024-03-01",
            "student_id": student_id,
        }),
    )["insertedId"]
        .as_i64()
        .unwrap()
}

fn student(router: &mut Router, id: i64) -> Value {
    let students = ok(router, "get-students", Value::Null)["students"].clone();
    students
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == id)
        .cloned()
        .unwrap_or_else(|| panic!("student {id} missing from {students}"))
}

#[test]
fn added_students_come_back_from_get_students() {
    let mut router = router();
    let class_id = add_class(&mut router, "Grade 1", 50000.0);
    let id = add_student(&mut router, "Ada", Some(class_id), 50000.0);

    let row = student(&mut router, id);
    assert_eq!(row["name"], "Ada");
    assert_eq!(row["classId"], class_id);
    assert_eq!(row["className"], "Grade 1");
    assert_eq!(row["paidFee"], 0.0);
}

#[test]
fn class_fee_changes_cascade_to_enrolled_students() {
    let mut router = router();
    let grade_one = add_class(&mut router, "Grade 1", 50000.0);
    let grade_two = add_class(&mut router, "Grade 2", 70000.0);
    let enrolled = add_student(&mut router, "Ada", Some(grade_one), 50000.0);
    let other = add_student(&mut router, "Alan", Some(grade_two), 70000.0);

    let response = ok(
        &mut router,
        "update-class",
        json!({ "id": grade_one, "name": "Grade 1", "class_fees": 60000 }),
    );
    assert_eq!(response["updatedId"], grade_one);

    assert_eq!(student(&mut router, enrolled)["schoolFee"], 60000.0);
    assert_eq!(student(&mut router, other)["schoolFee"], 70000.0);
}

#[test]
fn tuition_payments_accumulate_in_paid_fee() {
    let mut router = router();
    let id = add_student(&mut router, "Ada", None, 50000.0);

    pay(&mut router, id, "Tuition Fee", 10000.0);
    assert_eq!(student(&mut router, id)["paidFee"], 10000.0);
    pay(&mut router, id, "tuition fee", 10000.0);
    assert_eq!(student(&mut router, id)["paidFee"], 20000.0);

    let payments = ok(&mut router, "get-payments", json!({ "student_id": id }));
    assert_eq!(payments["payments"].as_array().unwrap().len(), 2);
}

#[test]
fn other_payment_titles_leave_paid_fee_alone() {
    let mut router = router();
    let id = add_student(&mut router, "Ada", None, 50000.0);

    pay(&mut router, id, "Transport", 3000.0);
    pay(&mut router, id, "Tuition Fees", 3000.0);
    assert_eq!(student(&mut router, id)["paidFee"], 0.0);

    let all = ok(&mut router, "get-all-payments", Value::Null);
    assert_eq!(all["payments"].as_array().unwrap().len(), 2);
}

#[test]
fn the_add_payment_alias_records_a_payment() {
    let mut router = router();
    let id = add_student(&mut router, "Ada", None, 100.0);
    ok(
        &mut router,
        "add-payment",
        json!({ "title": "Tuition Fee", "amount_paid": "40", "student_id": id.to_string() }),
    );
    assert_eq!(student(&mut router, id)["paidFee"], 40.0);
}

#[test]
fn deleting_missing_records_reports_not_found() {
    let mut router = router();
    for operation in ["delete-student", "delete-employee", "delete-class"] {
        let error = failure(&mut router, operation, json!({ "id": 99 }));
        assert_eq!(error, NOT_FOUND_MESSAGE, "{operation}");
    }

    let error = failure(
        &mut router,
        "update-employee",
        json!({ "id": 99, "name": "Grace", "surname": "Hopper", "role": "Teacher" }),
    );
    assert_eq!(error, NOT_FOUND_MESSAGE);
}

#[test]
fn deletes_report_their_success_message() {
    let mut router = router();
    let id = add_student(&mut router, "Ada", None, 0.0);
    let response = ok(&mut router, "delete-student", json!({ "id": id }));
    assert_eq!(response["message"], "Student deleted successfully.");

    let employee = ok(
        &mut router,
        "add-employee",
        json!({ "name": "Grace", "surname": "Hopper", "role": "Teacher", "salary": "1500" }),
    )["id"]
        .as_i64()
        .unwrap();
    let response = ok(&mut router, "delete-employee", json!({ "id": employee }));
    assert_eq!(response["message"], "Employee deleted successfully.");
    let employees = ok(&mut router, "get-employees", Value::Null);
    assert!(employees["employees"].as_array().unwrap().is_empty());
}

#[test]
fn unknown_class_ids_violate_the_foreign_key() {
    let mut router = router();
    let error = failure(
        &mut router,
        "add-student",
        json!({ "name": "Ada", "surname": "Lovelace", "classId": 42 }),
    );
    assert!(error.contains("FOREIGN KEY constraint failed"), "{error}");

    let students = ok(&mut router, "get-students", Value::Null);
    assert!(students["students"].as_array().unwrap().is_empty());
}

#[test]
fn payments_for_missing_students_are_not_recorded() {
    let mut router = router();
    let error = failure(
        &mut router,
        "make-payment",
        json!({ "title": "Tuition Fee", "amount_paid": 100, "student_id": 7 }),
    );
    assert_eq!(error, NOT_FOUND_MESSAGE);

    let all = ok(&mut router, "get-all-payments", Value::Null);
    assert!(all["payments"].as_array().unwrap().is_empty());
}

/// Make every later write to `students` abort inside SQLite.
fn lock_students(router: &Router) {
    router
        .store()
        .connection()
        .execute_batch(
            "CREATE TRIGGER lock_students BEFORE UPDATE ON students
             BEGIN SELECT RAISE(ABORT, 'students are locked'); END;",
        )
        .unwrap();
}

#[test]
fn failed_fee_cascades_leave_the_class_untouched() {
    let mut router = router();
    let class_id = add_class(&mut router, "Grade 1", 50000.0);
    let id = add_student(&mut router, "Ada", Some(class_id), 50000.0);
    lock_students(&router);

    let error = failure(
        &mut router,
        "update-class",
        json!({ "id": class_id, "name": "Grade One", "class_fees": 60000 }),
    );
    assert!(error.contains("students are locked"), "{error}");

    let classes = ok(&mut router, "get-classes", json!({}))["classes"].clone();
    assert_eq!(classes[0]["name"], "Grade 1");
    assert_eq!(classes[0]["class_fees"], 50000.0);
    assert_eq!(student(&mut router, id)["schoolFee"], 50000.0);
}

#[test]
fn failed_balance_updates_discard_the_payment() {
    let mut router = router();
    let id = add_student(&mut router, "Ada", None, 50000.0);
    lock_students(&router);

    let error = failure(
        &mut router,
        "make-payment",
        json!({ "title": "Tuition Fee", "amount_paid": 100, "student_id": id }),
    );
    assert!(error.contains("students are locked"), "{error}");

    let all = ok(&mut router, "get-all-payments", Value::Null);
    assert!(all["payments"].as_array().unwrap().is_empty());
    assert_eq!(student(&mut router, id)["paidFee"], 0.0);
}

#[test]
fn negative_payments_are_rejected() {
    let mut router = router();
    let id = ok(
        &mut router,
        "add-student",
        json!({ "name": "Ada", "surname": "Test", "paidFee": 1000 }),
    )["id"]
        .as_i64()
        .unwrap();

    let error = failure(
        &mut router,
        "make-payment",
        json!({ "title": "Tuition Fee", "amount_paid": -400, "student_id": id }),
    );
    assert_eq!(error, "Amount paid must not be negative.");

    let payment = pay(&mut router, id, "Tuition Fee", 100.0);
    let error = failure(
        &mut router,
        "edit-payment",
        json!({ "id": payment, "title": "Tuition Fee", "amount_paid": "-1", "student_id": id }),
    );
    assert_eq!(error, "Amount paid must not be negative.");
    assert_eq!(student(&mut router, id)["paidFee"], 1100.0);
}

#[test]
fn argument_free_operations_take_an_empty_args_object() {
    let mut router = router();
    add_student(&mut router, "Ada", None, 0.0);
    let students = ok(&mut router, "get-students", json!({}));
    assert_eq!(students["students"].as_array().unwrap().len(), 1);
    ok(&mut router, "get-employees", json!({}));
    ok(&mut router, "get-all-payments", json!({}));
}

#[test]
fn editing_a_payment_moves_its_contribution() {
    let mut router = router();
    let ada = add_student(&mut router, "Ada", None, 50000.0);
    let alan = add_student(&mut router, "Alan", None, 50000.0);
    let payment = pay(&mut router, ada, "Tuition Fee", 10000.0);

    let edit = |student_id: i64, title: &str, amount: f64| {
        json!({
            "id": payment,
            "title": title,
            "amount_paid": amount,
            "payment_date": "2024-03-02",
            "student_id": student_id,
        })
    };

    let response = ok(&mut router, "edit-payment", edit(ada, "Tuition Fee", 7500.0));
    assert_eq!(response["updatedId"], payment);
    assert_eq!(student(&mut router, ada)["paidFee"], 7500.0);

    ok(&mut router, "edit-payment", edit(alan, "Tuition Fee", 7500.0));
    assert_eq!(student(&mut router, ada)["paidFee"], 0.0);
    assert_eq!(student(&mut router, alan)["paidFee"], 7500.0);

    ok(&mut router, "edit-payment", edit(alan, "Uniform", 7500.0));
    assert_eq!(student(&mut router, alan)["paidFee"], 0.0);

    let error = failure(&mut router, "edit-payment", edit(99, "Tuition Fee", 1.0));
    assert_eq!(error, NOT_FOUND_MESSAGE);
    assert_eq!(student(&mut router, alan)["paidFee"], 0.0);
}

#[test]
fn payments_outlive_their_student() {
    let mut router = router();
    let id = add_student(&mut router, "Ada", None, 100.0);
    pay(&mut router, id, "Tuition Fee", 50.0);
    ok(&mut router, "delete-student", json!({ "id": id }));

    let all = ok(&mut router, "get-all-payments", Value::Null);
    let payments = all["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["student_id"], id);
    assert!(payments[0]["student_name"].is_null());
}

#[test]
fn deleting_a_class_unassigns_its_students() {
    let mut router = router();
    let class_id = add_class(&mut router, "Grade 1", 100.0);
    let id = add_student(&mut router, "Ada", Some(class_id), 100.0);

    let response = ok(&mut router, "delete-class", json!({ "id": class_id }));
    assert_eq!(response["message"], "Class deleted successfully.");

    let row = student(&mut router, id);
    assert!(row["classId"].is_null());
    assert!(row["className"].is_null());
    assert_eq!(row["schoolFee"], 100.0);
}

#[test]
fn validation_failures_name_the_missing_field() {
    let mut router = router();
    assert_eq!(
        failure(&mut router, "add-student", json!({ "surname": "Lovelace" })),
        "Student name is required."
    );
    assert_eq!(
        failure(&mut router, "add-class", json!({ "name": "Grade 1" })),
        "Class fees is required."
    );
    assert_eq!(
        failure(&mut router, "make-payment", json!({ "title": "Tuition Fee", "amount_paid": 1 })),
        "student_id is required."
    );
    assert_eq!(
        failure(&mut router, "delete-class", json!({})),
        "id is required."
    );
}

#[test]
fn undecodable_requests_fail_without_panicking() {
    let mut router = router();
    let error = failure(&mut router, "drop-everything", Value::Null);
    assert!(error.starts_with("invalid request:"), "{error}");

    let error = failure(&mut router, "add-class", json!({ "class_fees": "lots" }));
    assert!(error.starts_with("invalid request:"), "{error}");
}
