use serde_json::json;

use school_manager::bridge::contract::{
    AddClass, AddStudent, GetClasses, GetPayments, GetStudents, MakePayment, UpdateClass,
};
use school_manager::error::NOT_FOUND_MESSAGE;
use school_manager::models::{ClassInput, ClassUpdate, PaymentInput, StudentFields, StudentRef};
use school_manager::{Bridge, Router, Store};

fn bridge() -> Bridge {
    Bridge::spawn(Router::new(Store::open_in_memory().unwrap())).unwrap()
}

#[tokio::test]
async fn typed_calls_round_trip_through_the_router_thread() {
    let bridge = bridge();

    let class = bridge
        .call(AddClass(ClassInput {
            name: "Grade 1".into(),
            class_fees: Some(50000.0),
        }))
        .await
        .unwrap();
    let student = bridge
        .call(AddStudent(StudentFields {
            name: "Ada".into(),
            surname: "Lovelace".into(),
            class_id: Some(class.inserted_id),
            school_fee: 50000.0,
            ..StudentFields::default()
        }))
        .await
        .unwrap();

    bridge
        .call(UpdateClass(ClassUpdate {
            id: Some(class.inserted_id),
            name: "Grade 1".into(),
            class_fees: Some(60000.0),
        }))
        .await
        .unwrap();

    let students = bridge.call(GetStudents).await.unwrap().students;
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].id, student.id);
    assert_eq!(students[0].fields.school_fee, 60000.0);
    assert_eq!(students[0].class_name.as_deref(), Some("Grade 1"));

    let classes = bridge.call(GetClasses).await.unwrap().classes;
    assert_eq!(classes[0].class_fees, 60000.0);

    bridge.shutdown().unwrap();
}

#[tokio::test]
async fn failures_carry_the_router_message() {
    let bridge = bridge();
    let err = bridge
        .call(MakePayment(PaymentInput {
            title: "Tuition Fee".into(),
            amount_paid: Some(10.0),
            student_id: Some(3),
            ..PaymentInput::default()
        }))
        .await
        .unwrap_err();
    assert_eq!(err.error, NOT_FOUND_MESSAGE);

    let payments = bridge.call(GetPayments(StudentRef::new(3))).await.unwrap();
    assert!(payments.payments.is_empty());
    bridge.shutdown().unwrap();
}

#[tokio::test]
async fn raw_invocations_return_the_whole_envelope() {
    let bridge = bridge();
    let created = bridge
        .invoke("add-student", json!({ "name": "Ada", "surname": "Lovelace" }))
        .await
        .unwrap();
    assert_eq!(created["success"], true);
    let id = created["id"].as_i64().unwrap();

    let paid = bridge
        .invoke(
            "add-payment",
            json!({ "title": "Tuition Fee", "amount_paid": "250", "student_id": id }),
        )
        .await
        .unwrap();
    assert_eq!(paid["insertedId"], 1);

    let students = bridge.invoke("get-students", json!(null)).await.unwrap();
    assert_eq!(students["students"][0]["paidFee"], 250.0);

    let err = bridge.invoke("launch-rockets", json!({})).await.unwrap_err();
    assert!(err.error.starts_with("invalid request:"), "{}", err.error);

    bridge.shutdown().unwrap();
}

#[tokio::test]
async fn argument_free_operations_accept_an_empty_args_object() {
    let bridge = bridge();
    for operation in ["get-students", "get-employees", "get-classes", "get-all-payments"] {
        let response = bridge.invoke(operation, json!({})).await.unwrap();
        assert_eq!(response["success"], true, "{operation}: {response}");
    }
    let reset = bridge.invoke("reset-database", json!({})).await.unwrap();
    assert_eq!(reset["message"], "Database reset successfully.");
    bridge.shutdown().unwrap();
}

#[test]
fn blocking_calls_work_outside_a_runtime() {
    let bridge = bridge();
    let classes = bridge.call_blocking(GetClasses).unwrap();
    assert!(classes.classes.is_empty());
    bridge.shutdown().unwrap();
}
