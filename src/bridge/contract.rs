//! Request and response shapes of every operation the presentation layer can
//! invoke. On the wire a request is `{"operation": "<name>", "args": {...}}`
//! and a response is the payload object with a `success` flag merged in.
//!
//! Rust callers use the per-operation [`Command`] types instead, which tie
//! each request to the exact output it produces.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Failure;
use crate::models::{
    ClassInput, ClassUpdate, Employee, EmployeeFields, EmployeeUpdate, Payment, PaymentInput,
    PaymentUpdate, RecordId, SchoolClass, Student, StudentFields, StudentRef, StudentUpdate,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "args", rename_all = "kebab-case")]
pub enum Request {
    GetStudents,
    AddStudent(StudentFields),
    UpdateStudent(StudentUpdate),
    DeleteStudent(RecordId),
    GetEmployees,
    AddEmployee(EmployeeFields),
    UpdateEmployee(EmployeeUpdate),
    DeleteEmployee(RecordId),
    GetClasses,
    AddClass(ClassInput),
    UpdateClass(ClassUpdate),
    DeleteClass(RecordId),
    ResetDatabase,
    GetAllPayments,
    GetPayments(StudentRef),
    #[serde(alias = "add-payment")]
    MakePayment(PaymentInput),
    EditPayment(PaymentUpdate),
}

/// Operations whose variant carries no arguments.
const ARGUMENT_FREE: [&str; 5] = [
    "get-students",
    "get-employees",
    "get-classes",
    "reset-database",
    "get-all-payments",
];

impl Request {
    /// Build a request from an operation name and its JSON arguments.
    pub fn from_parts(operation: &str, args: Value) -> Result<Self, serde_json::Error> {
        let mut envelope = Map::new();
        envelope.insert("operation".into(), Value::String(operation.to_string()));
        envelope.insert("args".into(), args);
        Self::decode(Value::Object(envelope))
    }

    /// Decode a raw `{operation, args}` value. Argument-free operations
    /// ignore an `args` that is null or an empty object.
    pub fn decode(mut value: Value) -> Result<Self, serde_json::Error> {
        if let Value::Object(envelope) = &mut value {
            let argument_free = envelope
                .get("operation")
                .and_then(Value::as_str)
                .is_some_and(|operation| ARGUMENT_FREE.iter().any(|name| *name == operation));
            let empty = envelope.get("args").is_some_and(|args| {
                args.is_null() || args.as_object().is_some_and(Map::is_empty)
            });
            if argument_free && empty {
                envelope.remove("args");
            }
        }
        serde_json::from_value(value)
    }

    /// Wire name of the operation, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetStudents => "get-students",
            Request::AddStudent(_) => "add-student",
            Request::UpdateStudent(_) => "update-student",
            Request::DeleteStudent(_) => "delete-student",
            Request::GetEmployees => "get-employees",
            Request::AddEmployee(_) => "add-employee",
            Request::UpdateEmployee(_) => "update-employee",
            Request::DeleteEmployee(_) => "delete-employee",
            Request::GetClasses => "get-classes",
            Request::AddClass(_) => "add-class",
            Request::UpdateClass(_) => "update-class",
            Request::DeleteClass(_) => "delete-class",
            Request::ResetDatabase => "reset-database",
            Request::GetAllPayments => "get-all-payments",
            Request::GetPayments(_) => "get-payments",
            Request::MakePayment(_) => "make-payment",
            Request::EditPayment(_) => "edit-payment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentList {
    pub students: Vec<Student>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeList {
    pub employees: Vec<Employee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassList {
    pub classes: Vec<SchoolClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentList {
    pub payments: Vec<Payment>,
}

/// `{id}` from add-student and add-employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub id: i64,
}

/// `{insertedId}` from add-class and make-payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inserted {
    #[serde(rename = "insertedId")]
    pub inserted_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    #[serde(rename = "updatedId")]
    pub updated_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Output of whichever handler ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Students(StudentList),
    Employees(EmployeeList),
    Classes(ClassList),
    Payments(PaymentList),
    Created(Created),
    Inserted(Inserted),
    Updated(Updated),
    Message(Message),
}

/// Wrap a payload into `{ "success": true, ...payload }`.
pub fn success_envelope<T: Serialize>(payload: &T) -> Value {
    let mut object = match serde_json::to_value(payload) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            let mut object = Map::new();
            object.insert("data".into(), other);
            object
        }
        Err(err) => return failure_envelope(&Failure::new(err.to_string())),
    };
    object.insert("success".into(), Value::Bool(true));
    Value::Object(object)
}

/// `{ "success": false, "error": "..." }`.
pub fn failure_envelope(failure: &Failure) -> Value {
    let mut object = Map::new();
    object.insert("success".into(), Value::Bool(false));
    object.insert("error".into(), Value::String(failure.error.clone()));
    Value::Object(object)
}

/// Split an envelope back into its payload or its failure.
pub fn open_envelope<T: DeserializeOwned>(envelope: Value) -> Result<T, Failure> {
    let success = envelope
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !success {
        let error = envelope
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown failure")
            .to_string();
        return Err(Failure::new(error));
    }
    serde_json::from_value(envelope)
        .map_err(|err| Failure::new(format!("malformed response: {err}")))
}

/// An operation with a statically known output type.
pub trait Command: Into<Request> {
    type Output: DeserializeOwned;
}

macro_rules! command {
    ($(#[$meta:meta])* $name:ident => $variant:ident, $output:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl From<$name> for Request {
            fn from(_: $name) -> Self {
                Request::$variant
            }
        }

        impl Command for $name {
            type Output = $output;
        }
    };
    ($(#[$meta:meta])* $name:ident($args:ty) => $variant:ident, $output:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub $args);

        impl From<$name> for Request {
            fn from(command: $name) -> Self {
                Request::$variant(command.0)
            }
        }

        impl Command for $name {
            type Output = $output;
        }
    };
}

command!(GetStudents => GetStudents, StudentList);
command!(AddStudent(StudentFields) => AddStudent, Created);
command!(UpdateStudent(StudentUpdate) => UpdateStudent, Updated);
command!(DeleteStudent(RecordId) => DeleteStudent, Message);
command!(GetEmployees => GetEmployees, EmployeeList);
command!(AddEmployee(EmployeeFields) => AddEmployee, Created);
command!(UpdateEmployee(EmployeeUpdate) => UpdateEmployee, Updated);
command!(DeleteEmployee(RecordId) => DeleteEmployee, Message);
command!(GetClasses => GetClasses, ClassList);
command!(AddClass(ClassInput) => AddClass, Inserted);
command!(
    /// Updates the class and overwrites the school fee of its students.
    UpdateClass(ClassUpdate) => UpdateClass, Updated
);
command!(DeleteClass(RecordId) => DeleteClass, Message);
command!(
    /// Destroys all data and rebuilds the schema.
    ResetDatabase => ResetDatabase, Message
);
command!(GetAllPayments => GetAllPayments, PaymentList);
command!(GetPayments(StudentRef) => GetPayments, PaymentList);
command!(MakePayment(PaymentInput) => MakePayment, Inserted);
command!(EditPayment(PaymentUpdate) => EditPayment, Updated);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_use_operation_and_args_keys() {
        let request: Request = AddClass(ClassInput {
            name: "Grade 1".into(),
            class_fees: Some(50000.0),
        })
        .into();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["operation"], "add-class");
        assert_eq!(value["args"]["name"], "Grade 1");
        assert_eq!(value["args"]["class_fees"], 50000.0);
    }

    #[test]
    fn argument_free_operations_parse_without_args() {
        assert_eq!(
            Request::from_parts("get-students", Value::Null).unwrap(),
            Request::GetStudents
        );
        assert_eq!(
            Request::from_parts("reset-database", Value::Null).unwrap(),
            Request::ResetDatabase
        );
    }

    #[test]
    fn argument_free_operations_accept_empty_args() {
        for operation in ARGUMENT_FREE {
            let request = Request::from_parts(operation, json!({})).unwrap();
            assert_eq!(request.name(), operation);
        }
        let request = Request::decode(json!({ "operation": "get-classes", "args": null })).unwrap();
        assert_eq!(request, Request::GetClasses);
    }

    #[test]
    fn empty_args_decode_normally_for_other_operations() {
        let request = Request::from_parts("delete-class", json!({})).unwrap();
        assert_eq!(request, Request::DeleteClass(RecordId { id: None }));
    }

    #[test]
    fn add_payment_is_accepted_as_an_alias() {
        let request = Request::from_parts(
            "add-payment",
            json!({ "title": "Tuition Fee", "student_id": 1, "amount_paid": 10 }),
        )
        .unwrap();
        assert_eq!(request.name(), "make-payment");
    }

    #[test]
    fn unknown_operations_are_rejected() {
        assert!(Request::from_parts("drop-everything", Value::Null).is_err());
    }

    #[test]
    fn envelopes_round_trip_payload_and_failure() {
        let ok = success_envelope(&Inserted { inserted_id: 4 });
        assert_eq!(ok, json!({ "success": true, "insertedId": 4 }));
        assert_eq!(open_envelope::<Inserted>(ok).unwrap().inserted_id, 4);

        let failed = failure_envelope(&Failure::new("nope"));
        assert_eq!(failed, json!({ "success": false, "error": "nope" }));
        assert_eq!(open_envelope::<Inserted>(failed).unwrap_err().error, "nope");
    }
}
