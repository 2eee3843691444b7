//! Record store: the embedded SQLite database and one function per query.
//! Functions take a plain `&Connection` so they run the same way on their own
//! or inside a transaction; the multi-statement operations open their own
//! transaction and therefore need `&mut Connection`.

mod classes;
mod connection;
mod employees;
mod payments;
mod reset;
mod students;

pub use classes::{create_class, delete_class, fetch_classes, update_class};
pub use connection::{Location, Store};
pub use employees::{create_employee, delete_employee, fetch_employees, update_employee};
pub use payments::{
    create_payment, fetch_all_payments, fetch_payment, fetch_payments_for_student, update_payment,
};
pub use students::{
    create_student, delete_student, fetch_student, fetch_students, student_exists, update_student,
};
