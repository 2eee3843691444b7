//! Command router: one typed handler per named operation, all running against
//! the store the router was constructed with.
//!
//! Handlers return `Result<_, CommandError>`. [`Router::dispatch`] is the
//! boundary where every error turns into a `{ success: false, error }`
//! payload, so nothing below it needs to know the wire format.

mod validate;

use serde_json::Value;
use tracing::{debug, info_span, warn};

use crate::bridge::contract::{
    failure_envelope, success_envelope, ClassList, Created, EmployeeList, Inserted, Message,
    PaymentList, Reply, Request, StudentList, Updated,
};
use crate::db::{self, Store};
use crate::error::{CommandError, Failure, StoreError};
use crate::models::{
    ClassInput, ClassUpdate, EmployeeFields, EmployeeUpdate, PaymentInput, PaymentUpdate,
    RecordId, StudentFields, StudentRef, StudentUpdate,
};

pub struct Router {
    store: Store,
}

impl Router {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Close the underlying store.
    pub fn shutdown(self) -> Result<(), StoreError> {
        self.store.close()
    }

    /// Run a request and wrap the outcome in the wire envelope.
    pub fn dispatch(&mut self, request: Request) -> Value {
        let operation = request.name();
        let span = info_span!("command", operation);
        let _entered = span.enter();

        match self.handle(request) {
            Ok(reply) => {
                debug!("command succeeded");
                success_envelope(&reply)
            }
            Err(err) => {
                warn!(error = %err, "command failed");
                failure_envelope(&Failure::from(err))
            }
        }
    }

    /// Decode a raw `{operation, args}` value, then dispatch it.
    pub fn dispatch_value(&mut self, value: Value) -> Value {
        match Request::decode(value) {
            Ok(request) => self.dispatch(request),
            Err(err) => {
                let err = CommandError::InvalidRequest(err.to_string());
                warn!(error = %err, "rejected undecodable request");
                failure_envelope(&Failure::from(err))
            }
        }
    }

    pub fn handle(&mut self, request: Request) -> Result<Reply, CommandError> {
        let reply = match request {
            Request::GetStudents => Reply::Students(self.get_students()?),
            Request::AddStudent(fields) => Reply::Created(self.add_student(fields)?),
            Request::UpdateStudent(update) => Reply::Updated(self.update_student(update)?),
            Request::DeleteStudent(id) => Reply::Message(self.delete_student(id)?),
            Request::GetEmployees => Reply::Employees(self.get_employees()?),
            Request::AddEmployee(fields) => Reply::Created(self.add_employee(fields)?),
            Request::UpdateEmployee(update) => Reply::Updated(self.update_employee(update)?),
            Request::DeleteEmployee(id) => Reply::Message(self.delete_employee(id)?),
            Request::GetClasses => Reply::Classes(self.get_classes()?),
            Request::AddClass(input) => Reply::Inserted(self.add_class(input)?),
            Request::UpdateClass(update) => Reply::Updated(self.update_class(update)?),
            Request::DeleteClass(id) => Reply::Message(self.delete_class(id)?),
            Request::ResetDatabase => Reply::Message(self.reset_database()?),
            Request::GetAllPayments => Reply::Payments(self.get_all_payments()?),
            Request::GetPayments(student) => Reply::Payments(self.get_payments(student)?),
            Request::MakePayment(input) => Reply::Inserted(self.make_payment(input)?),
            Request::EditPayment(update) => Reply::Updated(self.edit_payment(update)?),
        };
        Ok(reply)
    }

    pub fn get_students(&self) -> Result<StudentList, CommandError> {
        let students = db::fetch_students(&self.store.conn)?;
        Ok(StudentList { students })
    }

    pub fn add_student(&mut self, fields: StudentFields) -> Result<Created, CommandError> {
        validate::student(&fields)?;
        let id = db::create_student(&self.store.conn, &fields)?;
        debug!(student_id = id, "student added");
        Ok(Created { id })
    }

    pub fn update_student(&mut self, update: StudentUpdate) -> Result<Updated, CommandError> {
        let id = validate::require_id(update.id)?;
        validate::student(&update.fields)?;
        db::update_student(&self.store.conn, id, &update.fields)?;
        Ok(Updated { updated_id: id })
    }

    pub fn delete_student(&mut self, id: RecordId) -> Result<Message, CommandError> {
        let id = validate::require_id(id.id)?;
        db::delete_student(&self.store.conn, id)?;
        Ok(Message::new("Student deleted successfully."))
    }

    pub fn get_employees(&self) -> Result<EmployeeList, CommandError> {
        let employees = db::fetch_employees(&self.store.conn)?;
        Ok(EmployeeList { employees })
    }

    pub fn add_employee(&mut self, fields: EmployeeFields) -> Result<Created, CommandError> {
        validate::employee(&fields)?;
        let id = db::create_employee(&self.store.conn, &fields)?;
        debug!(employee_id = id, "employee added");
        Ok(Created { id })
    }

    pub fn update_employee(&mut self, update: EmployeeUpdate) -> Result<Updated, CommandError> {
        let id = validate::require_id(update.id)?;
        validate::employee(&update.fields)?;
        db::update_employee(&self.store.conn, id, &update.fields)?;
        Ok(Updated { updated_id: id })
    }

    pub fn delete_employee(&mut self, id: RecordId) -> Result<Message, CommandError> {
        let id = validate::require_id(id.id)?;
        db::delete_employee(&self.store.conn, id)?;
        Ok(Message::new("Employee deleted successfully."))
    }

    pub fn get_classes(&self) -> Result<ClassList, CommandError> {
        let classes = db::fetch_classes(&self.store.conn)?;
        Ok(ClassList { classes })
    }

    pub fn add_class(&mut self, input: ClassInput) -> Result<Inserted, CommandError> {
        let class = validate::new_class(input)?;
        let id = db::create_class(&self.store.conn, &class)?;
        Ok(Inserted { inserted_id: id })
    }

    pub fn update_class(&mut self, update: ClassUpdate) -> Result<Updated, CommandError> {
        let (id, class) = validate::class_update(update)?;
        db::update_class(&mut self.store.conn, id, &class)?;
        Ok(Updated { updated_id: id })
    }

    pub fn delete_class(&mut self, id: RecordId) -> Result<Message, CommandError> {
        let id = validate::require_id(id.id)?;
        db::delete_class(&self.store.conn, id)?;
        Ok(Message::new("Class deleted successfully."))
    }

    pub fn reset_database(&mut self) -> Result<Message, CommandError> {
        self.store.reset()?;
        Ok(Message::new("Database reset successfully."))
    }

    pub fn get_all_payments(&self) -> Result<PaymentList, CommandError> {
        let payments = db::fetch_all_payments(&self.store.conn)?;
        Ok(PaymentList { payments })
    }

    pub fn get_payments(&self, student: StudentRef) -> Result<PaymentList, CommandError> {
        let student_id = student
            .student_id
            .ok_or_else(|| CommandError::validation("student_id is required."))?;
        let payments = db::fetch_payments_for_student(&self.store.conn, student_id)?;
        Ok(PaymentList { payments })
    }

    pub fn make_payment(&mut self, input: PaymentInput) -> Result<Inserted, CommandError> {
        let payment = validate::payment(input)?;
        let id = db::create_payment(&mut self.store.conn, &payment)?;
        Ok(Inserted { inserted_id: id })
    }

    pub fn edit_payment(&mut self, update: PaymentUpdate) -> Result<Updated, CommandError> {
        let id = validate::require_id(update.id)?;
        let payment = validate::payment(update.fields)?;
        db::update_payment(&mut self.store.conn, id, &payment)?;
        Ok(Updated { updated_id: id })
    }
}
