//! Presence checks performed before a request reaches the store.

use crate::error::CommandError;
use crate::models::{
    ClassInput, ClassUpdate, EmployeeFields, NewClass, NewPayment, PaymentInput, StudentFields,
};

fn require_text(value: &str, message: &str) -> Result<(), CommandError> {
    if value.trim().is_empty() {
        Err(CommandError::validation(message))
    } else {
        Ok(())
    }
}

fn require_number(value: Option<f64>, label: &str) -> Result<f64, CommandError> {
    match value {
        Some(number) if number.is_finite() => Ok(number),
        Some(_) => Err(CommandError::validation(format!("{label} must be a number."))),
        None => Err(CommandError::validation(format!("{label} is required."))),
    }
}

fn finite(value: f64, message: &str) -> Result<(), CommandError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CommandError::validation(message))
    }
}

pub(crate) fn require_id(id: Option<i64>) -> Result<i64, CommandError> {
    id.ok_or_else(|| CommandError::validation("id is required."))
}

pub(crate) fn student(fields: &StudentFields) -> Result<(), CommandError> {
    require_text(&fields.name, "Student name is required.")?;
    require_text(&fields.surname, "Student surname is required.")?;
    finite(fields.school_fee, "School fee must be a number.")?;
    finite(fields.paid_fee, "Paid fee must be a number.")
}

pub(crate) fn employee(fields: &EmployeeFields) -> Result<(), CommandError> {
    require_text(&fields.name, "Employee name is required.")?;
    require_text(&fields.surname, "Employee surname is required.")?;
    require_text(&fields.role, "Employee role is required.")?;
    finite(fields.salary, "Salary must be a number.")
}

pub(crate) fn new_class(input: ClassInput) -> Result<NewClass, CommandError> {
    require_text(&input.name, "Class name is required.")?;
    let class_fees = require_number(input.class_fees, "Class fees")?;
    Ok(NewClass {
        name: input.name,
        class_fees,
    })
}

pub(crate) fn class_update(update: ClassUpdate) -> Result<(i64, NewClass), CommandError> {
    let id = require_id(update.id)?;
    let class = new_class(ClassInput {
        name: update.name,
        class_fees: update.class_fees,
    })?;
    Ok((id, class))
}

pub(crate) fn payment(input: PaymentInput) -> Result<NewPayment, CommandError> {
    require_text(&input.title, "Payment title is required.")?;
    let student_id = input
        .student_id
        .ok_or_else(|| CommandError::validation("student_id is required."))?;
    let amount_paid = require_number(input.amount_paid, "Amount paid")?;
    if amount_paid < 0.0 {
        return Err(CommandError::validation("Amount paid must not be negative."));
    }
    finite(input.discount, "Discount must be a number.")?;
    Ok(NewPayment {
        title: input.title,
        amount_paid,
        discount: input.discount,
        payment_date: input.payment_date,
        student_id,
    })
}
