//! Domain records as they cross the bridge. Field names follow the wire shape
//! the presentation layer uses: students and employees are camelCase, classes
//! and payments keep their snake_case column names.
//!
//! Numeric fields accept either JSON numbers or numeric strings, since form
//! inputs arrive as text.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// Payment title that feeds a student's `paidFee`. Matched case-insensitively.
pub const TUITION_FEE_TITLE: &str = "tuition fee";

/// Whether a payment title belongs to the tuition-fee category.
pub fn is_tuition_fee(title: &str) -> bool {
    title.to_lowercase() == TUITION_FEE_TITLE
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentFields {
    pub name: String,
    pub surname: String,
    pub date_of_birth: String,
    pub place_of_birth: String,
    pub gender: String,
    pub registration_number: String,
    pub admission_date: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub class_id: Option<i64>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub school_fee: f64,
    /// Running total of tuition payments. Only payments move it after insert.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub paid_fee: f64,
    pub medical_notes: String,
    pub notes: String,
    pub parent_name: String,
    pub parent_phone: String,
    pub parent_email: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    #[serde(flatten)]
    pub fields: StudentFields,
    /// Name of the referenced class, absent when the student has none.
    #[serde(default)]
    pub class_name: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.fields.name, self.fields.surname)
            .trim()
            .to_string()
    }

    /// Tuition still owed. Never negative, overpayment counts as settled.
    pub fn outstanding_fee(&self) -> f64 {
        (self.fields.school_fee - self.fields.paid_fee).max(0.0)
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdate {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: StudentFields,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmployeeFields {
    pub name: String,
    pub surname: String,
    pub gender: String,
    pub date_of_birth: String,
    pub role: String,
    pub qualification: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub salary: f64,
    pub join_date: String,
    pub experience: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    #[serde(flatten)]
    pub fields: EmployeeFields,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.fields.name, self.fields.surname)
            .trim()
            .to_string()
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: EmployeeFields,
}

/// Arguments of `add-class`. `class_fees` stays optional so a missing value
/// can be reported instead of silently becoming zero.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassInput {
    pub name: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub class_fees: Option<f64>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassUpdate {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub id: Option<i64>,
    pub name: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub class_fees: Option<f64>,
}

/// Validated class values ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClass {
    pub name: String,
    pub class_fees: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: i64,
    pub name: String,
    pub class_fees: f64,
}

impl fmt::Display for SchoolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Arguments of `make-payment`, also flattened into `edit-payment`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentInput {
    pub title: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub amount_paid: Option<f64>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub discount: f64,
    pub payment_date: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub student_id: Option<i64>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: PaymentInput,
}

/// Validated payment values ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub title: String,
    pub amount_paid: f64,
    pub discount: f64,
    pub payment_date: String,
    pub student_id: i64,
}

impl NewPayment {
    /// Amount this payment contributes to the owner's `paidFee`.
    pub fn tuition_contribution(&self) -> f64 {
        if is_tuition_fee(&self.title) {
            self.amount_paid
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub title: String,
    pub amount_paid: f64,
    pub discount: f64,
    pub payment_date: String,
    pub student_id: i64,
    /// `None` once the owning student has been deleted.
    #[serde(default)]
    pub student_name: Option<String>,
}

impl Payment {
    pub fn tuition_contribution(&self) -> f64 {
        if is_tuition_fee(&self.title) {
            self.amount_paid
        } else {
            0.0
        }
    }
}

/// `{ "id": ... }` argument shared by the delete operations.
#[serde_as]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordId {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub id: Option<i64>,
}

impl RecordId {
    pub fn new(id: i64) -> Self {
        Self { id: Some(id) }
    }
}

/// `{ "student_id": ... }` argument of `get-payments`.
#[serde_as]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRef {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub student_id: Option<i64>,
}

impl StudentRef {
    pub fn new(student_id: i64) -> Self {
        Self {
            student_id: Some(student_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tuition_match_ignores_case_only() {
        assert!(is_tuition_fee("Tuition Fee"));
        assert!(is_tuition_fee("TUITION FEE"));
        assert!(!is_tuition_fee(" Tuition Fee"));
        assert!(!is_tuition_fee("Tuition Fees"));
        assert!(!is_tuition_fee("Transport"));
    }

    #[test]
    fn numeric_fields_accept_strings() {
        let fields: StudentFields = serde_json::from_value(json!({
            "name": "Ada",
            "surname": "Lovelace",
            "classId": "3",
            "schoolFee": "50000",
            "paidFee": 1250.5
        }))
        .unwrap();
        assert_eq!(fields.class_id, Some(3));
        assert_eq!(fields.school_fee, 50000.0);
        assert_eq!(fields.paid_fee, 1250.5);
        assert_eq!(fields.gender, "");
    }

    #[test]
    fn student_rows_serialize_camel_case() {
        let student = Student {
            id: 7,
            fields: StudentFields {
                name: "Ada".into(),
                school_fee: 100.0,
                ..StudentFields::default()
            },
            class_name: Some("Grade 1".into()),
        };
        let value = serde_json::to_value(&student).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["schoolFee"], 100.0);
        assert_eq!(value["className"], "Grade 1");
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn payment_update_flattens_its_fields() {
        let update: PaymentUpdate = serde_json::from_value(json!({
            "id": 2,
            "title": "Tuition Fee",
            "amount_paid": "300",
            "student_id": 1
        }))
        .unwrap();
        assert_eq!(update.id, Some(2));
        assert_eq!(update.fields.amount_paid, Some(300.0));
        assert_eq!(update.fields.student_id, Some(1));
        assert_eq!(update.fields.discount, 0.0);
    }

    #[test]
    fn outstanding_fee_never_goes_negative() {
        let mut student = Student {
            id: 1,
            fields: StudentFields {
                school_fee: 100.0,
                paid_fee: 40.0,
                ..StudentFields::default()
            },
            class_name: None,
        };
        assert_eq!(student.outstanding_fee(), 60.0);
        student.fields.paid_fee = 150.0;
        assert_eq!(student.outstanding_fee(), 0.0);
    }
}
