use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{
    ClassInput, Employee, EmployeeFields, Payment, PaymentInput, SchoolClass, Student,
    StudentFields,
};

/// How a form field accepts input.
#[derive(Clone, Debug)]
pub(crate) enum FieldKind {
    Text,
    /// Digits, one decimal point, and a leading minus sign.
    Number,
    /// Fixed list cycled with the arrow keys. `None` means "no selection".
    Choice {
        options: Vec<(Option<i64>, String)>,
        index: usize,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct FormField {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) value: String,
    pub(crate) kind: FieldKind,
    pub(crate) required: bool,
}

impl FormField {
    fn text(key: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            label,
            value: value.into(),
            kind: FieldKind::Text,
            required: false,
        }
    }

    fn number(key: &'static str, label: &'static str, value: Option<f64>) -> Self {
        Self {
            key,
            label,
            value: value.map(number_text).unwrap_or_default(),
            kind: FieldKind::Number,
            required: false,
        }
    }

    fn choice(
        key: &'static str,
        label: &'static str,
        options: Vec<(Option<i64>, String)>,
        selected: Option<i64>,
    ) -> Self {
        let index = options
            .iter()
            .position(|(id, _)| *id == selected)
            .unwrap_or(0);
        Self {
            key,
            label,
            value: String::new(),
            kind: FieldKind::Choice { options, index },
            required: false,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Text shown for the field, without placeholder handling.
    fn display_value(&self) -> &str {
        match &self.kind {
            FieldKind::Choice { options, index } => options
                .get(*index)
                .map(|(_, label)| label.as_str())
                .unwrap_or(""),
            _ => &self.value,
        }
    }
}

/// Render whole numbers without a trailing `.0`.
fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// What a submitted form turns into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FormTarget {
    AddStudent,
    EditStudent(i64),
    AddEmployee,
    EditEmployee(i64),
    AddClass,
    EditClass(i64),
    MakePayment,
    EditPayment(i64),
}

impl FormTarget {
    pub(crate) fn title(self) -> &'static str {
        match self {
            FormTarget::AddStudent => "Add Student",
            FormTarget::EditStudent(_) => "Edit Student",
            FormTarget::AddEmployee => "Add Employee",
            FormTarget::EditEmployee(_) => "Edit Employee",
            FormTarget::AddClass => "Add Class",
            FormTarget::EditClass(_) => "Edit Class",
            FormTarget::MakePayment => "Record Payment",
            FormTarget::EditPayment(_) => "Edit Payment",
        }
    }
}

/// Modal record form. Fields are addressed by `key` when the form is turned
/// into request arguments.
#[derive(Clone, Debug)]
pub(crate) struct RecordForm {
    pub(crate) target: FormTarget,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl RecordForm {
    fn new(target: FormTarget, fields: Vec<FormField>) -> Self {
        Self {
            target,
            fields,
            active: 0,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    pub(crate) fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Append a character to the active field, validating allowed input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let Some(field) = self.fields.get_mut(self.active) else {
            return false;
        };
        let accepted = match field.kind {
            FieldKind::Text => !ch.is_control(),
            FieldKind::Number => {
                ch.is_ascii_digit()
                    || (ch == '.' && !field.value.contains('.'))
                    || (ch == '-' && field.value.is_empty())
            }
            FieldKind::Choice { .. } => false,
        };
        if accepted {
            field.value.push(ch);
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.pop();
        }
    }

    /// Step the active choice field forward or backward.
    pub(crate) fn cycle_choice(&mut self, forward: bool) -> bool {
        let Some(FormField {
            kind: FieldKind::Choice { options, index },
            ..
        }) = self.fields.get_mut(self.active)
        else {
            return false;
        };
        if options.is_empty() {
            return false;
        }
        *index = if forward {
            (*index + 1) % options.len()
        } else {
            (*index + options.len() - 1) % options.len()
        };
        true
    }

    fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.key == key)
    }

    fn text(&self, key: &str) -> String {
        self.field(key)
            .map(|field| field.value.trim().to_string())
            .unwrap_or_default()
    }

    /// Parse a numeric field. Blank input is `None`.
    fn optional_number(&self, key: &str) -> Result<Option<f64>> {
        let Some(field) = self.field(key) else {
            return Ok(None);
        };
        let raw = field.value.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number.", field.label))
    }

    fn number(&self, key: &str) -> Result<f64> {
        Ok(self.optional_number(key)?.unwrap_or(0.0))
    }

    fn choice(&self, key: &str) -> Option<i64> {
        match self.field(key).map(|field| &field.kind) {
            Some(FieldKind::Choice { options, index }) => {
                options.get(*index).and_then(|(id, _)| *id)
            }
            _ => None,
        }
    }

    pub(crate) fn student_fields(&self) -> Result<StudentFields> {
        Ok(StudentFields {
            name: self.text("name"),
            surname: self.text("surname"),
            date_of_birth: self.text("dateOfBirth"),
            place_of_birth: self.text("placeOfBirth"),
            gender: self.text("gender"),
            registration_number: self.text("registrationNumber"),
            admission_date: self.text("admissionDate"),
            class_id: self.choice("classId"),
            school_fee: self.number("schoolFee")?,
            paid_fee: self.number("paidFee")?,
            medical_notes: self.text("medicalNotes"),
            notes: self.text("notes"),
            parent_name: self.text("parentName"),
            parent_phone: self.text("parentPhone"),
            parent_email: self.text("parentEmail"),
            address: self.text("address"),
        })
    }

    pub(crate) fn employee_fields(&self) -> Result<EmployeeFields> {
        Ok(EmployeeFields {
            name: self.text("name"),
            surname: self.text("surname"),
            gender: self.text("gender"),
            date_of_birth: self.text("dateOfBirth"),
            role: self.text("role"),
            qualification: self.text("qualification"),
            salary: self.number("salary")?,
            join_date: self.text("joinDate"),
            experience: self.text("experience"),
            phone: self.text("phone"),
            email: self.text("email"),
            address: self.text("address"),
        })
    }

    pub(crate) fn class_input(&self) -> Result<ClassInput> {
        Ok(ClassInput {
            name: self.text("name"),
            class_fees: self.optional_number("class_fees")?,
        })
    }

    pub(crate) fn payment_input(&self) -> Result<PaymentInput> {
        Ok(PaymentInput {
            title: self.text("title"),
            amount_paid: self.optional_number("amount_paid")?,
            discount: self.number("discount")?,
            payment_date: self.text("payment_date"),
            student_id: self.choice("student_id"),
        })
    }

    /// Render one field as `Label: value`, highlighting the active field.
    pub(crate) fn build_line(&self, idx: usize) -> Line<'static> {
        let Some(field) = self.fields.get(idx) else {
            return Line::from("");
        };
        let is_active = idx == self.active;
        let value = field.display_value();

        let placeholder = if field.required {
            "<required>"
        } else {
            "<optional>"
        };
        let display = if value.is_empty() {
            placeholder.to_string()
        } else if matches!(field.kind, FieldKind::Choice { .. }) {
            format!("< {value} >")
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label)),
            Span::styled(display, style),
        ])
    }

    /// Cursor column for the active field, or `None` for choice fields.
    pub(crate) fn cursor_offset(&self) -> Option<u16> {
        let field = self.fields.get(self.active)?;
        match field.kind {
            FieldKind::Choice { .. } => None,
            _ => Some((field.label.chars().count() + 2 + field.value.chars().count()) as u16),
        }
    }
}

fn class_options(classes: &[SchoolClass]) -> Vec<(Option<i64>, String)> {
    let mut options = vec![(None, "No class".to_string())];
    options.extend(
        classes
            .iter()
            .map(|class| (Some(class.id), class.name.clone())),
    );
    options
}

fn student_options(students: &[Student]) -> Vec<(Option<i64>, String)> {
    let mut options = vec![(None, "Select a student".to_string())];
    options.extend(
        students
            .iter()
            .map(|student| (Some(student.id), format!("#{} {}", student.id, student.full_name()))),
    );
    options
}

/// Student form. The opening paid fee is only offered when adding; once the
/// row exists only payments move it.
pub(crate) fn student_form(classes: &[SchoolClass], existing: Option<&Student>) -> RecordForm {
    let blank = StudentFields::default();
    let fields = existing.map(|s| &s.fields).unwrap_or(&blank);

    let mut form_fields = vec![
        FormField::text("name", "Name", &fields.name).required(),
        FormField::text("surname", "Surname", &fields.surname).required(),
        FormField::text("dateOfBirth", "Date of Birth", &fields.date_of_birth),
        FormField::text("placeOfBirth", "Place of Birth", &fields.place_of_birth),
        FormField::text("gender", "Gender", &fields.gender),
        FormField::text("registrationNumber", "Reg. Number", &fields.registration_number),
        FormField::text("admissionDate", "Admission Date", &fields.admission_date),
        FormField::choice("classId", "Class", class_options(classes), fields.class_id),
        FormField::number(
            "schoolFee",
            "School Fee",
            existing.map(|s| s.fields.school_fee),
        ),
    ];
    if existing.is_none() {
        form_fields.push(FormField::number("paidFee", "Opening Paid Fee", None));
    }
    form_fields.extend([
        FormField::text("medicalNotes", "Medical Notes", &fields.medical_notes),
        FormField::text("notes", "Notes", &fields.notes),
        FormField::text("parentName", "Parent Name", &fields.parent_name),
        FormField::text("parentPhone", "Parent Phone", &fields.parent_phone),
        FormField::text("parentEmail", "Parent Email", &fields.parent_email),
        FormField::text("address", "Address", &fields.address),
    ]);

    let target = match existing {
        Some(student) => FormTarget::EditStudent(student.id),
        None => FormTarget::AddStudent,
    };
    RecordForm::new(target, form_fields)
}

pub(crate) fn employee_form(existing: Option<&Employee>) -> RecordForm {
    let blank = EmployeeFields::default();
    let fields = existing.map(|e| &e.fields).unwrap_or(&blank);

    let form_fields = vec![
        FormField::text("name", "Name", &fields.name).required(),
        FormField::text("surname", "Surname", &fields.surname).required(),
        FormField::text("role", "Role", &fields.role).required(),
        FormField::text("gender", "Gender", &fields.gender),
        FormField::text("dateOfBirth", "Date of Birth", &fields.date_of_birth),
        FormField::text("qualification", "Qualification", &fields.qualification),
        FormField::number("salary", "Salary", existing.map(|e| e.fields.salary)),
        FormField::text("joinDate", "Join Date", &fields.join_date),
        FormField::text("experience", "Experience", &fields.experience),
        FormField::text("phone", "Phone", &fields.phone),
        FormField::text("email", "Email", &fields.email),
        FormField::text("address", "Address", &fields.address),
    ];

    let target = match existing {
        Some(employee) => FormTarget::EditEmployee(employee.id),
        None => FormTarget::AddEmployee,
    };
    RecordForm::new(target, form_fields)
}

pub(crate) fn class_form(existing: Option<&SchoolClass>) -> RecordForm {
    let form_fields = vec![
        FormField::text("name", "Name", existing.map(|c| c.name.as_str()).unwrap_or("")).required(),
        FormField::number("class_fees", "Class Fees", existing.map(|c| c.class_fees)).required(),
    ];
    let target = match existing {
        Some(class) => FormTarget::EditClass(class.id),
        None => FormTarget::AddClass,
    };
    RecordForm::new(target, form_fields)
}

/// Payment form. New payments default to the tuition-fee title so the
/// common case updates the student's balance.
pub(crate) fn payment_form(
    students: &[Student],
    existing: Option<&Payment>,
    student_id: Option<i64>,
) -> RecordForm {
    let owner = existing.map(|p| p.student_id).or(student_id);
    let form_fields = vec![
        FormField::choice("student_id", "Student", student_options(students), owner).required(),
        FormField::text(
            "title",
            "Title",
            existing.map(|p| p.title.as_str()).unwrap_or("Tuition Fee"),
        )
        .required(),
        FormField::number("amount_paid", "Amount Paid", existing.map(|p| p.amount_paid))
            .required(),
        FormField::number("discount", "Discount", existing.map(|p| p.discount)),
        FormField::text(
            "payment_date",
            "Payment Date",
            existing.map(|p| p.payment_date.as_str()).unwrap_or(""),
        ),
    ];

    let target = match existing {
        Some(payment) => FormTarget::EditPayment(payment.id),
        None => FormTarget::MakePayment,
    };
    let mut form = RecordForm::new(target, form_fields);
    if owner.is_some() {
        // Student already chosen; start on the title.
        form.active = 1;
    }
    form
}

/// Confirmation state for deleting a student, employee, or class.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmDelete {
    pub(crate) target: DeleteTarget,
    pub(crate) id: i64,
    pub(crate) label: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeleteTarget {
    Student,
    Employee,
    Class,
}

impl DeleteTarget {
    pub(crate) fn noun(self) -> &'static str {
        match self {
            DeleteTarget::Student => "student",
            DeleteTarget::Employee => "employee",
            DeleteTarget::Class => "class",
        }
    }

    /// Extra line shown in the confirmation dialog.
    pub(crate) fn warning(self) -> &'static str {
        match self {
            DeleteTarget::Student => "Payments recorded for this student are kept.",
            DeleteTarget::Employee => "This cannot be undone.",
            DeleteTarget::Class => "Students in this class will have no class assigned.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_into(form: &mut RecordForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    fn grade_one() -> SchoolClass {
        SchoolClass {
            id: 4,
            name: "Grade 1".into(),
            class_fees: 50000.0,
        }
    }

    #[test]
    fn number_fields_reject_letters() {
        let mut form = class_form(None);
        type_into(&mut form, "Grade 1");
        form.next_field();
        type_into(&mut form, "5a0.0.5-");
        assert_eq!(form.fields[1].value, "50.05");

        let input = form.class_input().unwrap();
        assert_eq!(input.name, "Grade 1");
        assert_eq!(input.class_fees, Some(50.05));
    }

    #[test]
    fn blank_required_numbers_stay_missing() {
        let mut form = class_form(None);
        type_into(&mut form, "Grade 1");
        assert_eq!(form.class_input().unwrap().class_fees, None);
    }

    #[test]
    fn student_form_round_trips_an_existing_student() {
        let student = Student {
            id: 9,
            fields: StudentFields {
                name: "Ada".into(),
                surname: "Lovelace".into(),
                class_id: Some(4),
                school_fee: 50000.0,
                paid_fee: 1200.0,
                ..StudentFields::default()
            },
            class_name: Some("Grade 1".into()),
        };
        let form = student_form(&[grade_one()], Some(&student));
        assert_eq!(form.target, FormTarget::EditStudent(9));
        assert!(form.fields.iter().all(|field| field.key != "paidFee"));

        let fields = form.student_fields().unwrap();
        assert_eq!(fields.name, "Ada");
        assert_eq!(fields.class_id, Some(4));
        assert_eq!(fields.school_fee, 50000.0);
        assert_eq!(fields.paid_fee, 0.0);
    }

    #[test]
    fn class_choice_cycles_through_options() {
        let mut form = student_form(&[grade_one()], None);
        form.active = form
            .fields
            .iter()
            .position(|field| field.key == "classId")
            .unwrap();
        assert_eq!(form.student_fields().unwrap().class_id, None);
        assert!(form.cycle_choice(true));
        assert_eq!(form.student_fields().unwrap().class_id, Some(4));
        assert!(form.cycle_choice(true));
        assert_eq!(form.student_fields().unwrap().class_id, None);
        assert!(!form.push_char('x'));
    }

    #[test]
    fn payment_form_preselects_the_student() {
        let student = Student {
            id: 3,
            fields: StudentFields {
                name: "Ada".into(),
                ..StudentFields::default()
            },
            class_name: None,
        };
        let mut form = payment_form(&[student], None, Some(3));
        assert_eq!(form.active, 1);
        form.next_field();
        type_into(&mut form, "10000");

        let input = form.payment_input().unwrap();
        assert_eq!(input.student_id, Some(3));
        assert_eq!(input.title, "Tuition Fee");
        assert_eq!(input.amount_paid, Some(10000.0));
        assert_eq!(input.discount, 0.0);
    }

    #[test]
    fn invalid_numbers_name_the_field() {
        let mut form = employee_form(None);
        let salary = form
            .fields
            .iter()
            .position(|field| field.key == "salary")
            .unwrap();
        form.fields[salary].value = "-".into();
        let err = form.employee_fields().unwrap_err();
        assert_eq!(err.to_string(), "Salary must be a number.");
    }
}
