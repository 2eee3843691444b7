use crate::models::{Employee, Payment, SchoolClass, Student};

/// Totals shown on the dashboard tab, computed from the lists the other tabs
/// already fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DashboardSummary {
    pub(crate) students: usize,
    pub(crate) employees: usize,
    pub(crate) classes: usize,
    pub(crate) payments: usize,
    pub(crate) fees_expected: f64,
    pub(crate) fees_collected: f64,
    pub(crate) fees_outstanding: f64,
    pub(crate) payments_total: f64,
    pub(crate) monthly_payroll: f64,
    /// `(class name, enrolled students)`, in class order. Students without a
    /// class are counted under "Unassigned" when there are any.
    pub(crate) enrollment: Vec<(String, usize)>,
}

impl DashboardSummary {
    pub(crate) fn from_records(
        students: &[Student],
        employees: &[Employee],
        classes: &[SchoolClass],
        payments: &[Payment],
    ) -> Self {
        let mut enrollment: Vec<(String, usize)> = classes
            .iter()
            .map(|class| {
                let count = students
                    .iter()
                    .filter(|s| s.fields.class_id == Some(class.id))
                    .count();
                (class.name.clone(), count)
            })
            .collect();

        let unassigned = students
            .iter()
            .filter(|s| match s.fields.class_id {
                Some(id) => !classes.iter().any(|c| c.id == id),
                None => true,
            })
            .count();
        if unassigned > 0 {
            enrollment.push(("Unassigned".to_string(), unassigned));
        }

        Self {
            students: students.len(),
            employees: employees.len(),
            classes: classes.len(),
            payments: payments.len(),
            fees_expected: students.iter().map(|s| s.fields.school_fee).sum(),
            fees_collected: students.iter().map(|s| s.fields.paid_fee).sum(),
            fees_outstanding: students.iter().map(Student::outstanding_fee).sum(),
            payments_total: payments.iter().map(|p| p.amount_paid).sum(),
            monthly_payroll: employees.iter().map(|e| e.fields.salary).sum(),
            enrollment,
        }
    }

    /// Share of expected tuition already collected, 0 to 100.
    pub(crate) fn collection_rate(&self) -> f64 {
        if self.fees_expected <= 0.0 {
            0.0
        } else {
            (self.fees_collected / self.fees_expected * 100.0).min(100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmployeeFields, StudentFields};

    fn student(id: i64, class_id: Option<i64>, fee: f64, paid: f64) -> Student {
        Student {
            id,
            fields: StudentFields {
                name: format!("Student {id}"),
                class_id,
                school_fee: fee,
                paid_fee: paid,
                ..StudentFields::default()
            },
            class_name: None,
        }
    }

    #[test]
    fn totals_and_enrollment_add_up() {
        let classes = vec![
            SchoolClass {
                id: 1,
                name: "Grade 1".into(),
                class_fees: 100.0,
            },
            SchoolClass {
                id: 2,
                name: "Grade 2".into(),
                class_fees: 200.0,
            },
        ];
        let students = vec![
            student(1, Some(1), 100.0, 100.0),
            student(2, Some(1), 100.0, 25.0),
            student(3, Some(9), 200.0, 250.0),
            student(4, None, 0.0, 0.0),
        ];
        let employees = vec![Employee {
            id: 1,
            fields: EmployeeFields {
                salary: 1500.0,
                ..EmployeeFields::default()
            },
        }];
        let payments = vec![Payment {
            id: 1,
            title: "Tuition Fee".into(),
            amount_paid: 25.0,
            discount: 0.0,
            payment_date: "2024-01-10".into(),
            student_id: 2,
            student_name: Some("Student 2".into()),
        }];

        let summary = DashboardSummary::from_records(&students, &employees, &classes, &payments);
        assert_eq!(summary.students, 4);
        assert_eq!(summary.fees_expected, 400.0);
        assert_eq!(summary.fees_collected, 375.0);
        assert_eq!(summary.fees_outstanding, 75.0);
        assert_eq!(summary.payments_total, 25.0);
        assert_eq!(summary.monthly_payroll, 1500.0);
        assert_eq!(
            summary.enrollment,
            vec![
                ("Grade 1".to_string(), 2),
                ("Grade 2".to_string(), 0),
                ("Unassigned".to_string(), 2),
            ]
        );
    }

    #[test]
    fn empty_school_has_zero_collection_rate() {
        let summary = DashboardSummary::from_records(&[], &[], &[], &[]);
        assert_eq!(summary.collection_rate(), 0.0);
        assert!(summary.enrollment.is_empty());
    }
}
