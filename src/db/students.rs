use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{SqlResultExt, StoreError};
use crate::models::{Student, StudentFields};

const STUDENT_COLUMNS: &str = "s.id, s.name, s.surname, s.date_of_birth, s.place_of_birth,
    s.gender, s.registration_number, s.admission_date, s.class_id, s.school_fee,
    s.paid_fee, s.medical_notes, s.notes, s.parent_name, s.parent_phone,
    s.parent_email, s.address, c.name";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        fields: StudentFields {
            name: row.get(1)?,
            surname: row.get(2)?,
            date_of_birth: row.get(3)?,
            place_of_birth: row.get(4)?,
            gender: row.get(5)?,
            registration_number: row.get(6)?,
            admission_date: row.get(7)?,
            class_id: row.get(8)?,
            school_fee: row.get(9)?,
            paid_fee: row.get(10)?,
            medical_notes: row.get(11)?,
            notes: row.get(12)?,
            parent_name: row.get(13)?,
            parent_phone: row.get(14)?,
            parent_email: row.get(15)?,
            address: row.get(16)?,
        },
        class_name: row.get(17)?,
    })
}

/// Every student with the name of their class, ordered by surname then name.
pub fn fetch_students(conn: &Connection) -> Result<Vec<Student>, StoreError> {
    let sql = format!(
        "SELECT {STUDENT_COLUMNS}
         FROM students s
         LEFT JOIN classes c ON c.id = s.class_id
         ORDER BY s.surname COLLATE NOCASE, s.name COLLATE NOCASE, s.id"
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare student query")?;

    let students = stmt
        .query_map([], student_from_row)
        .context("failed to load students")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect students")?;

    Ok(students)
}

pub fn fetch_student(conn: &Connection, id: i64) -> Result<Student, StoreError> {
    let sql = format!(
        "SELECT {STUDENT_COLUMNS}
         FROM students s
         LEFT JOIN classes c ON c.id = s.class_id
         WHERE s.id = ?1"
    );
    conn.query_row(&sql, [id], student_from_row)
        .optional()
        .context("failed to load student")?
        .ok_or(StoreError::NotFound)
}

pub fn create_student(conn: &Connection, fields: &StudentFields) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO students (
            name, surname, date_of_birth, place_of_birth, gender, registration_number,
            admission_date, class_id, school_fee, paid_fee, medical_notes, notes,
            parent_name, parent_phone, parent_email, address
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            fields.name,
            fields.surname,
            fields.date_of_birth,
            fields.place_of_birth,
            fields.gender,
            fields.registration_number,
            fields.admission_date,
            fields.class_id,
            fields.school_fee,
            fields.paid_fee,
            fields.medical_notes,
            fields.notes,
            fields.parent_name,
            fields.parent_phone,
            fields.parent_email,
            fields.address,
        ],
    )
    .context("failed to insert student")?;

    Ok(conn.last_insert_rowid())
}

/// Replace every editable column of a student. `paid_fee` is left alone:
/// only payments move the running total once the row exists.
pub fn update_student(conn: &Connection, id: i64, fields: &StudentFields) -> Result<(), StoreError> {
    let updated = conn
        .execute(
            "UPDATE students SET
                name = ?1, surname = ?2, date_of_birth = ?3, place_of_birth = ?4,
                gender = ?5, registration_number = ?6, admission_date = ?7, class_id = ?8,
                school_fee = ?9, medical_notes = ?10, notes = ?11, parent_name = ?12,
                parent_phone = ?13, parent_email = ?14, address = ?15
             WHERE id = ?16",
            params![
                fields.name,
                fields.surname,
                fields.date_of_birth,
                fields.place_of_birth,
                fields.gender,
                fields.registration_number,
                fields.admission_date,
                fields.class_id,
                fields.school_fee,
                fields.medical_notes,
                fields.notes,
                fields.parent_name,
                fields.parent_phone,
                fields.parent_email,
                fields.address,
                id,
            ],
        )
        .context("failed to update student")?;

    if updated == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

/// Remove a student row. Payments that reference it stay behind.
pub fn delete_student(conn: &Connection, id: i64) -> Result<(), StoreError> {
    let deleted = conn
        .execute("DELETE FROM students WHERE id = ?1", params![id])
        .context("failed to delete student")?;

    if deleted == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

pub fn student_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?1", [id], |_| Ok(()))
        .optional()
        .context("failed to look up student")
        .map(|found| found.is_some())
}

/// Add `amount` (possibly negative) to a student's `paid_fee`. Returns the
/// number of rows touched so callers can tell a missing student apart.
pub(crate) fn adjust_paid_fee(conn: &Connection, id: i64, amount: f64) -> Result<usize, StoreError> {
    let updated = conn
        .execute(
            "UPDATE students SET paid_fee = paid_fee + ?1 WHERE id = ?2",
            params![amount, id],
        )
        .context("failed to update paid fee")?;
    debug!(student_id = id, amount, updated, "paid fee adjusted");
    Ok(updated)
}

/// Overwrite `school_fee` for every student enrolled in a class.
pub(crate) fn set_school_fee_for_class(
    conn: &Connection,
    class_id: i64,
    fee: f64,
) -> Result<usize, StoreError> {
    conn.execute(
        "UPDATE students SET school_fee = ?1 WHERE class_id = ?2",
        params![fee, class_id],
    )
    .context("failed to cascade class fee to students")
}
