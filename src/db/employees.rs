use rusqlite::{params, Connection, Row};

use crate::error::{SqlResultExt, StoreError};
use crate::models::{Employee, EmployeeFields};

fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        fields: EmployeeFields {
            name: row.get(1)?,
            surname: row.get(2)?,
            gender: row.get(3)?,
            date_of_birth: row.get(4)?,
            role: row.get(5)?,
            qualification: row.get(6)?,
            salary: row.get(7)?,
            join_date: row.get(8)?,
            experience: row.get(9)?,
            phone: row.get(10)?,
            email: row.get(11)?,
            address: row.get(12)?,
        },
    })
}

pub fn fetch_employees(conn: &Connection) -> Result<Vec<Employee>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, surname, gender, date_of_birth, role, qualification, salary,
                    join_date, experience, phone, email, address
             FROM employees
             ORDER BY surname COLLATE NOCASE, name COLLATE NOCASE, id",
        )
        .context("failed to prepare employee query")?;

    let employees = stmt
        .query_map([], employee_from_row)
        .context("failed to load employees")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect employees")?;

    Ok(employees)
}

pub fn create_employee(conn: &Connection, fields: &EmployeeFields) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO employees (
            name, surname, gender, date_of_birth, role, qualification, salary,
            join_date, experience, phone, email, address
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            fields.name,
            fields.surname,
            fields.gender,
            fields.date_of_birth,
            fields.role,
            fields.qualification,
            fields.salary,
            fields.join_date,
            fields.experience,
            fields.phone,
            fields.email,
            fields.address,
        ],
    )
    .context("failed to insert employee")?;

    Ok(conn.last_insert_rowid())
}

pub fn update_employee(
    conn: &Connection,
    id: i64,
    fields: &EmployeeFields,
) -> Result<(), StoreError> {
    let updated = conn
        .execute(
            "UPDATE employees SET
                name = ?1, surname = ?2, gender = ?3, date_of_birth = ?4, role = ?5,
                qualification = ?6, salary = ?7, join_date = ?8, experience = ?9,
                phone = ?10, email = ?11, address = ?12
             WHERE id = ?13",
            params![
                fields.name,
                fields.surname,
                fields.gender,
                fields.date_of_birth,
                fields.role,
                fields.qualification,
                fields.salary,
                fields.join_date,
                fields.experience,
                fields.phone,
                fields.email,
                fields.address,
                id,
            ],
        )
        .context("failed to update employee")?;

    if updated == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

pub fn delete_employee(conn: &Connection, id: i64) -> Result<(), StoreError> {
    let deleted = conn
        .execute("DELETE FROM employees WHERE id = ?1", params![id])
        .context("failed to delete employee")?;

    if deleted == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}
