use rusqlite::{params, Connection};
use tracing::info;

use super::students::set_school_fee_for_class;
use crate::error::{SqlResultExt, StoreError};
use crate::models::{NewClass, SchoolClass};

pub fn fetch_classes(conn: &Connection) -> Result<Vec<SchoolClass>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id, name, class_fees FROM classes ORDER BY name COLLATE NOCASE, id")
        .context("failed to prepare class query")?;

    let classes = stmt
        .query_map([], |row| {
            Ok(SchoolClass {
                id: row.get(0)?,
                name: row.get(1)?,
                class_fees: row.get(2)?,
            })
        })
        .context("failed to load classes")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect classes")?;

    Ok(classes)
}

pub fn create_class(conn: &Connection, class: &NewClass) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO classes (name, class_fees) VALUES (?1, ?2)",
        params![class.name, class.class_fees],
    )
    .context("failed to insert class")?;

    Ok(conn.last_insert_rowid())
}

/// Update a class and overwrite the school fee of every student enrolled in
/// it. Both statements share one transaction: either the class and all of its
/// students change, or nothing does. Returns how many students were updated.
pub fn update_class(conn: &mut Connection, id: i64, class: &NewClass) -> Result<usize, StoreError> {
    let tx = conn
        .transaction()
        .context("failed to start class update")?;

    let updated = tx
        .execute(
            "UPDATE classes SET name = ?1, class_fees = ?2 WHERE id = ?3",
            params![class.name, class.class_fees, id],
        )
        .context("failed to update class")?;
    if updated == 0 {
        return Err(StoreError::NotFound);
    }

    let students = set_school_fee_for_class(&tx, id, class.class_fees)?;
    tx.commit().context("failed to commit class update")?;

    info!(class_id = id, fee = class.class_fees, students, "class fee cascaded");
    Ok(students)
}

/// Delete a class. Students enrolled in it keep their rows with no class.
pub fn delete_class(conn: &Connection, id: i64) -> Result<(), StoreError> {
    let deleted = conn
        .execute("DELETE FROM classes WHERE id = ?1", params![id])
        .context("failed to delete class")?;

    if deleted == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}
