use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::students::{adjust_paid_fee, student_exists};
use crate::error::{SqlResultExt, StoreError};
use crate::models::{NewPayment, Payment};

const PAYMENT_COLUMNS: &str = "p.id, p.title, p.amount_paid, p.discount, p.payment_date,
    p.student_id, CASE WHEN s.id IS NULL THEN NULL ELSE TRIM(s.name || ' ' || s.surname) END";

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        title: row.get(1)?,
        amount_paid: row.get(2)?,
        discount: row.get(3)?,
        payment_date: row.get(4)?,
        student_id: row.get(5)?,
        student_name: row.get(6)?,
    })
}

/// Every recorded payment, newest first.
pub fn fetch_all_payments(conn: &Connection) -> Result<Vec<Payment>, StoreError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS}
         FROM student_payments p
         LEFT JOIN students s ON s.id = p.student_id
         ORDER BY p.payment_date DESC, p.id DESC"
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare payment query")?;

    let payments = stmt
        .query_map([], payment_from_row)
        .context("failed to load payments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect payments")?;

    Ok(payments)
}

/// Payments recorded against a single student, newest first.
pub fn fetch_payments_for_student(
    conn: &Connection,
    student_id: i64,
) -> Result<Vec<Payment>, StoreError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS}
         FROM student_payments p
         LEFT JOIN students s ON s.id = p.student_id
         WHERE p.student_id = ?1
         ORDER BY p.payment_date DESC, p.id DESC"
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare student payment query")?;

    let payments = stmt
        .query_map([student_id], payment_from_row)
        .context("failed to load student payments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect student payments")?;

    Ok(payments)
}

pub fn fetch_payment(conn: &Connection, id: i64) -> Result<Payment, StoreError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS}
         FROM student_payments p
         LEFT JOIN students s ON s.id = p.student_id
         WHERE p.id = ?1"
    );
    conn.query_row(&sql, [id], payment_from_row)
        .optional()
        .context("failed to load payment")?
        .ok_or(StoreError::NotFound)
}

/// Record a payment and, for tuition fees, credit the owner's `paid_fee` in
/// the same transaction.
pub fn create_payment(conn: &mut Connection, payment: &NewPayment) -> Result<i64, StoreError> {
    let tx = conn
        .transaction()
        .context("failed to start payment")?;

    if !student_exists(&tx, payment.student_id)? {
        return Err(StoreError::NotFound);
    }

    tx.execute(
        "INSERT INTO student_payments (title, amount_paid, discount, payment_date, student_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            payment.title,
            payment.amount_paid,
            payment.discount,
            payment.payment_date,
            payment.student_id,
        ],
    )
    .context("failed to insert payment")?;
    let id = tx.last_insert_rowid();

    let credit = payment.tuition_contribution();
    if credit != 0.0 {
        adjust_paid_fee(&tx, payment.student_id, credit)?;
    }

    tx.commit().context("failed to commit payment")?;
    info!(payment_id = id, student_id = payment.student_id, credit, "payment recorded");
    Ok(id)
}

/// Rewrite a payment and move the owner's `paid_fee` by the difference
/// between the old and new tuition contributions. When the payment changes
/// hands, the old owner loses its contribution and the new owner gains it.
pub fn update_payment(
    conn: &mut Connection,
    id: i64,
    payment: &NewPayment,
) -> Result<(), StoreError> {
    let tx = conn
        .transaction()
        .context("failed to start payment update")?;

    let previous = fetch_payment(&tx, id)?;
    if previous.student_id != payment.student_id && !student_exists(&tx, payment.student_id)? {
        return Err(StoreError::NotFound);
    }

    tx.execute(
        "UPDATE student_payments
         SET title = ?1, amount_paid = ?2, discount = ?3, payment_date = ?4, student_id = ?5
         WHERE id = ?6",
        params![
            payment.title,
            payment.amount_paid,
            payment.discount,
            payment.payment_date,
            payment.student_id,
            id,
        ],
    )
    .context("failed to update payment")?;

    let old_credit = previous.tuition_contribution();
    let new_credit = payment.tuition_contribution();
    if previous.student_id == payment.student_id {
        let delta = new_credit - old_credit;
        if delta != 0.0 {
            adjust_paid_fee(&tx, payment.student_id, delta)?;
        }
    } else {
        // The previous owner may already be deleted, in which case there is
        // no balance left to correct.
        if old_credit != 0.0 {
            adjust_paid_fee(&tx, previous.student_id, -old_credit)?;
        }
        if new_credit != 0.0 {
            adjust_paid_fee(&tx, payment.student_id, new_credit)?;
        }
    }

    tx.commit().context("failed to commit payment update")?;
    debug!(payment_id = id, old_credit, new_credit, "payment revised");
    Ok(())
}
