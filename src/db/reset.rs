use rusqlite::Connection;
use tracing::{info, warn};

use super::connection::{Location, Store, SCHEMA_SQL};
use crate::error::{ResetStep, StoreError};

impl Store {
    /// Drop every user table and rebuild the schema from the bundled script.
    /// All data is lost.
    ///
    /// File-backed stores run the reset on a dedicated connection that is
    /// closed on every exit path; in-memory stores reuse the primary one. The
    /// drops and the schema rebuild share a transaction, so a failure part
    /// way through leaves the previous tables in place.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        let result = match self.location().clone() {
            Location::File(path) => {
                let conn = Connection::open(&path).map_err(|source| StoreError::Reset {
                    step: ResetStep::OpenConnection,
                    source,
                })?;
                let outcome = rebuild(&conn);
                let closed = conn.close().map_err(|(_, source)| StoreError::Reset {
                    step: ResetStep::CloseConnection,
                    source,
                });
                outcome.and(closed)
            }
            Location::Memory => rebuild(&self.conn),
        };

        match &result {
            Ok(()) => info!("database reset"),
            Err(err) => warn!(error = %err, "database reset failed"),
        }
        result
    }
}

fn step<T>(step: ResetStep, result: rusqlite::Result<T>) -> Result<T, StoreError> {
    result.map_err(|source| StoreError::Reset { step, source })
}

fn rebuild(conn: &Connection) -> Result<(), StoreError> {
    step(
        ResetStep::DisableForeignKeys,
        conn.execute_batch("PRAGMA foreign_keys = OFF"),
    )?;

    let rebuilt = drop_and_recreate(conn);

    // Foreign keys come back on even when the rebuild failed.
    let restored = step(
        ResetStep::EnableForeignKeys,
        conn.execute_batch("PRAGMA foreign_keys = ON"),
    );
    rebuilt.and(restored)
}

fn drop_and_recreate(conn: &Connection) -> Result<(), StoreError> {
    let tx = step(ResetStep::BeginTransaction, conn.unchecked_transaction())?;

    let tables = step(ResetStep::ListTables, user_tables(&tx))?;
    for table in tables {
        let sql = format!("DROP TABLE IF EXISTS \"{}\"", table.replace('"', "\"\""));
        step(ResetStep::DropTable(table), tx.execute_batch(&sql))?;
    }

    step(ResetStep::ApplySchema, tx.execute_batch(SCHEMA_SQL))?;
    step(ResetStep::Commit, tx.commit())
}

/// User tables, leaving out `sqlite_sequence` and other SQLite internals.
fn user_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tables)
}
