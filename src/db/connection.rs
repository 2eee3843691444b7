use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{SqlResultExt, StoreError};

/// Schema script bundled into the binary. Every statement is `IF NOT EXISTS`
/// so the same script initializes a fresh file and rebuilds after a reset.
pub(crate) const SCHEMA_SQL: &str = include_str!("../../schema/schema.sql");

/// Where the store's data lives. The reset path needs to know whether a
/// second connection can be opened to the same database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Memory,
}

/// Handle to the embedded SQLite database. Created once at startup and
/// handed to the command router, which owns it until shutdown.
pub struct Store {
    pub(crate) conn: Connection,
    location: Location,
}

impl Store {
    /// Open (or create) the database file, enable foreign keys, and apply the
    /// bundled schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).context("failed to open SQLite database")?;
        let store = Self {
            conn,
            location: Location::File(path.to_path_buf()),
        };
        store.ensure_schema()?;
        info!(path = %path.display(), "record store opened");
        Ok(store)
    }

    /// In-memory store with the full schema applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        let store = Self {
            conn,
            location: Location::Memory,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, reporting any error SQLite raises while
    /// finalizing it.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn
            .close()
            .map_err(|(_, source)| source)
            .context("failed to close SQLite database")?;
        debug!("record store closed");
        Ok(())
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON")
            .context("failed to enable foreign keys")?;
        self.conn
            .execute_batch(SCHEMA_SQL)
            .context("failed to apply schema")?;
        Ok(())
    }
}
