//! Error types shared by the record store, the command router, and the
//! bridge. Messages are written for people: the presentation layer shows them
//! exactly as they come out of `Display`.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message reported whenever an update or delete touched zero rows.
pub const NOT_FOUND_MESSAGE: &str = "no record found with the given id.";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record found with the given id.")]
    NotFound,
    #[error("{context}: {source}")]
    Sqlite {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("reset failed while {step}: {source}")]
    Reset {
        step: ResetStep,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create data directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// True when SQLite rejected the statement because of a constraint
    /// (not-null, foreign key, unique).
    pub fn is_constraint_violation(&self) -> bool {
        let source = match self {
            StoreError::Sqlite { source, .. } | StoreError::Reset { source, .. } => source,
            _ => return false,
        };
        matches!(
            source.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        )
    }
}

/// Attach a "failed to ..." description to a rusqlite result, in the same
/// spirit as `anyhow::Context` but keeping the error typed.
pub(crate) trait SqlResultExt<T> {
    fn context(self, context: &'static str) -> Result<T, StoreError>;
}

impl<T> SqlResultExt<T> for Result<T, rusqlite::Error> {
    fn context(self, context: &'static str) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Sqlite { context, source })
    }
}

/// Individual steps of the destructive reset, used to report where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetStep {
    OpenConnection,
    DisableForeignKeys,
    BeginTransaction,
    ListTables,
    DropTable(String),
    ApplySchema,
    Commit,
    EnableForeignKeys,
    CloseConnection,
}

impl fmt::Display for ResetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetStep::OpenConnection => write!(f, "opening reset connection"),
            ResetStep::DisableForeignKeys => write!(f, "disabling foreign keys"),
            ResetStep::BeginTransaction => write!(f, "starting reset transaction"),
            ResetStep::ListTables => write!(f, "listing tables"),
            ResetStep::DropTable(name) => write!(f, "dropping table {name}"),
            ResetStep::ApplySchema => write!(f, "applying schema"),
            ResetStep::Commit => write!(f, "committing reset"),
            ResetStep::EnableForeignKeys => write!(f, "enabling foreign keys"),
            ResetStep::CloseConnection => write!(f, "closing reset connection"),
        }
    }
}

/// Everything a router handler can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A required field was missing or blank. Caught before the store runs.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The request could not be decoded into a known operation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CommandError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CommandError::Validation(message.into())
    }
}

/// Failure half of the wire envelope: `{ "success": false, "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{error}")]
pub struct Failure {
    pub error: String,
}

impl Failure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl From<CommandError> for Failure {
    fn from(err: CommandError) -> Self {
        Failure::new(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to start the command router thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("the command router thread panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Store(#[from] StoreError),
}
