//! Rating store: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the storage contracts the engine consumes (`SubmissionRepository`,
//!   `VoteRepository`).
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Public repository APIs never write a rating or append/delete a vote;
//!   those writers are crate-private and only reachable from vote recording,
//!   replay and the administrative deletion flows.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories accept a `Transaction` anywhere a `Connection` is expected,
//!   so writers run every statement inside their own transaction.

pub mod submission_repo;
pub mod vote_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::{ModelError, SubmissionId, VoteId};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-layer error for submission and vote persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap failure.
    Db(DbError),
    /// Value rejected by model validation before reaching SQL.
    Validation(ModelError),
    SubmissionNotFound(SubmissionId),
    VoteNotFound(VoteId),
    /// Persisted row cannot be converted into a valid model.
    InvalidData(String),
    /// Connection schema is not at the version this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::SubmissionNotFound(id) => write!(f, "submission not found: {id}"),
            Self::VoteNotFound(id) => write!(f, "vote not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted ledger data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "rating store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "rating store requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ModelError> for RepoError {
    fn from(value: ModelError) -> Self {
        Self::Validation(value)
    }
}

/// Verifies the connection is migrated and carries the ledger tables.
pub(crate) fn ensure_ledger_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["submissions", "votes"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

/// `?, ?, ?` for a dynamic `IN (...)` list.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
