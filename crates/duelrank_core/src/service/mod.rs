//! Engine entry points.
//!
//! # Responsibility
//! - Pair selection, vote recording, rating replay, leaderboard reads and
//!   the administrative deletion flows.
//! - Translate storage errors into the engine error taxonomy.
//!
//! # Invariants
//! - Ratings change only inside `VoteRecorder` and `RatingRecalculator`
//!   (the administrative flows reach the latter's in-transaction replay).
//! - Writers open an IMMEDIATE transaction before their first read.
//! - Duplicate votes are absorbed, never surfaced as errors.

pub mod admin;
pub mod leaderboard;
pub mod pair_selector;
pub mod recalculator;
pub mod vote_recorder;

use crate::model::{ModelError, SubmissionId, VoteId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// A referenced ledger entity that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRef {
    Submission(SubmissionId),
    Vote(VoteId),
}

/// Why a request was rejected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidArgument {
    /// Winner and loser are the same submission.
    SelfComparison(SubmissionId),
    /// The two submissions compete in different categories.
    CrossCategory {
        winner: SubmissionId,
        loser: SubmissionId,
    },
    /// One side is disqualified and cannot be compared.
    Disqualified(SubmissionId),
    /// The voter authored one side.
    OwnSubmission(SubmissionId),
    /// Voter identity failed validation.
    Voter(String),
}

impl Display for InvalidArgument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfComparison(id) => write!(f, "submission {id} compared with itself"),
            Self::CrossCategory { winner, loser } => {
                write!(f, "submissions {winner} and {loser} are in different categories")
            }
            Self::Disqualified(id) => write!(f, "submission {id} is disqualified"),
            Self::OwnSubmission(id) => write!(f, "voter authored submission {id}"),
            Self::Voter(message) => write!(f, "invalid voter: {message}"),
        }
    }
}

/// Engine error taxonomy.
#[derive(Debug)]
pub enum EngineError {
    NotFound(MissingRef),
    InvalidArgument(InvalidArgument),
    /// The storage transaction failed and was rolled back in full.
    StorageFailure(RepoError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(MissingRef::Submission(id)) => write!(f, "submission not found: {id}"),
            Self::NotFound(MissingRef::Vote(id)) => write!(f, "vote not found: {id}"),
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::SubmissionNotFound(id) => Self::NotFound(MissingRef::Submission(id)),
            RepoError::VoteNotFound(id) => Self::NotFound(MissingRef::Vote(id)),
            RepoError::Validation(ModelError::SelfComparison(id)) => {
                Self::InvalidArgument(InvalidArgument::SelfComparison(id))
            }
            RepoError::Validation(ModelError::EmptyVoterId) => Self::InvalidArgument(
                InvalidArgument::Voter(ModelError::EmptyVoterId.to_string()),
            ),
            other => Self::StorageFailure(other),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageFailure(value.into())
    }
}

impl From<InvalidArgument> for EngineError {
    fn from(value: InvalidArgument) -> Self {
        Self::InvalidArgument(value)
    }
}
