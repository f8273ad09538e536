//! Domain model for the pairwise rating engine.
//!
//! # Responsibility
//! - Define submissions, votes and voter identities shared by every layer.
//! - Keep validation rules next to the data they constrain.
//!
//! # Invariants
//! - A submission rating is derived from the vote ledger and always finite.
//! - A vote never compares a submission with itself.

pub mod submission;
pub mod vote;
pub mod voter;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub use submission::{CategoryId, NewSubmission, Qualification, Submission, SubmissionId};
pub use vote::{NewVote, UnorderedPair, Vote, VoteId};
pub use voter::VoterId;

/// Validation failure for domain values.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Voter identity is blank after normalization.
    EmptyVoterId,
    /// Rating is NaN or infinite.
    NonFiniteRating(f64),
    /// Winner and loser are the same submission.
    SelfComparison(SubmissionId),
    /// Only one of grader and grading time is present.
    IncompleteGrading(SubmissionId),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyVoterId => write!(f, "voter id must not be empty"),
            Self::NonFiniteRating(value) => write!(f, "rating must be finite, got {value}"),
            Self::SelfComparison(id) => {
                write!(f, "submission {id} cannot be compared with itself")
            }
            Self::IncompleteGrading(id) => {
                write!(f, "submission {id} has a grader without a grading time or vice versa")
            }
        }
    }
}

impl Error for ModelError {}
