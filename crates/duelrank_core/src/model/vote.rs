//! Vote ledger model.
//!
//! # Invariants
//! - Votes are immutable once written.
//! - `winner != loser`.
//! - One voter holds at most one vote per `UnorderedPair`.

use super::{ModelError, SubmissionId, VoterId};
use serde::{Deserialize, Serialize};

/// Ledger row id. Monotonic and never reused, so it doubles as the replay
/// tie-breaker for votes sharing a timestamp.
pub type VoteId = i64;

/// Persisted pairwise decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter: VoterId,
    pub winner: SubmissionId,
    pub loser: SubmissionId,
    /// Unix epoch milliseconds.
    pub cast_at: i64,
}

impl Vote {
    pub fn pair(&self) -> UnorderedPair {
        UnorderedPair::new(self.winner, self.loser)
    }
}

/// Insert model for one decision, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub voter: VoterId,
    pub winner: SubmissionId,
    pub loser: SubmissionId,
    pub cast_at: i64,
}

impl NewVote {
    pub fn new(
        voter: VoterId,
        winner: SubmissionId,
        loser: SubmissionId,
        cast_at: i64,
    ) -> Result<Self, ModelError> {
        if winner == loser {
            return Err(ModelError::SelfComparison(winner));
        }
        Ok(Self {
            voter,
            winner,
            loser,
            cast_at,
        })
    }
}

/// Orientation-free pair key: `(a, b)` and `(b, a)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnorderedPair {
    low: SubmissionId,
    high: SubmissionId,
}

impl UnorderedPair {
    pub fn new(a: SubmissionId, b: SubmissionId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}
