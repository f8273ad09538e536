//! Submission domain model.
//!
//! # Invariants
//! - `rating` is finite and only ever written by vote recording or replay.
//! - New submissions always enter the ledger at the baseline rating.

use super::{ModelError, VoterId};
use crate::rating::BASELINE_RATING;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable submission identifier.
pub type SubmissionId = Uuid;

/// Category a submission competes in. Pairs never cross categories.
pub type CategoryId = i64;

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualification {
    /// Not reviewed yet. Eligible for pairing.
    Pending,
    /// Reviewed and accepted.
    Approved,
    /// Excluded from pairing and, by default, from leaderboards.
    Disqualified,
}

impl Qualification {
    pub fn is_disqualified(self) -> bool {
        matches!(self, Self::Disqualified)
    }
}

/// Persisted submission with its current derived rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub owner: VoterId,
    pub category: CategoryId,
    pub rating: f64,
    pub qualification: Qualification,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Who last set `qualification`. `None` until first graded.
    pub graded_by: Option<VoterId>,
    /// When `qualification` was last set, Unix epoch milliseconds.
    pub graded_at: Option<i64>,
}

impl Submission {
    /// Checks the finite-rating and grading-audit invariants.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.rating.is_finite() {
            return Err(ModelError::NonFiniteRating(self.rating));
        }
        if self.graded_by.is_some() != self.graded_at.is_some() {
            return Err(ModelError::IncompleteGrading(self.id));
        }
        Ok(())
    }

    /// Returns whether `voter` may be offered this submission in a pair.
    pub fn is_eligible_for(&self, voter: &VoterId) -> bool {
        !self.qualification.is_disqualified() && &self.owner != voter
    }
}

/// Insert model for the upstream upload flow.
///
/// Carries no rating: storage assigns `BASELINE_RATING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub id: SubmissionId,
    pub owner: VoterId,
    pub category: CategoryId,
    pub qualification: Qualification,
    pub created_at: i64,
}

impl NewSubmission {
    /// Creates a pending submission with a fresh id, stamped now.
    pub fn new(owner: VoterId, category: CategoryId) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            category,
            qualification: Qualification::Pending,
            created_at: now_epoch_ms(),
        }
    }

    /// Overrides the creation time, e.g. when importing existing rows.
    pub fn created_at(mut self, epoch_ms: i64) -> Self {
        self.created_at = epoch_ms;
        self
    }

    pub fn qualification(mut self, qualification: Qualification) -> Self {
        self.qualification = qualification;
        self
    }

    /// Materializes the row as storage will see it.
    pub fn into_submission(self) -> Submission {
        Submission {
            id: self.id,
            owner: self.owner,
            category: self.category,
            rating: BASELINE_RATING,
            qualification: self.qualification,
            created_at: self.created_at,
            graded_by: None,
            graded_at: None,
        }
    }
}

/// Current wall clock in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
