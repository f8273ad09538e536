//! Idempotent vote recording.
//!
//! # Invariants
//! - The duplicate check, both rating writes and the ledger append share one
//!   IMMEDIATE transaction: readers never see a vote without its rating
//!   change, or the reverse.
//! - A repeated (voter, pair) request commits nothing and reports
//!   `AlreadyRecorded`.
//! - Eligibility is re-checked here; a pair handed out earlier may have gone
//!   stale.

use super::{EngineResult, InvalidArgument};
use crate::model::submission::now_epoch_ms;
use crate::model::{NewVote, Submission, SubmissionId, VoteId, VoterId};
use crate::rating::apply_win;
use crate::repo::submission_repo::{SqliteSubmissionRepository, SubmissionRepository};
use crate::repo::vote_repo::{SqliteVoteRepository, VoteRepository};
use crate::repo::RepoError;
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Result of a vote request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    /// New ledger row with the ratings it produced.
    Recorded {
        vote_id: VoteId,
        winner_rating: f64,
        loser_rating: f64,
    },
    /// The voter already judged this pair; nothing changed.
    AlreadyRecorded { vote_id: VoteId },
}

impl VoteOutcome {
    pub fn vote_id(&self) -> VoteId {
        match self {
            Self::Recorded { vote_id, .. } | Self::AlreadyRecorded { vote_id } => *vote_id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

/// Append path of the ledger.
pub struct VoteRecorder<'conn> {
    conn: &'conn Connection,
}

impl<'conn> VoteRecorder<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Records "winner beats loser" for `voter`, stamped with the wall clock.
    pub fn record_vote(
        &self,
        voter: &VoterId,
        winner: SubmissionId,
        loser: SubmissionId,
    ) -> EngineResult<VoteOutcome> {
        self.record_vote_at(voter, winner, loser, now_epoch_ms())
    }

    /// Records a vote with a caller-supplied timestamp (ledger imports).
    ///
    /// # Errors
    /// - `InvalidArgument` for self-comparison, cross-category pairs,
    ///   disqualified sides or the voter's own submissions.
    /// - `NotFound` when either submission is missing.
    /// - `StorageFailure` when the transaction fails; nothing is persisted.
    pub fn record_vote_at(
        &self,
        voter: &VoterId,
        winner: SubmissionId,
        loser: SubmissionId,
        cast_at: i64,
    ) -> EngineResult<VoteOutcome> {
        let new_vote = NewVote::new(voter.clone(), winner, loser, cast_at)
            .map_err(RepoError::from)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let votes = SqliteVoteRepository::new(&tx);
        let submissions = SqliteSubmissionRepository::new(&tx);

        if let Some(existing) = votes.find_vote_for_pair(voter, winner, loser)? {
            debug!(
                "event=vote_record module=voting status=ok outcome=duplicate vote_id={}",
                existing.id
            );
            return Ok(VoteOutcome::AlreadyRecorded {
                vote_id: existing.id,
            });
        }

        let winner_row = load_required(&submissions, winner)?;
        let loser_row = load_required(&submissions, loser)?;
        if let Err(reason) = check_eligibility(voter, &winner_row, &loser_row) {
            warn!(
                "event=vote_record module=voting status=rejected winner={} loser={} reason={}",
                winner, loser, reason
            );
            return Err(reason.into());
        }

        let outcome = apply_win(winner_row.rating, loser_row.rating);
        submissions.write_rating(winner, outcome.winner)?;
        submissions.write_rating(loser, outcome.loser)?;
        let stored = votes.insert_vote(&new_vote)?;
        tx.commit()?;

        info!(
            "event=vote_record module=voting status=ok outcome=recorded vote_id={} winner={} loser={} winner_rating={:.3} loser_rating={:.3}",
            stored.id, winner, loser, outcome.winner, outcome.loser
        );
        Ok(VoteOutcome::Recorded {
            vote_id: stored.id,
            winner_rating: outcome.winner,
            loser_rating: outcome.loser,
        })
    }
}

fn load_required(
    submissions: &SqliteSubmissionRepository<'_>,
    id: SubmissionId,
) -> EngineResult<Submission> {
    submissions
        .get_submission(id)?
        .ok_or_else(|| RepoError::SubmissionNotFound(id).into())
}

fn check_eligibility(
    voter: &VoterId,
    winner: &Submission,
    loser: &Submission,
) -> Result<(), InvalidArgument> {
    if winner.category != loser.category {
        return Err(InvalidArgument::CrossCategory {
            winner: winner.id,
            loser: loser.id,
        });
    }
    for side in [winner, loser] {
        if side.is_eligible_for(voter) {
            continue;
        }
        return Err(if side.qualification.is_disqualified() {
            InvalidArgument::Disqualified(side.id)
        } else {
            InvalidArgument::OwnSubmission(side.id)
        });
    }
    Ok(())
}
