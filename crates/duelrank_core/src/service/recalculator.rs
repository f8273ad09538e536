//! Replay path of the ledger.
//!
//! # Invariants
//! - Replay runs inside one IMMEDIATE transaction, so no vote can be
//!   recorded against an affected submission mid-replay.
//! - Only target submissions are rewritten. Other affected submissions act
//!   as opponents starting from their stored rating and keep it.
//! - Targets that no longer exist are replayed but never persisted.

use super::EngineResult;
use crate::model::{SubmissionId, VoteId};
use crate::rating::ReplayPlan;
use crate::repo::submission_repo::{SqliteSubmissionRepository, SubmissionRepository};
use crate::repo::vote_repo::{SqliteVoteRepository, VoteRepository};
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// What one replay did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecalcReport {
    /// Votes re-applied, in replay order.
    pub replayed_votes: usize,
    /// Final persisted rating per existing target submission.
    pub ratings: BTreeMap<SubmissionId, f64>,
    /// Target ids with no stored row.
    pub skipped_targets: Vec<SubmissionId>,
}

impl RecalcReport {
    pub fn rating_of(&self, id: SubmissionId) -> Option<f64> {
        self.ratings.get(&id).copied()
    }
}

/// Standalone recalculation trigger.
pub struct RatingRecalculator<'conn> {
    conn: &'conn Connection,
}

impl<'conn> RatingRecalculator<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Rederives the ratings of `targets` from the ledger minus `excluded`.
    ///
    /// # Errors
    /// - `StorageFailure`; the transaction rolls back and no rating changes.
    pub fn recalculate(
        &self,
        targets: &[SubmissionId],
        excluded: &[VoteId],
    ) -> EngineResult<RecalcReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let report = replay_in_scope(&tx, targets, excluded)?;
        tx.commit()?;
        Ok(report)
    }
}

/// Replays on a connection whose write transaction the caller already holds.
pub(crate) fn replay_in_scope(
    conn: &Connection,
    targets: &[SubmissionId],
    excluded: &[VoteId],
) -> EngineResult<RecalcReport> {
    let started_at = Instant::now();
    let targets: Vec<SubmissionId> = targets
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let votes = SqliteVoteRepository::new(conn);
    let submissions = SqliteSubmissionRepository::new(conn);

    let plan = ReplayPlan::new(
        targets.iter().copied(),
        votes.list_votes_touching(&targets, excluded)?,
    );
    let affected: Vec<SubmissionId> = plan.affected().into_iter().collect();
    let current: BTreeMap<SubmissionId, f64> = submissions
        .get_submissions(&affected)?
        .into_iter()
        .map(|submission| (submission.id, submission.rating))
        .collect();

    let working = plan.run(&current);

    let mut report = RecalcReport {
        replayed_votes: plan.votes().len(),
        ..RecalcReport::default()
    };
    for id in plan.targets() {
        if !current.contains_key(id) {
            debug!(
                "event=recalculate module=replay status=skip submission={} reason=missing",
                id
            );
            report.skipped_targets.push(*id);
            continue;
        }
        let rating = working[id];
        submissions.write_rating(*id, rating)?;
        report.ratings.insert(*id, rating);
    }

    info!(
        "event=recalculate module=replay status=ok targets={} affected={} replayed_votes={} excluded={} duration_ms={}",
        report.ratings.len(),
        affected.len(),
        report.replayed_votes,
        excluded.len(),
        started_at.elapsed().as_millis()
    );
    Ok(report)
}
