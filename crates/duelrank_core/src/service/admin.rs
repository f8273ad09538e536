//! Administrative ledger corrections.
//!
//! # Responsibility
//! - Submission deletion, voter-account deletion, manual vote deletion.
//! - Qualification grading with a grader/time audit stamp.
//!
//! # Invariants
//! - Every deletion removes the votes, removes any submission rows, and
//!   replays every surviving submission those votes touched, all inside one
//!   IMMEDIATE transaction. A failure anywhere leaves the ledger untouched.
//! - Grading never touches a rating.

use super::recalculator::{replay_in_scope, RecalcReport};
use super::{EngineError, EngineResult, MissingRef};
use crate::model::submission::now_epoch_ms;
use crate::model::{Qualification, SubmissionId, Vote, VoteId, VoterId};
use crate::repo::submission_repo::{
    SqliteSubmissionRepository, SubmissionQuery, SubmissionRepository,
};
use crate::repo::vote_repo::{SqliteVoteRepository, VoteRepository};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;

/// Outcome of one administrative deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionReport {
    pub removed_votes: Vec<VoteId>,
    pub removed_submissions: Vec<SubmissionId>,
    /// Replay of the surviving submissions touched by the removed votes.
    pub recalc: RecalcReport,
}

pub struct AdminService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AdminService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Deletes one submission together with every vote referencing it.
    pub fn delete_submission(&self, id: SubmissionId) -> EngineResult<DeletionReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let submissions = SqliteSubmissionRepository::new(&tx);
        let votes = SqliteVoteRepository::new(&tx);

        if submissions.get_submission(id)?.is_none() {
            return Err(EngineError::NotFound(MissingRef::Submission(id)));
        }
        let removed = votes.list_votes_for_submission(id)?;

        let report = remove_and_replay(&tx, &removed, &[id])?;
        tx.commit()?;
        info!(
            "event=delete_submission module=admin status=ok submission={} removed_votes={}",
            id,
            report.removed_votes.len()
        );
        Ok(report)
    }

    /// Deletes a voter account's footprint: the votes it cast, its
    /// submissions, and every vote others cast on those submissions.
    pub fn delete_voter_account(&self, voter: &VoterId) -> EngineResult<DeletionReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let submissions = SqliteSubmissionRepository::new(&tx);
        let votes = SqliteVoteRepository::new(&tx);

        let owned: Vec<SubmissionId> = submissions
            .list_submissions(&SubmissionQuery {
                owner: Some(voter.clone()),
                include_disqualified: true,
                ..SubmissionQuery::default()
            })?
            .into_iter()
            .map(|submission| submission.id)
            .collect();

        let mut removed = votes.list_votes_by_voter(voter)?;
        removed.extend(votes.list_votes_touching(&owned, &[])?);
        let mut seen = BTreeSet::new();
        removed.retain(|vote| seen.insert(vote.id));

        let report = remove_and_replay(&tx, &removed, &owned)?;
        tx.commit()?;
        info!(
            "event=delete_voter_account module=admin status=ok removed_submissions={} removed_votes={}",
            report.removed_submissions.len(),
            report.removed_votes.len()
        );
        Ok(report)
    }

    /// Deletes specific ledger rows (manual correction).
    ///
    /// # Errors
    /// - `NotFound` when any id is absent; nothing is deleted.
    pub fn delete_votes(&self, ids: &[VoteId]) -> EngineResult<DeletionReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let votes = SqliteVoteRepository::new(&tx);

        let mut removed = Vec::with_capacity(ids.len());
        for id in ids.iter().copied().collect::<BTreeSet<_>>() {
            let vote = votes
                .get_vote(id)?
                .ok_or(EngineError::NotFound(MissingRef::Vote(id)))?;
            removed.push(vote);
        }

        let report = remove_and_replay(&tx, &removed, &[])?;
        tx.commit()?;
        info!(
            "event=delete_votes module=admin status=ok removed_votes={} recalculated={}",
            report.removed_votes.len(),
            report.recalc.ratings.len()
        );
        Ok(report)
    }

    /// Grades a submission on behalf of `grader`, stamped with the wall
    /// clock. Disqualifying it removes it from pairing and default
    /// leaderboards; its rating and votes stay as they are.
    pub fn set_qualification(
        &self,
        id: SubmissionId,
        qualification: Qualification,
        grader: &VoterId,
    ) -> EngineResult<()> {
        SqliteSubmissionRepository::new(self.conn).set_qualification(
            id,
            qualification,
            grader,
            now_epoch_ms(),
        )?;
        info!(
            "event=set_qualification module=admin status=ok submission={} qualification={:?}",
            id, qualification
        );
        Ok(())
    }
}

/// Deletes `removed` votes and `doomed` submissions, then replays every
/// surviving submission the removed votes touched.
fn remove_and_replay(
    conn: &Connection,
    removed: &[Vote],
    doomed: &[SubmissionId],
) -> EngineResult<DeletionReport> {
    let doomed_set: BTreeSet<SubmissionId> = doomed.iter().copied().collect();
    let removed_ids: Vec<VoteId> = removed.iter().map(|vote| vote.id).collect();
    let touched: Vec<SubmissionId> = removed
        .iter()
        .flat_map(|vote| [vote.winner, vote.loser])
        .filter(|id| !doomed_set.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    SqliteVoteRepository::new(conn).delete_votes(&removed_ids)?;
    let submissions = SqliteSubmissionRepository::new(conn);
    for id in &doomed_set {
        submissions.delete_submission(*id)?;
    }

    let recalc = replay_in_scope(conn, &touched, &removed_ids)?;
    Ok(DeletionReport {
        removed_votes: removed_ids,
        removed_submissions: doomed_set.into_iter().collect(),
        recalc,
    })
}
