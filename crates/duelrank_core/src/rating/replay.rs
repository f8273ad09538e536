//! Chronological ledger replay.
//!
//! # Invariants
//! - Votes replay in `(cast_at ASC, id ASC)` order regardless of input order.
//! - Target submissions restart from `BASELINE_RATING`; every other
//!   submission in the affected set restarts from its current rating.
//! - One bounded pass: the affected set is fixed when the plan is built.

use super::elo::{apply_win, BASELINE_RATING};
use crate::model::{SubmissionId, Vote};
use std::collections::{BTreeMap, BTreeSet};

/// Replay input: the target set plus the votes to re-apply.
#[derive(Debug, Clone)]
pub struct ReplayPlan {
    targets: BTreeSet<SubmissionId>,
    votes: Vec<Vote>,
}

impl ReplayPlan {
    pub fn new(targets: impl IntoIterator<Item = SubmissionId>, mut votes: Vec<Vote>) -> Self {
        votes.sort_by(|a, b| a.cast_at.cmp(&b.cast_at).then(a.id.cmp(&b.id)));
        Self {
            targets: targets.into_iter().collect(),
            votes,
        }
    }

    pub fn targets(&self) -> &BTreeSet<SubmissionId> {
        &self.targets
    }

    /// Votes in replay order.
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Every submission whose working rating the replay tracks: the targets
    /// plus every submission appearing in a replayed vote.
    pub fn affected(&self) -> BTreeSet<SubmissionId> {
        let mut affected = self.targets.clone();
        for vote in &self.votes {
            affected.insert(vote.winner);
            affected.insert(vote.loser);
        }
        affected
    }

    /// Runs the replay against `current` ratings.
    ///
    /// Submissions missing from `current` (already deleted rows) start at
    /// baseline; callers decide whether to persist them.
    pub fn run(&self, current: &BTreeMap<SubmissionId, f64>) -> BTreeMap<SubmissionId, f64> {
        let mut working: BTreeMap<SubmissionId, f64> = self
            .affected()
            .into_iter()
            .map(|id| {
                let start = if self.targets.contains(&id) {
                    BASELINE_RATING
                } else {
                    current.get(&id).copied().unwrap_or(BASELINE_RATING)
                };
                (id, start)
            })
            .collect();

        for vote in &self.votes {
            let winner = working[&vote.winner];
            let loser = working[&vote.loser];
            let outcome = apply_win(winner, loser);
            working.insert(vote.winner, outcome.winner);
            working.insert(vote.loser, outcome.loser);
        }

        working
    }
}
