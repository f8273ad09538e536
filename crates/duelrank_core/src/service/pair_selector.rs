//! Pair selection for a voter.
//!
//! # Invariants
//! - Both sides share a category, neither is disqualified, neither is owned
//!   by the voter, and the voter has no vote on the pair in either
//!   orientation.
//! - Every eligible unseen pair is returned with equal probability.
//! - Read-only. Concurrent callers may receive the same pair; the recorder
//!   absorbs the resulting duplicate.

use super::EngineResult;
use crate::model::{CategoryId, Submission, UnorderedPair, VoterId};
use crate::repo::submission_repo::SubmissionRepository;
use crate::repo::vote_repo::VoteRepository;
use log::debug;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Rejection-sampling attempts inside the chosen category before falling
/// back to exact enumeration of the remaining unseen pairs.
const REJECTION_DRAWS: usize = 32;

/// Two submissions offered for comparison. Orientation carries no meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPair {
    pub first: Submission,
    pub second: Submission,
}

impl ComparisonPair {
    pub fn key(&self) -> UnorderedPair {
        UnorderedPair::new(self.first.id, self.second.id)
    }

    pub fn category(&self) -> CategoryId {
        self.first.category
    }
}

/// Eligible submissions of one category plus the pairs the voter already
/// judged inside it.
struct CategoryPool {
    members: Vec<Submission>,
    seen: HashSet<UnorderedPair>,
}

impl CategoryPool {
    fn key(&self, i: usize, j: usize) -> UnorderedPair {
        UnorderedPair::new(self.members[i].id, self.members[j].id)
    }

    fn unseen(&self) -> u64 {
        let n = self.members.len() as u64;
        (n * n.saturating_sub(1) / 2).saturating_sub(self.seen.len() as u64)
    }

    /// Uniform draw over unseen pairs. Each rejection draw is uniform over
    /// all pairs and accepted only when unseen, and the fallback picks the
    /// k-th unseen pair for uniform k, so the mixture stays uniform.
    fn draw<R: Rng>(&self, rng: &mut R) -> Option<(usize, usize)> {
        let n = self.members.len();
        let unseen = self.unseen();
        if unseen == 0 {
            return None;
        }

        for _ in 0..REJECTION_DRAWS {
            let i = rng.random_range(0..n);
            let mut j = rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            if !self.seen.contains(&self.key(i, j)) {
                return Some((i, j));
            }
        }

        let mut remaining = rng.random_range(0..unseen);
        for i in 0..n {
            for j in (i + 1)..n {
                if self.seen.contains(&self.key(i, j)) {
                    continue;
                }
                if remaining == 0 {
                    return Some((i, j));
                }
                remaining -= 1;
            }
        }
        None
    }
}

/// Read-only pair selector over the rating store.
pub struct PairSelector<S: SubmissionRepository, V: VoteRepository> {
    submissions: S,
    votes: V,
}

impl<S: SubmissionRepository, V: VoteRepository> PairSelector<S, V> {
    pub fn new(submissions: S, votes: V) -> Self {
        Self { submissions, votes }
    }

    /// Returns one eligible unseen pair, or `None` when nothing is left.
    pub fn request_pair(&self, voter: &VoterId) -> EngineResult<Option<ComparisonPair>> {
        self.request_pair_with_rng(voter, &mut rand::rng())
    }

    /// Same as `request_pair` with a caller-supplied random source.
    pub fn request_pair_with_rng<R: Rng>(
        &self,
        voter: &VoterId,
        rng: &mut R,
    ) -> EngineResult<Option<ComparisonPair>> {
        let pools = self.load_pools(voter)?;
        let total: u64 = pools.iter().map(CategoryPool::unseen).sum();
        if total == 0 {
            debug!("event=pair_request module=pairing status=ok outcome=none_available");
            return Ok(None);
        }

        let mut ticket = rng.random_range(0..total);
        for pool in &pools {
            let unseen = pool.unseen();
            if ticket >= unseen {
                ticket -= unseen;
                continue;
            }
            if let Some((i, j)) = pool.draw(rng) {
                debug!(
                    "event=pair_request module=pairing status=ok outcome=pair eligible_pairs={} category={}",
                    total, pool.members[i].category
                );
                return Ok(Some(ComparisonPair {
                    first: pool.members[i].clone(),
                    second: pool.members[j].clone(),
                }));
            }
            break;
        }

        Ok(None)
    }

    /// Number of pairs the voter could still be offered.
    pub fn eligible_pair_count(&self, voter: &VoterId) -> EngineResult<u64> {
        let pools = self.load_pools(voter)?;
        Ok(pools.iter().map(CategoryPool::unseen).sum())
    }

    /// Whether the voting entry point has anything to show this voter.
    pub fn can_vote(&self, voter: &VoterId) -> EngineResult<bool> {
        Ok(self.eligible_pair_count(voter)? > 0)
    }

    fn load_pools(&self, voter: &VoterId) -> EngineResult<Vec<CategoryPool>> {
        let candidates = self.submissions.list_pairing_candidates(voter)?;

        let mut pools: Vec<CategoryPool> = Vec::new();
        let mut pool_of: HashMap<_, usize> = HashMap::new();
        let mut by_category: HashMap<CategoryId, usize> = HashMap::new();
        for submission in candidates {
            let index = *by_category.entry(submission.category).or_insert_with(|| {
                pools.push(CategoryPool {
                    members: Vec::new(),
                    seen: HashSet::new(),
                });
                pools.len() - 1
            });
            pool_of.insert(submission.id, index);
            pools[index].members.push(submission);
        }

        for vote in self.votes.list_votes_by_voter(voter)? {
            match (pool_of.get(&vote.winner), pool_of.get(&vote.loser)) {
                (Some(a), Some(b)) if a == b => {
                    pools[*a].seen.insert(vote.pair());
                }
                _ => {}
            }
        }

        pools.retain(|pool| pool.members.len() >= 2);
        Ok(pools)
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryPool;
    use crate::model::{NewSubmission, UnorderedPair, VoterId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn pool(size: usize) -> CategoryPool {
        let owner = VoterId::parse("owner@example.com").unwrap();
        CategoryPool {
            members: (0..size)
                .map(|_| NewSubmission::new(owner.clone(), 1).into_submission())
                .collect(),
            seen: HashSet::new(),
        }
    }

    #[test]
    fn unseen_counts_remaining_pairs() {
        let mut pool = pool(4);
        assert_eq!(pool.unseen(), 6);
        let key = pool.key(0, 1);
        pool.seen.insert(key);
        assert_eq!(pool.unseen(), 5);
    }

    #[test]
    fn draw_falls_back_to_the_last_unseen_pair() {
        let mut pool = pool(6);
        let mut last = None;
        for i in 0..6 {
            for j in (i + 1)..6 {
                if (i, j) == (2, 4) {
                    last = Some(pool.key(i, j));
                    continue;
                }
                let key = pool.key(i, j);
                pool.seen.insert(key);
            }
        }
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let (i, j) = pool.draw(&mut rng).unwrap();
            assert_eq!(Some(pool.key(i, j)), last);
        }
    }

    #[test]
    fn draw_is_uniform_over_unseen_pairs() {
        let mut pool = pool(4);
        let blocked = pool.key(0, 1);
        pool.seen.insert(blocked);
        let mut rng = StdRng::seed_from_u64(5);
        let mut counts: HashMap<UnorderedPair, u32> = HashMap::new();
        for _ in 0..5000 {
            let (i, j) = pool.draw(&mut rng).unwrap();
            *counts.entry(pool.key(i, j)).or_default() += 1;
        }
        assert!(!counts.contains_key(&blocked));
        assert_eq!(counts.len(), 5);
        for count in counts.values() {
            assert!((850..=1150).contains(count), "skewed count {count}");
        }
    }

    #[test]
    fn exhausted_pool_draws_nothing() {
        let mut pool = pool(2);
        let key = pool.key(0, 1);
        pool.seen.insert(key);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pool.unseen(), 0);
        assert!(pool.draw(&mut rng).is_none());
    }
}
