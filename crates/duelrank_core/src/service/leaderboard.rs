//! Ranked reads.
//!
//! # Invariants
//! - Always reads committed state; nothing is cached.
//! - Disqualified submissions appear only when asked for explicitly, either
//!   through `include_disqualified` or a `Disqualified` filter.

use super::EngineResult;
use crate::config::LeaderboardConfig;
use crate::model::{CategoryId, Qualification};
use crate::repo::submission_repo::{RankQuery, RankedSubmission, SubmissionRepository};
use log::debug;

/// Caller-facing leaderboard request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardRequest {
    pub qualification: Option<Qualification>,
    pub category: Option<CategoryId>,
    /// 0 means "use the configured default".
    pub limit: u32,
    /// Cap each category independently instead of the whole list.
    pub per_category: bool,
    pub include_disqualified: bool,
}

impl LeaderboardRequest {
    pub fn top(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn top_per_category(limit: u32) -> Self {
        Self {
            limit,
            per_category: true,
            ..Self::default()
        }
    }
}

/// Read-only leaderboard over the submission store.
pub struct LeaderboardService<R: SubmissionRepository> {
    repo: R,
    limits: LeaderboardConfig,
}

impl<R: SubmissionRepository> LeaderboardService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_limits(repo, LeaderboardConfig::default())
    }

    pub fn with_limits(repo: R, limits: LeaderboardConfig) -> Self {
        Self { repo, limits }
    }

    /// Returns the top entries, ordered by rating then recency.
    ///
    /// Per-category results come grouped by category ascending, each group
    /// ranked from 1.
    pub fn top_n(&self, request: &LeaderboardRequest) -> EngineResult<Vec<RankedSubmission>> {
        let limit = self.normalize_limit(request.limit, request.per_category);
        let entries = self.repo.list_ranked(&RankQuery {
            qualification: request.qualification,
            category: request.category,
            include_disqualified: request.include_disqualified,
            limit,
            per_category: request.per_category,
        })?;
        debug!(
            "event=leaderboard module=leaderboard status=ok per_category={} limit={} rows={}",
            request.per_category,
            limit,
            entries.len()
        );
        Ok(entries)
    }

    /// Applies the configured default for 0 and clamps to the maximum.
    pub fn normalize_limit(&self, requested: u32, per_category: bool) -> u32 {
        let fallback = if per_category {
            self.limits.default_per_category_limit
        } else {
            self.limits.default_limit
        };
        match requested {
            0 => fallback,
            value => value.min(self.limits.max_limit),
        }
    }
}
