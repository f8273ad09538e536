//! Pairwise-comparison rating engine.
//!
//! Peers judge submissions two at a time; every decision lands in a vote
//! ledger and moves both Elo ratings. The ledger is the single source of
//! truth: ratings can always be rederived by replaying it.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod rating;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig, LeaderboardConfig, LoggingConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::{
    CategoryId, ModelError, NewSubmission, Qualification, Submission, SubmissionId,
    UnorderedPair, Vote, VoteId, VoterId,
};
pub use rating::{BASELINE_RATING, K_FACTOR};
pub use repo::submission_repo::{
    RankQuery, RankedSubmission, SqliteSubmissionRepository, SubmissionQuery,
    SubmissionRepository,
};
pub use repo::vote_repo::{SqliteVoteRepository, VoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::admin::{AdminService, DeletionReport};
pub use service::leaderboard::{LeaderboardRequest, LeaderboardService};
pub use service::pair_selector::{ComparisonPair, PairSelector};
pub use service::recalculator::{RatingRecalculator, RecalcReport};
pub use service::vote_recorder::{VoteOutcome, VoteRecorder};
pub use service::{EngineError, EngineResult, InvalidArgument, MissingRef};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
