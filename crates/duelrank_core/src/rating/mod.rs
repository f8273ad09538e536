//! Rating math: the Elo update rule and chronological ledger replay.
//!
//! Both the append path (vote recording) and the replay path
//! (recalculation) go through `elo::apply_win`, which keeps a replay of an
//! unchanged ledger bit-identical to the incremental result.

pub mod elo;
pub mod replay;

pub use elo::{apply_win, expected_score, EloOutcome, BASELINE_RATING, K_FACTOR};
pub use replay::ReplayPlan;
