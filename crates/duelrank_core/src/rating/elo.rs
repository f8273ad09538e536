//! Elo update rule.

/// Maximum rating movement of a single comparison.
pub const K_FACTOR: f64 = 32.0;

/// Rating of a submission with no history.
pub const BASELINE_RATING: f64 = 1000.0;

const SCALE: f64 = 400.0;

/// Ratings of both sides after one decided comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloOutcome {
    pub winner: f64,
    pub loser: f64,
}

/// Probability that `rating` beats `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / SCALE))
}

/// Applies one "winner beats loser" result.
///
/// The loser's expectation is derived as `1 - expected_winner` rather than
/// evaluated separately, so the two deltas are exact negations of each
/// other.
pub fn apply_win(winner: f64, loser: f64) -> EloOutcome {
    let expected_winner = expected_score(winner, loser);
    let expected_loser = 1.0 - expected_winner;
    EloOutcome {
        winner: winner + K_FACTOR * (1.0 - expected_winner),
        loser: loser + K_FACTOR * (0.0 - expected_loser),
    }
}
