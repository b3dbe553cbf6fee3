use crate::player_stats::PlayerAggregate;
use crate::shared::round2;

/// Weights of the rating formula. They sum to 1.0.
pub mod rating_weights {
    pub const AVERAGE_SCORE: f64 = 0.4;
    pub const BEST_SCORE: f64 = 0.3;
    pub const MEAN_SCORE: f64 = 0.2;
    pub const WORST_SCORE: f64 = 0.1;

    /// Numerator of the worst-score term, `100 / (1 + worst)`
    pub const WORST_SCORE_NORMALIZER: f64 = 100.0;
}

pub const DEFAULT_RATING: f64 = 0.0;

/// Scores a player's aggregate for leaderboard ranking.
///
/// The average term uses the two-decimal average; the mean term uses the
/// unrounded `score_sum / match_count`. `Empty` rates exactly 0.0.
pub fn rating(aggregate: &PlayerAggregate) -> f64 {
    let Some(totals) = aggregate.totals() else {
        return DEFAULT_RATING;
    };
    if totals.match_count == 0 {
        return DEFAULT_RATING;
    }

    let mean = totals.score_sum as f64 / totals.match_count as f64;
    let value = rating_weights::AVERAGE_SCORE * aggregate.average_score()
        + rating_weights::BEST_SCORE * totals.best_score as f64
        + rating_weights::MEAN_SCORE * mean
        + rating_weights::WORST_SCORE
            * (rating_weights::WORST_SCORE_NORMALIZER / (1.0 + totals.worst_score as f64));

    round2(value)
}
