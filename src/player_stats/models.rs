use crate::shared::round2;

/// Running totals for a player with at least one recorded match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreTotals {
    pub match_count: u64,
    pub score_sum: u64,
    pub best_score: i32,
    pub worst_score: i32,
}

/// Per-player running statistics.
///
/// `Empty` stands for "no match recorded yet", so best/worst scores never
/// have to be compared against a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerAggregate {
    #[default]
    Empty,
    Recorded(ScoreTotals),
}

impl PlayerAggregate {
    /// Folds one match score into the aggregate
    pub fn merge(self, score: i32) -> Self {
        match self {
            PlayerAggregate::Empty => PlayerAggregate::Recorded(ScoreTotals {
                match_count: 1,
                score_sum: score as u64,
                best_score: score,
                worst_score: score,
            }),
            PlayerAggregate::Recorded(totals) => PlayerAggregate::Recorded(ScoreTotals {
                match_count: totals.match_count + 1,
                score_sum: totals.score_sum + score as u64,
                best_score: totals.best_score.max(score),
                worst_score: totals.worst_score.min(score),
            }),
        }
    }

    pub fn from_scores(scores: impl IntoIterator<Item = i32>) -> Self {
        scores
            .into_iter()
            .fold(PlayerAggregate::Empty, PlayerAggregate::merge)
    }

    pub fn totals(&self) -> Option<&ScoreTotals> {
        match self {
            PlayerAggregate::Empty => None,
            PlayerAggregate::Recorded(totals) => Some(totals),
        }
    }

    pub fn match_count(&self) -> u64 {
        self.totals().map_or(0, |t| t.match_count)
    }

    pub fn score_sum(&self) -> u64 {
        self.totals().map_or(0, |t| t.score_sum)
    }

    pub fn best_score(&self) -> Option<i32> {
        self.totals().map(|t| t.best_score)
    }

    pub fn worst_score(&self) -> Option<i32> {
        self.totals().map(|t| t.worst_score)
    }

    /// Mean score rounded to two decimals, 0.0 before the first match
    pub fn average_score(&self) -> f64 {
        match self.totals() {
            Some(t) if t.match_count > 0 => round2(t.score_sum as f64 / t.match_count as f64),
            _ => 0.0,
        }
    }
}
