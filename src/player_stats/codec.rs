use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

use super::models::{PlayerAggregate, ScoreTotals};
use crate::matches::models::{MAX_SCORE, MIN_SCORE};
use crate::shared::AppError;

pub type StatsFields = BTreeMap<String, String>;

pub const TOTAL_MATCHES: &str = "totalMatches";
pub const TOTAL_SCORE: &str = "totalScore";
pub const BEST_SCORE: &str = "bestScore";
pub const WORST_SCORE: &str = "worstScore";
pub const AVERAGE_SCORE: &str = "averageScore";

/// Field-map form of an aggregate as kept by the backing store
pub fn encode(aggregate: &PlayerAggregate) -> StatsFields {
    let mut fields = StatsFields::new();
    fields.insert(TOTAL_MATCHES.to_string(), aggregate.match_count().to_string());
    fields.insert(TOTAL_SCORE.to_string(), aggregate.score_sum().to_string());
    fields.insert(
        AVERAGE_SCORE.to_string(),
        aggregate.average_score().to_string(),
    );
    if let Some(totals) = aggregate.totals() {
        fields.insert(BEST_SCORE.to_string(), totals.best_score.to_string());
        fields.insert(WORST_SCORE.to_string(), totals.worst_score.to_string());
    }
    fields
}

/// Decodes a stored field map, never failing as a whole.
///
/// A field that is missing or unparsable is logged and replaced by its
/// default: counts and sums become 0, best score falls to the bottom of the
/// score range and worst score to the top. The average is always derived
/// from sum and count.
///
/// The match count gates the rest: when it is missing or unparsable the
/// record decodes to `Empty` and the other fields are discarded.
pub fn decode(player_id: &str, fields: &StatsFields) -> PlayerAggregate {
    let match_count = parse_field::<u64>(fields, TOTAL_MATCHES, |_| true)
        .unwrap_or_else(|e| fallback(player_id, e, 0));
    if match_count == 0 {
        return PlayerAggregate::Empty;
    }

    let in_range = |score: &i32| (MIN_SCORE..=MAX_SCORE).contains(score);
    let score_sum = parse_field::<u64>(fields, TOTAL_SCORE, |_| true)
        .unwrap_or_else(|e| fallback(player_id, e, 0));
    let best_score = parse_field::<i32>(fields, BEST_SCORE, in_range)
        .unwrap_or_else(|e| fallback(player_id, e, MIN_SCORE));
    let worst_score = parse_field::<i32>(fields, WORST_SCORE, in_range)
        .unwrap_or_else(|e| fallback(player_id, e, MAX_SCORE));

    PlayerAggregate::Recorded(ScoreTotals {
        match_count,
        score_sum,
        best_score,
        worst_score,
    })
}

fn parse_field<T: FromStr>(
    fields: &StatsFields,
    field: &'static str,
    valid: impl Fn(&T) -> bool,
) -> Result<T, AppError> {
    let raw = fields
        .get(field)
        .ok_or_else(|| AppError::InvalidAggregateEncoding {
            field,
            value: "<missing>".to_string(),
        })?;

    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|value| valid(value))
        .ok_or_else(|| AppError::InvalidAggregateEncoding {
            field,
            value: raw.clone(),
        })
}

fn fallback<T>(player_id: &str, error: AppError, default: T) -> T {
    warn!(player_id = %player_id, error = %error, "Falling back to default aggregate field");
    default
}
