//! Recommendation summary over classified reviews.

use crate::models::{RecommendationSummary, ScoredReview, Sentiment, Verdict};

const POSITIVE_THRESHOLD_PCT: f64 = 55.0;
const NEGATIVE_THRESHOLD_PCT: f64 = 45.0;

/// Counts sentiments and derives the verdict.
///
/// Percentages are computed against `max(total, 1)`, so an empty input
/// yields all-zero percentages and a neutral verdict. Thresholds use the
/// unrounded percentages; positive is checked before negative.
pub fn summarize(reviews: &[ScoredReview]) -> RecommendationSummary {
    let count = |label: Sentiment| reviews.iter().filter(|r| r.sentiment == label).count();
    let positive = count(Sentiment::Positive);
    let neutral = count(Sentiment::Neutral);
    let negative = count(Sentiment::Negative);

    let total = reviews.len();
    let denominator = total.max(1) as f64;
    let pct = |n: usize| n as f64 * 100.0 / denominator;

    let positive_pct = pct(positive);
    let negative_pct = pct(negative);
    let neutral_pct = pct(neutral);

    let label = if positive_pct >= POSITIVE_THRESHOLD_PCT {
        Verdict::Positive
    } else if negative_pct >= NEGATIVE_THRESHOLD_PCT {
        Verdict::Negative
    } else {
        Verdict::Neutral
    };

    RecommendationSummary {
        positive,
        neutral,
        negative,
        total,
        positive_pct: round2(positive_pct),
        neutral_pct: round2(neutral_pct),
        negative_pct: round2(negative_pct),
        label,
        recommendation_text: label.message().to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
