use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::SentimentClassifier;
use crate::models::Sentiment;

/// Polarity above this is positive, below its negation negative.
const POLARITY_THRESHOLD: f64 = 0.1;

/// How many preceding tokens a negator reaches.
const NEGATION_WINDOW: usize = 3;

static LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        // positive
        ("good", 0.7),
        ("great", 0.8),
        ("excellent", 1.0),
        ("amazing", 0.9),
        ("awesome", 1.0),
        ("best", 1.0),
        ("better", 0.5),
        ("nice", 0.6),
        ("love", 0.5),
        ("loved", 0.7),
        ("perfect", 1.0),
        ("fantastic", 0.9),
        ("superb", 1.0),
        ("happy", 0.8),
        ("satisfied", 0.5),
        ("recommend", 0.5),
        ("recommended", 0.5),
        ("worth", 0.3),
        ("fast", 0.2),
        ("smooth", 0.4),
        ("durable", 0.5),
        ("sturdy", 0.5),
        ("comfortable", 0.4),
        ("beautiful", 0.85),
        ("impressive", 1.0),
        ("value", 0.2),
        ("reliable", 0.5),
        ("wonderful", 1.0),
        ("fine", 0.4),
        ("decent", 0.2),
        ("easy", 0.4),
        ("bright", 0.7),
        ("clear", 0.1),
        ("premium", 0.5),
        ("solid", 0.3),
        ("brilliant", 0.9),
        ("pleased", 0.5),
        // negative
        ("bad", -0.7),
        ("worst", -1.0),
        ("poor", -0.4),
        ("terrible", -1.0),
        ("awful", -1.0),
        ("horrible", -1.0),
        ("useless", -0.5),
        ("waste", -0.2),
        ("broken", -0.4),
        ("defective", -0.6),
        ("disappointed", -0.75),
        ("disappointing", -0.6),
        ("slow", -0.3),
        ("cheap", -0.2),
        ("fake", -0.5),
        ("hate", -0.8),
        ("problem", -0.3),
        ("problems", -0.3),
        ("issue", -0.3),
        ("issues", -0.3),
        ("faulty", -0.6),
        ("worse", -0.4),
        ("return", -0.2),
        ("returned", -0.3),
        ("refund", -0.3),
        ("heating", -0.3),
        ("heats", -0.3),
        ("lag", -0.4),
        ("lags", -0.4),
        ("damaged", -0.6),
        ("stopped", -0.3),
        ("annoying", -0.8),
        ("uncomfortable", -0.5),
        ("weak", -0.4),
        ("noisy", -0.3),
        ("average", -0.15),
        ("unhappy", -0.6),
    ]
    .into_iter()
    .collect()
});

/// Multipliers applied to the sentiment word that follows.
fn intensity(token: &str) -> Option<f64> {
    match token {
        "very" | "really" | "extremely" | "super" | "highly" => Some(1.3),
        "so" | "too" => Some(1.2),
        "slightly" | "somewhat" | "bit" => Some(0.6),
        _ => None,
    }
}

fn is_negator(token: &str) -> bool {
    matches!(
        token,
        "not" | "no" | "never" | "isn't" | "wasn't" | "aren't" | "don't" | "doesn't" | "didn't"
            | "won't" | "can't" | "cannot" | "without" | "nothing" | "hardly"
    )
}

/// Lower-cased word tokens; apostrophes stay inside words so "isn't" survives.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Word-lexicon classifier with negation and intensifier handling.
///
/// Polarity is the mean adjusted score of the sentiment-bearing words, so it
/// stays within `[-1, 1]`; texts without any such word are neutral.
#[derive(Debug, Clone, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn polarity(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut sum = 0.0;
        let mut hits = 0usize;

        for (i, token) in tokens.iter().enumerate() {
            let Some(&base) = LEXICON.get(token.as_str()) else {
                continue;
            };

            let mut score = base;
            if i > 0
                && let Some(factor) = intensity(&tokens[i - 1])
            {
                score *= factor;
            }

            let negated = (1..=NEGATION_WINDOW)
                .filter(|k| i >= *k)
                .any(|k| is_negator(&tokens[i - k]));
            if negated {
                score *= -0.5;
            }

            sum += score.clamp(-1.0, 1.0);
            hits += 1;
        }

        if hits == 0 { 0.0 } else { sum / hits as f64 }
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Sentiment {
        let polarity = self.polarity(text);
        if polarity > POLARITY_THRESHOLD {
            Sentiment::Positive
        } else if polarity < -POLARITY_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}
