//! Sentiment classification and aggregation.
//!
//! The classifier collaborator supplies class probabilities; the engine
//! derives `compound = p(positive) - p(negative)` and buckets on that alone,
//! regardless of which class the classifier itself ranked highest.

use crate::role::Role;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `compound >= +COMPOUND_THRESHOLD` is positive, `<= -COMPOUND_THRESHOLD` negative.
pub const COMPOUND_THRESHOLD: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_compound(compound: f32) -> Self {
        if compound >= COMPOUND_THRESHOLD {
            Self::Positive
        } else if compound <= -COMPOUND_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// Raw classifier output over {negative, neutral, positive}, summing to ~1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub negative: f32,
    pub neutral: f32,
    pub positive: f32,
}

impl ClassProbabilities {
    pub fn new(negative: f32, neutral: f32, positive: f32) -> Self {
        Self {
            negative,
            neutral,
            positive,
        }
    }

    pub fn compound(&self) -> f32 {
        self.positive - self.negative
    }

    /// The classifier's own top class. Informational only.
    pub fn argmax(&self) -> SentimentLabel {
        if self.negative >= self.neutral && self.negative >= self.positive {
            SentimentLabel::Negative
        } else if self.neutral >= self.positive {
            SentimentLabel::Neutral
        } else {
            SentimentLabel::Positive
        }
    }

    pub fn scores(&self) -> SentimentScores {
        SentimentScores {
            neg: self.negative,
            neu: self.neutral,
            pos: self.positive,
            compound: self.compound(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub neg: f32,
    pub neu: f32,
    pub pos: f32,
    pub compound: f32,
}

pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<ClassProbabilities>;
}

// ============================================================================
// Counters
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentCounts {
    pub fn get(&self, label: SentimentLabel) -> u32 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }

    pub fn increment(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }
}

/// Result of recording one message. The counters are copies taken right
/// after the increment and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub label: SentimentLabel,
    pub predicted: SentimentLabel,
    pub scores: SentimentScores,
    pub overall_counts: SentimentCounts,
    pub role_counts: SentimentCounts,
}

/// Global and per-role sentiment tallies for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentAggregator {
    overall: SentimentCounts,
    by_role: BTreeMap<Role, SentimentCounts>,
}

impl SentimentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overall(&self) -> SentimentCounts {
        self.overall
    }

    pub fn role_counts(&self, role: &Role) -> Option<SentimentCounts> {
        self.by_role.get(role).copied()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.by_role.keys()
    }

    /// Counter for `role`, inserted at all-zero the first time the role is seen.
    fn role_entry(&mut self, role: &Role) -> &mut SentimentCounts {
        if !self.by_role.contains_key(role) {
            tracing::debug!("First message from role '{}', creating sentiment counter", role);
        }
        self.by_role.entry(role.clone()).or_default()
    }

    /// Bucket `probs` by compound score and count it globally and for `role`.
    pub fn record(&mut self, role: &Role, probs: ClassProbabilities) -> SentimentReading {
        let scores = probs.scores();
        let label = SentimentLabel::from_compound(scores.compound);
        self.overall.increment(label);
        let role_counts = {
            let entry = self.role_entry(role);
            entry.increment(label);
            *entry
        };
        SentimentReading {
            label,
            predicted: probs.argmax(),
            scores,
            overall_counts: self.overall,
            role_counts,
        }
    }

    pub fn classify_and_record(
        &mut self,
        classifier: &dyn SentimentClassifier,
        message: &str,
        role: &Role,
    ) -> Result<SentimentReading> {
        let probs = classifier.classify(message)?;
        Ok(self.record(role, probs))
    }
}

// ============================================================================
// Lexicon classifier
// ============================================================================

const POSITIVE: &[&str] = &[
    "happy", "glad", "love", "like", "great", "good", "thanks", "thank", "wonderful", "kind",
    "trust", "calm", "haha", "nice", "forgive", "😊", "❤️", "👍",
];

const NEGATIVE: &[&str] = &[
    "sad", "hate", "angry", "awful", "bad", "terrible", "annoyed", "sorry", "guilty", "afraid",
    "liar", "blame", "worst", "never", "😢", "😡", "💔",
];

const INTENSE: &[&str] = &["very", "really", "so", "extremely", "totally", "!", "?!"];

const KEYWORD_WEIGHT: f32 = 1.5;
const NEUTRAL_BIAS: f32 = 1.0;

/// Keyword-lexicon classifier. Produces softmax probabilities so it can
/// stand in for a model-backed classifier.
#[derive(Debug, Clone, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    fn hits(text: &str, tokens: &[&str], lexicon: &[&str]) -> f32 {
        lexicon
            .iter()
            .filter(|&&w| {
                if w.chars().all(|c| c.is_alphabetic()) {
                    tokens.contains(&w)
                } else {
                    text.contains(w)
                }
            })
            .count() as f32
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<ClassProbabilities> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let pos = Self::hits(&lowered, &tokens, POSITIVE);
        let neg = Self::hits(&lowered, &tokens, NEGATIVE);
        let int = Self::hits(&lowered, &tokens, INTENSE);
        let gain = KEYWORD_WEIGHT * (1.0 + 0.5 * int.min(4.0));

        let logits = [neg * gain, NEUTRAL_BIAS, pos * gain];
        let max = logits.iter().cloned().fold(f32::MIN, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f32 = exps.iter().sum();

        Ok(ClassProbabilities::new(
            exps[0] / sum,
            exps[1] / sum,
            exps[2] / sum,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs_for(compound: f32) -> ClassProbabilities {
        // Split the remainder evenly so pos - neg == compound.
        let rest = (1.0 - compound.abs()) / 3.0;
        if compound >= 0.0 {
            ClassProbabilities::new(rest, rest, rest + compound)
        } else {
            ClassProbabilities::new(rest - compound, rest, rest)
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(SentimentLabel::from_compound(0.05), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_compound(-0.05), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_compound(0.0), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(0.049), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(-0.049), SentimentLabel::Neutral);
    }

    #[test]
    fn test_compound_overrides_argmax() {
        // Neutral is the top class but compound 0.2 makes the bucket positive.
        let probs = ClassProbabilities::new(0.1, 0.6, 0.3);
        let mut agg = SentimentAggregator::new();
        let reading = agg.record(&Role::participant("player"), probs);
        assert_eq!(reading.predicted, SentimentLabel::Neutral);
        assert_eq!(reading.label, SentimentLabel::Positive);
        assert!((reading.scores.compound - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_role_counters_created_lazily() {
        let mut agg = SentimentAggregator::new();
        let player = Role::participant("player");
        assert!(agg.role_counts(&player).is_none());
        agg.record(&player, probs_for(-0.4));
        let counts = agg.role_counts(&player).unwrap();
        assert_eq!(counts.negative, 1);
        assert_eq!(counts.total(), 1);
        assert_eq!(agg.roles().count(), 1);
    }

    #[test]
    fn test_three_messages_one_of_each() {
        let mut agg = SentimentAggregator::new();
        let role = Role::participant("player");
        for c in [0.2, -0.3, 0.0] {
            agg.record(&role, probs_for(c));
        }
        let expected = SentimentCounts {
            positive: 1,
            neutral: 1,
            negative: 1,
        };
        assert_eq!(agg.role_counts(&role), Some(expected));
        assert_eq!(agg.overall(), expected);
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut agg = SentimentAggregator::new();
        let role = Role::Narrator;
        let first = agg.record(&role, probs_for(0.5));
        agg.record(&role, probs_for(0.5));
        assert_eq!(first.overall_counts.positive, 1);
        assert_eq!(first.role_counts.positive, 1);
        assert_eq!(agg.overall().positive, 2);
    }

    #[test]
    fn test_lexicon_classifier() {
        let c = LexiconClassifier;
        let neutral = c.classify("the train leaves at noon").unwrap();
        assert_eq!(SentimentLabel::from_compound(neutral.compound()), SentimentLabel::Neutral);
        let sum = neutral.negative + neutral.neutral + neutral.positive;
        assert!((sum - 1.0).abs() < 1e-5);

        let pos = c.classify("Thanks, I really love this!").unwrap();
        assert_eq!(SentimentLabel::from_compound(pos.compound()), SentimentLabel::Positive);

        let neg = c.classify("I hate you, liar").unwrap();
        assert_eq!(SentimentLabel::from_compound(neg.compound()), SentimentLabel::Negative);
    }

    #[test]
    fn test_counts_serialize_with_label_keys() {
        let counts = SentimentCounts {
            positive: 2,
            neutral: 0,
            negative: 1,
        };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["positive"], 2);
        assert_eq!(json["negative"], 1);
        assert_eq!(serde_json::to_value(SentimentLabel::Neutral).unwrap(), "neutral");
    }
}
