//! Mood taxonomy and classification.
//!
//! The label set is closed: every stored entry carries exactly one of the
//! [`MoodLabel`] variants. Classifiers live in [`classifier`].

pub mod classifier;

pub use classifier::{LexiconClassifier, ModelClassifier, MoodClassifier};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categorical emotion attached to a diary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Joy,
    Sadness,
    Anger,
    Fear,
    Calm,
    Neutral,
}

/// Coarse valence of a mood, used for the positive/neutral/negative tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl MoodLabel {
    /// Every label, in taxonomy order. Ties in any ranking resolve to the earlier label.
    pub const ALL: [MoodLabel; 6] = [
        MoodLabel::Joy,
        MoodLabel::Sadness,
        MoodLabel::Anger,
        MoodLabel::Fear,
        MoodLabel::Calm,
        MoodLabel::Neutral,
    ];

    /// Stable lowercase name, also the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Joy => "joy",
            MoodLabel::Sadness => "sadness",
            MoodLabel::Anger => "anger",
            MoodLabel::Fear => "fear",
            MoodLabel::Calm => "calm",
            MoodLabel::Neutral => "neutral",
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            MoodLabel::Joy | MoodLabel::Calm => Polarity::Positive,
            MoodLabel::Neutral => Polarity::Neutral,
            MoodLabel::Sadness | MoodLabel::Anger | MoodLabel::Fear => Polarity::Negative,
        }
    }

    /// Maps the names models tend to produce onto the closed set.
    ///
    /// Accepts the canonical names plus common synonyms (`happiness`,
    /// `anxiety`, `calmness`, `excitement`, ...). Matching ignores case and
    /// surrounding whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodlog::mood::MoodLabel;
    ///
    /// assert_eq!(MoodLabel::from_alias(" Happiness "), Some(MoodLabel::Joy));
    /// assert_eq!(MoodLabel::from_alias("anxiety"), Some(MoodLabel::Fear));
    /// assert_eq!(MoodLabel::from_alias("bewildered"), None);
    /// ```
    pub fn from_alias(raw: &str) -> Option<MoodLabel> {
        let label = match raw.trim().to_lowercase().as_str() {
            "joy" | "happy" | "happiness" | "excitement" | "excited" | "positive" => MoodLabel::Joy,
            "sadness" | "sad" | "sorrow" | "grief" => MoodLabel::Sadness,
            "anger" | "angry" | "rage" | "frustration" => MoodLabel::Anger,
            "fear" | "afraid" | "anxiety" | "anxious" | "worry" => MoodLabel::Fear,
            "calm" | "calmness" | "peace" | "peaceful" | "relaxed" => MoodLabel::Calm,
            "neutral" => MoodLabel::Neutral,
            _ => return None,
        };
        Some(label)
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodLabel {
    type Err = String;

    /// Parses the canonical stored name only; synonyms go through [`MoodLabel::from_alias`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoodLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown mood label: {}", s))
    }
}

impl Polarity {
    pub const ALL: [Polarity; 3] = [Polarity::Positive, Polarity::Neutral, Polarity::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Neutral => "neutral",
            Polarity::Negative => "negative",
        }
    }
}
