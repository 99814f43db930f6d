//! Mood classifiers.
//!
//! Two implementations share the [`MoodClassifier`] trait:
//!
//! - [`LexiconClassifier`]: local keyword scoring, no network, never fails.
//! - [`ModelClassifier`]: asks the inference endpoint for a JSON label using
//!   zero temperature and a fixed seed, with its own retry budget.
//!
//! Both are deterministic for identical input.

use super::MoodLabel;
use crate::ai::prompts::classify_prompt;
use crate::ai::{GenerationOptions, InferenceClient};
use crate::constants::{CLASSIFY_MAX_TOKENS, CLASSIFY_SEED};
use crate::errors::ClassifyError;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Derives a mood label from entry text.
pub trait MoodClassifier: Send + Sync {
    /// Classifies `text`. Identical input must yield the identical label.
    fn classify(&self, text: &str) -> Result<MoodLabel, ClassifyError>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

const JOY_WORDS: &[&str] = &[
    "happy", "happiness", "great", "glad", "joy", "joyful", "excited", "exciting", "wonderful",
    "amazing", "love", "loved", "fantastic", "awesome", "grateful", "thankful", "proud", "fun",
    "delighted", "celebrate", "celebrated", "good", "best", "laughed",
];
const SADNESS_WORDS: &[&str] = &[
    "sad", "down", "depressed", "lonely", "alone", "cry", "cried", "crying", "miss", "missed",
    "tears", "unhappy", "heartbroken", "hopeless", "disappointed", "gloomy", "empty", "grief",
    "failed", "lost",
];
const ANGER_WORDS: &[&str] = &[
    "angry", "mad", "furious", "annoyed", "irritated", "hate", "hated", "frustrated",
    "frustrating", "rage", "unfair", "yelled", "resent", "pissed",
];
const FEAR_WORDS: &[&str] = &[
    "afraid", "scared", "anxious", "anxiety", "worried", "worry", "nervous", "panic", "fear",
    "terrified", "stress", "stressed", "dread", "uneasy", "overwhelmed",
];
const CALM_WORDS: &[&str] = &[
    "calm", "peaceful", "peace", "relaxed", "relaxing", "quiet", "rested", "serene", "content",
    "balanced", "steady", "meditated", "slow", "cozy",
];
const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "dont", "didn't", "didnt", "isn't", "wasn't", "hardly",
    "barely",
];

/// How many preceding tokens a negator reaches.
const NEGATION_WINDOW: usize = 2;

/// Keyword-scoring classifier.
///
/// Scores each label by keyword hits. A negator within two tokens before a
/// joy or calm keyword ("not happy", "never really relaxed") counts towards
/// sadness instead. The highest score wins, ties go to the label that comes
/// first in [`MoodLabel::ALL`], and text with no hits is `neutral`.
///
/// # Examples
///
/// ```
/// use moodlog::mood::{LexiconClassifier, MoodClassifier, MoodLabel};
///
/// let classifier = LexiconClassifier::new();
/// assert_eq!(classifier.classify("I feel great today").unwrap(), MoodLabel::Joy);
/// assert_eq!(classifier.classify("I am not happy").unwrap(), MoodLabel::Sadness);
/// assert_eq!(classifier.classify("Bought groceries").unwrap(), MoodLabel::Neutral);
/// ```
#[derive(Debug, Default, Clone)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    pub fn new() -> Self {
        LexiconClassifier
    }

    fn label_for(word: &str) -> Option<MoodLabel> {
        if JOY_WORDS.contains(&word) {
            Some(MoodLabel::Joy)
        } else if SADNESS_WORDS.contains(&word) {
            Some(MoodLabel::Sadness)
        } else if ANGER_WORDS.contains(&word) {
            Some(MoodLabel::Anger)
        } else if FEAR_WORDS.contains(&word) {
            Some(MoodLabel::Fear)
        } else if CALM_WORDS.contains(&word) {
            Some(MoodLabel::Calm)
        } else {
            None
        }
    }

    /// Per-label hit counts, indexed like [`MoodLabel::ALL`].
    fn scores(text: &str) -> [u32; 6] {
        // Typographic apostrophes would split "don’t" into two tokens
        let lowered = text.to_lowercase().replace('\u{2019}', "'");
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .collect();

        let mut scores = [0u32; 6];
        for (idx, token) in tokens.iter().enumerate() {
            let Some(mut label) = Self::label_for(token) else {
                continue;
            };

            let window_start = idx.saturating_sub(NEGATION_WINDOW);
            let negated = tokens[window_start..idx]
                .iter()
                .any(|prev| NEGATORS.contains(prev));
            if negated && label.polarity() == super::Polarity::Positive {
                label = MoodLabel::Sadness;
            }

            if let Some(slot) = MoodLabel::ALL.iter().position(|l| *l == label) {
                scores[slot] += 1;
            }
        }
        scores
    }
}

impl MoodClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<MoodLabel, ClassifyError> {
        let scores = Self::scores(text);
        let mut best = MoodLabel::Neutral;
        let mut best_score = 0;
        for (label, score) in MoodLabel::ALL.iter().zip(scores) {
            if score > best_score {
                best = *label;
                best_score = score;
            }
        }
        debug!(?scores, mood = %best, "Lexicon classification");
        Ok(best)
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Classifier backed by the inference endpoint.
///
/// Owns its own [`InferenceClient`] so its retry budget is independent of
/// reply generation.
#[derive(Debug, Clone)]
pub struct ModelClassifier {
    client: InferenceClient,
    options: GenerationOptions,
}

impl ModelClassifier {
    /// Creates a classifier issuing zero-temperature, fixed-seed requests.
    pub fn new(client: InferenceClient, timeout: Duration) -> Self {
        let options = GenerationOptions {
            max_tokens: CLASSIFY_MAX_TOKENS,
            temperature: 0.0,
            timeout,
            seed: Some(CLASSIFY_SEED),
        };
        Self { client, options }
    }
}

impl MoodClassifier for ModelClassifier {
    fn classify(&self, text: &str) -> Result<MoodLabel, ClassifyError> {
        let raw = self.client.generate(&classify_prompt(text), &self.options)?;
        let mood = parse_mood(&raw)?;
        debug!(mood = %mood, "Model classification");
        Ok(mood)
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

/// Returns the first balanced `{...}` object in `text`.
///
/// Braces inside JSON strings are ignored, so code fences and surrounding prose
/// do not confuse the match.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a mood label out of raw model output.
///
/// Accepts a JSON object with a `mood`, `primary_emotion` or `label` field,
/// or a bare label word. Synonyms are mapped through [`MoodLabel::from_alias`].
///
/// # Errors
///
/// - `MalformedOutput` if no label can be located
/// - `UnknownLabel` if the located label is outside the closed set
pub fn parse_mood(raw: &str) -> Result<MoodLabel, ClassifyError> {
    let Some(object) = extract_json_object(raw) else {
        let bare = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '.' || c == '`' || c.is_whitespace());
        if bare.is_empty() || bare.contains(char::is_whitespace) {
            return Err(ClassifyError::MalformedOutput(format!(
                "no JSON object in output: {:?}",
                raw.chars().take(80).collect::<String>()
            )));
        }
        return MoodLabel::from_alias(bare).ok_or_else(|| ClassifyError::UnknownLabel(bare.to_string()));
    };

    let value: Value = serde_json::from_str(object)
        .map_err(|e| ClassifyError::MalformedOutput(format!("invalid JSON: {}", e)))?;

    let label = ["mood", "primary_emotion", "label"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .ok_or_else(|| ClassifyError::MalformedOutput("JSON object has no mood field".to_string()))?;

    MoodLabel::from_alias(label).ok_or_else(|| ClassifyError::UnknownLabel(label.to_string()))
}
