//! Mood statistics computed on read.
//!
//! Nothing here is stored; every snapshot is recomputed from the entries the
//! store returns for the window.

use crate::db::EntryStore;
use crate::errors::AppResult;
use crate::journal::{DiaryEntry, TimeRange};
use crate::mood::{MoodLabel, Polarity};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Count and share of one label within a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodShare {
    pub mood: MoodLabel,
    pub count: usize,
    /// Percentage of the window's entries, `0.0` when the window is empty.
    pub percent: f64,
}

/// Entry counts by polarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PolarityCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl PolarityCounts {
    fn add(&mut self, polarity: Polarity, count: usize) {
        match polarity {
            Polarity::Positive => self.positive += count,
            Polarity::Neutral => self.neutral += count,
            Polarity::Negative => self.negative += count,
        }
    }
}

/// Mood distribution for one owner over a time window.
///
/// `moods` always lists every label in taxonomy order, including zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodTrendSnapshot {
    pub owner_id: String,
    pub total: usize,
    pub moods: Vec<MoodShare>,
    /// Most frequent label; ties go to the earlier label. `None` for an empty window.
    pub dominant: Option<MoodLabel>,
    pub polarity: PolarityCounts,
}

impl MoodTrendSnapshot {
    pub fn count(&self, mood: MoodLabel) -> usize {
        self.share(mood).map_or(0, |s| s.count)
    }

    pub fn percent(&self, mood: MoodLabel) -> f64 {
        self.share(mood).map_or(0.0, |s| s.percent)
    }

    fn share(&self, mood: MoodLabel) -> Option<&MoodShare> {
        self.moods.iter().find(|s| s.mood == mood)
    }
}

/// Mood tally for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMood {
    pub date: NaiveDate,
    pub total: usize,
    /// Only labels that occurred on the day.
    pub counts: BTreeMap<MoodLabel, usize>,
    pub dominant: MoodLabel,
}

fn tally<'a>(entries: impl IntoIterator<Item = &'a DiaryEntry>) -> [usize; 6] {
    let mut counts = [0usize; 6];
    for entry in entries {
        if let Some(slot) = MoodLabel::ALL.iter().position(|l| *l == entry.mood) {
            counts[slot] += 1;
        }
    }
    counts
}

fn dominant(counts: &[usize; 6]) -> Option<MoodLabel> {
    let mut best: Option<(MoodLabel, usize)> = None;
    for (label, &count) in MoodLabel::ALL.iter().zip(counts.iter()) {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((*label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Builds a snapshot from entries already filtered to one owner and window.
pub fn summarize(owner_id: &str, entries: &[DiaryEntry]) -> MoodTrendSnapshot {
    let counts = tally(entries);
    let total = entries.len();

    let mut polarity = PolarityCounts::default();
    let moods = MoodLabel::ALL
        .iter()
        .zip(counts.iter())
        .map(|(&mood, &count)| {
            polarity.add(mood.polarity(), count);
            let percent = if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            };
            MoodShare { mood, count, percent }
        })
        .collect();

    MoodTrendSnapshot {
        owner_id: owner_id.to_string(),
        total,
        moods,
        dominant: dominant(&counts),
        polarity,
    }
}

/// Computes the mood distribution of an owner's entries in `range`.
///
/// An owner with no entries in the window gets an all-zero snapshot.
///
/// # Errors
///
/// Returns `AppError::Database` if the store cannot be read.
pub fn trend(store: &dyn EntryStore, owner_id: &str, range: &TimeRange) -> AppResult<MoodTrendSnapshot> {
    let entries = store.list_by_owner(owner_id, range)?;
    debug!("Computing trend over {} entries", entries.len());
    Ok(summarize(owner_id, &entries))
}

/// Groups an owner's entries in `range` by UTC day, oldest day first.
///
/// Days without entries are omitted.
///
/// # Errors
///
/// Returns `AppError::Database` if the store cannot be read.
pub fn daily_breakdown(store: &dyn EntryStore, owner_id: &str, range: &TimeRange) -> AppResult<Vec<DailyMood>> {
    let entries = store.list_by_owner(owner_id, range)?;

    let mut by_day: BTreeMap<NaiveDate, Vec<&DiaryEntry>> = BTreeMap::new();
    for entry in &entries {
        by_day.entry(entry.created_at.date_naive()).or_default().push(entry);
    }

    let days = by_day
        .into_iter()
        .filter_map(|(date, day_entries)| {
            let counts = tally(day_entries.iter().copied());
            let top = dominant(&counts)?;
            Some(DailyMood {
                date,
                total: day_entries.len(),
                counts: MoodLabel::ALL
                    .iter()
                    .zip(counts.iter())
                    .filter(|(_, count)| **count > 0)
                    .map(|(&mood, &count)| (mood, count))
                    .collect(),
                dominant: top,
            })
        })
        .collect::<Vec<_>>();

    debug!("Daily breakdown covers {} days", days.len());
    Ok(days)
}
