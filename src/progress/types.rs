use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::theory::Key;

/// Everything remembered about one exercise.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExerciseProgress {
    pub exercise_id: String,
    pub completed: bool,
    /// Best attempt accuracy seen, 0..=1.
    pub best_accuracy: f64,
    pub last_practiced: DateTime<Utc>,
    /// Spaced-repetition strength, 0..=`max_mastery`.
    pub mastery_level: u8,
    pub next_review: Option<DateTime<Utc>>,
    pub completed_keys: BTreeSet<Key>,
}

impl ExerciseProgress {
    pub fn new(exercise_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        ExerciseProgress {
            exercise_id: exercise_id.into(),
            completed: false,
            best_accuracy: 0.0,
            last_practiced: now,
            mastery_level: 0,
            next_review: None,
            completed_keys: BTreeSet::new(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review.is_some_and(|due| due <= now)
    }
}

/// A pending review of one exercise in one key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuizItem {
    pub id: String,
    pub exercise_id: String,
    pub due: DateTime<Utc>,
    pub key: Key,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Days until the next review, indexed by mastery level; levels past
    /// the end use the last entry.
    pub review_intervals_days: Vec<i64>,
    pub max_mastery: u8,
    /// Accuracy at or above this raises mastery by one.
    pub promote_threshold: f64,
    /// Accuracy below this lowers mastery by one.
    pub demote_threshold: f64,
    /// Completions leaving mastery below this queue a review right away.
    pub queue_below_mastery: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            review_intervals_days: vec![1, 3, 7, 14, 30, 60],
            max_mastery: 5,
            promote_threshold: 0.9,
            demote_threshold: 0.5,
            queue_below_mastery: 3,
        }
    }
}
