use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::progress::store::ProgressStore;
use crate::progress::types::{ExerciseProgress, QuizItem, SchedulerConfig};
use crate::theory::Key;

/// Tracks mastery per exercise and keeps the review queue, holding at most
/// one quiz per exercise.
pub struct ReviewScheduler<S: ProgressStore, R: Rng> {
    store: S,
    rng: R,
    config: SchedulerConfig,
}

impl<S: ProgressStore, R: Rng> ReviewScheduler<S, R> {
    pub fn new(store: S, rng: R, config: SchedulerConfig) -> Self {
        ReviewScheduler { store, rng, config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Swaps the backing store, returning the old one.
    pub fn replace_store(&mut self, store: S) -> S {
        std::mem::replace(&mut self.store, store)
    }

    pub fn progress(&self, exercise_id: &str) -> Option<ExerciseProgress> {
        self.store.get(exercise_id)
    }

    pub fn all_progress(&self) -> Vec<ExerciseProgress> {
        self.store.all()
    }

    /// The whole queue, earliest due first.
    pub fn queue(&self) -> Vec<QuizItem> {
        self.store.queue()
    }

    /// Records a finished attempt in `key` and reschedules its review.
    pub fn record_completion(
        &mut self,
        exercise_id: &str,
        accuracy: f64,
        key: Key,
        now: DateTime<Utc>,
    ) -> ExerciseProgress {
        let mut progress = self
            .store
            .get(exercise_id)
            .unwrap_or_else(|| ExerciseProgress::new(exercise_id, now));

        progress.completed = true;
        progress.last_practiced = now;
        progress.best_accuracy = progress.best_accuracy.max(accuracy);
        progress.completed_keys.insert(key);
        self.apply_result(&mut progress, accuracy, now);
        self.store.put(progress.clone());

        if progress.mastery_level < self.config.queue_below_mastery {
            if let Some(due) = progress.next_review {
                self.enqueue(&progress, due);
            }
        }
        progress
    }

    /// Queues every overdue exercise that has no quiz yet, then returns the
    /// quizzes due at `now`, earliest first. Safe to call repeatedly.
    pub fn due_for_review(&mut self, now: DateTime<Utc>) -> Vec<QuizItem> {
        for progress in self.store.all() {
            if progress.is_due(now) {
                if let Some(due) = progress.next_review {
                    self.enqueue(&progress, due);
                }
            }
        }
        self.store
            .queue()
            .into_iter()
            .filter(|item| item.due <= now)
            .collect()
    }

    /// Takes `item` off the queue and applies the result to its exercise.
    /// Quizzes for exercises with no progress record change nothing else.
    pub fn complete_quiz(
        &mut self,
        item: &QuizItem,
        was_correct: bool,
        now: DateTime<Utc>,
    ) -> Option<ExerciseProgress> {
        let mut queue = self.store.queue();
        queue.retain(|q| q.id != item.id);
        self.store.set_queue(queue);

        let mut progress = self.store.get(&item.exercise_id)?;
        let accuracy = if was_correct { 1.0 } else { 0.0 };
        progress.last_practiced = now;
        self.apply_result(&mut progress, accuracy, now);
        self.store.put(progress.clone());
        Some(progress)
    }

    /// Forgets all progress and empties the queue.
    pub fn reset(&mut self) {
        log::debug!("Resetting all progress");
        self.store.clear();
    }

    fn apply_result(&self, progress: &mut ExerciseProgress, accuracy: f64, now: DateTime<Utc>) {
        let level = progress.mastery_level;
        progress.mastery_level = if accuracy >= self.config.promote_threshold {
            (level + 1).min(self.config.max_mastery)
        } else if accuracy < self.config.demote_threshold {
            level.saturating_sub(1)
        } else {
            level
        };
        progress.next_review = Some(now + self.review_interval(progress.mastery_level));
    }

    fn review_interval(&self, mastery: u8) -> Duration {
        let intervals = &self.config.review_intervals_days;
        let days = intervals
            .get(mastery as usize)
            .or(intervals.last())
            .copied()
            .unwrap_or(1);
        Duration::days(days)
    }

    /// Adds a quiz for `progress` unless one is already queued. The quiz key
    /// is drawn uniformly from the keys the exercise was completed in.
    fn enqueue(&mut self, progress: &ExerciseProgress, due: DateTime<Utc>) -> bool {
        let mut queue = self.store.queue();
        if queue.iter().any(|q| q.exercise_id == progress.exercise_id) {
            return false;
        }

        let keys = &progress.completed_keys;
        let key = if keys.is_empty() {
            log::warn!("{} has no completed keys, quizzing in C", progress.exercise_id);
            Key::default()
        } else {
            let pick = self.rng.random_range(0..keys.len());
            keys.iter().nth(pick).copied().unwrap_or_default()
        };

        queue.push(QuizItem {
            id: format!("{}@{}", progress.exercise_id, due.timestamp()),
            exercise_id: progress.exercise_id.clone(),
            due,
            key,
        });
        queue.sort_by_key(|q| q.due);
        self.store.set_queue(queue);
        true
    }
}
