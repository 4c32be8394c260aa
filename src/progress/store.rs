use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::progress::types::{ExerciseProgress, QuizItem};

/// Persistence port for progress records and the review queue.
pub trait ProgressStore {
    fn get(&self, exercise_id: &str) -> Option<ExerciseProgress>;
    fn put(&mut self, progress: ExerciseProgress);
    fn all(&self) -> Vec<ExerciseProgress>;
    fn queue(&self) -> Vec<QuizItem>;
    fn set_queue(&mut self, queue: Vec<QuizItem>);
    fn clear(&mut self);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    progress: BTreeMap<String, ExerciseProgress>,
    queue: Vec<QuizItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ProgressSnapshot) -> Self {
        MemoryStore {
            progress: snapshot
                .progress
                .into_iter()
                .map(|p| (p.exercise_id.clone(), p))
                .collect(),
            queue: snapshot.queue,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            progress: self.progress.values().cloned().collect(),
            queue: self.queue.clone(),
        }
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, exercise_id: &str) -> Option<ExerciseProgress> {
        self.progress.get(exercise_id).cloned()
    }

    fn put(&mut self, progress: ExerciseProgress) {
        self.progress.insert(progress.exercise_id.clone(), progress);
    }

    fn all(&self) -> Vec<ExerciseProgress> {
        self.progress.values().cloned().collect()
    }

    fn queue(&self) -> Vec<QuizItem> {
        self.queue.clone()
    }

    fn set_queue(&mut self, queue: Vec<QuizItem>) {
        self.queue = queue;
    }

    fn clear(&mut self) {
        self.progress.clear();
        self.queue.clear();
    }
}

/// Serializable image of a store, for whatever key-value storage the host has.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ProgressSnapshot {
    pub progress: Vec<ExerciseProgress>,
    pub queue: Vec<QuizItem>,
}

impl ProgressSnapshot {
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }
}
