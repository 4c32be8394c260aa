//! Ties the exercise catalogue, the open session and the review scheduler
//! together. Completed attempts are forwarded to the scheduler as they
//! happen, so callers only ever talk to the trainer.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TrainerError;
use crate::exercises::library::get_library;
use crate::exercises::types::Exercise;
use crate::progress::{ExerciseProgress, ProgressStore, QuizItem, ReviewScheduler, SchedulerConfig};
use crate::session::audio::{AudioCommand, AudioSink, QueuedAudio};
use crate::session::{ExerciseSession, SessionConfig, SessionEffect, SessionView};
use crate::theory::{Key, Pitch};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct TrainerConfig {
    pub session: SessionConfig,
    pub scheduler: SchedulerConfig,
}

pub struct Trainer<S: ProgressStore, R: Rng> {
    catalogue: Vec<Exercise>,
    session: Option<ExerciseSession<QueuedAudio>>,
    session_config: SessionConfig,
    scheduler: ReviewScheduler<S, R>,
    active_quiz: Option<QuizItem>,
    audio_backlog: Vec<AudioCommand>,
}

impl<S: ProgressStore, R: Rng> Trainer<S, R> {
    /// Starts with the built-in library and no open exercise.
    pub fn new(store: S, rng: R, config: TrainerConfig) -> Self {
        Trainer {
            catalogue: get_library(),
            session: None,
            session_config: config.session,
            scheduler: ReviewScheduler::new(store, rng, config.scheduler),
            active_quiz: None,
            audio_backlog: Vec::new(),
        }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.catalogue
    }

    /// Adds an exercise to the catalogue, replacing one with the same id.
    pub fn add_exercise(&mut self, exercise: Exercise) {
        match self.catalogue.iter_mut().find(|e| e.id() == exercise.id()) {
            Some(existing) => *existing = exercise,
            None => self.catalogue.push(exercise),
        }
    }

    pub fn scheduler(&self) -> &ReviewScheduler<S, R> {
        &self.scheduler
    }

    /// Swaps in previously saved progress. Any quiz in flight is dropped.
    pub fn replace_store(&mut self, store: S) -> S {
        self.active_quiz = None;
        self.scheduler.replace_store(store)
    }

    pub fn session(&self) -> Option<&ExerciseSession<QueuedAudio>> {
        self.session.as_ref()
    }

    /// Opens `id` in study, in its authored key.
    pub fn open(&mut self, id: &str) -> Result<SessionView, TrainerError> {
        let exercise = self
            .catalogue
            .iter()
            .find(|e| e.id() == id)
            .cloned()
            .ok_or_else(|| TrainerError::UnknownExercise(id.to_string()))?;
        self.replace_session(ExerciseSession::new(
            exercise,
            QueuedAudio::new(),
            self.session_config.clone(),
        ));
        self.active_quiz = None;
        self.view()
    }

    /// Opens the exercise behind a queued quiz straight into practice, in
    /// the quiz key. Finishing it settles the quiz instead of recording a
    /// regular completion.
    pub fn open_quiz(&mut self, quiz_id: &str) -> Result<SessionView, TrainerError> {
        let item = self
            .scheduler
            .queue()
            .into_iter()
            .find(|q| q.id == quiz_id)
            .ok_or_else(|| TrainerError::UnknownQuiz(quiz_id.to_string()))?;
        self.open(&item.exercise_id)?;
        let session = self.session_mut()?;
        session.set_key(item.key);
        session.start_practice();
        self.active_quiz = Some(item);
        self.view()
    }

    pub fn view(&self) -> Result<SessionView, TrainerError> {
        self.session
            .as_ref()
            .map(ExerciseSession::view)
            .ok_or(TrainerError::NoSession)
    }

    pub fn start_practice(&mut self) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.start_practice())
    }

    pub fn show_study(&mut self) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.show_study())
    }

    pub fn practice_again(&mut self) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.practice_again())
    }

    pub fn next_key(&mut self) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.next_key())
    }

    pub fn set_key(&mut self, key: Key) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.set_key(key))
    }

    pub fn select_solution(&mut self, index: usize) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.select_solution(index))
    }

    /// `now` is the session clock in seconds; `wall` stamps any completion
    /// this placement causes.
    pub fn place_note(
        &mut self,
        pitch: Pitch,
        beat_index: usize,
        now: f64,
        wall: DateTime<Utc>,
    ) -> Result<Vec<SessionEffect>, TrainerError> {
        let effects = self.session_mut()?.place_note(pitch, beat_index, now);
        for effect in &effects {
            if let SessionEffect::Completed(record) = effect {
                self.settle(&record.exercise_id, record.accuracy, record.key, wall);
            }
        }
        Ok(effects)
    }

    pub fn reveal_hint(&mut self, now: f64) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.reveal_hint(now))
    }

    pub fn tick(&mut self, now: f64) -> Result<Vec<SessionEffect>, TrainerError> {
        Ok(self.session_mut()?.tick(now))
    }

    pub fn play(&mut self) -> Result<(), TrainerError> {
        self.session_mut()?.play();
        Ok(())
    }

    /// Audio commands issued since the last drain, oldest first.
    pub fn drain_audio(&mut self) -> Vec<AudioCommand> {
        let mut commands = std::mem::take(&mut self.audio_backlog);
        if let Some(session) = self.session.as_mut() {
            commands.extend(session.audio_mut().drain());
        }
        commands
    }

    pub fn due_for_review(&mut self, wall: DateTime<Utc>) -> Vec<QuizItem> {
        self.scheduler.due_for_review(wall)
    }

    pub fn all_progress(&self) -> Vec<ExerciseProgress> {
        self.scheduler.all_progress()
    }

    pub fn reset_progress(&mut self) {
        self.active_quiz = None;
        self.scheduler.reset();
    }

    fn session_mut(&mut self) -> Result<&mut ExerciseSession<QueuedAudio>, TrainerError> {
        self.session.as_mut().ok_or(TrainerError::NoSession)
    }

    fn replace_session(&mut self, session: ExerciseSession<QueuedAudio>) {
        if let Some(mut old) = self.session.replace(session) {
            old.audio_mut().stop();
            self.audio_backlog.extend(old.audio_mut().drain());
        }
    }

    fn settle(&mut self, exercise_id: &str, accuracy: f64, key: Key, wall: DateTime<Utc>) {
        match self.active_quiz.take() {
            Some(quiz) if quiz.exercise_id == exercise_id => {
                let passed = accuracy >= self.scheduler.config().promote_threshold;
                log::debug!("Quiz {} finished, passed: {}", quiz.id, passed);
                self.scheduler.complete_quiz(&quiz, passed, wall);
            }
            _ => {
                self.scheduler.record_completion(exercise_id, accuracy, key, wall);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryStore;
    use crate::session::Phase;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wall() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn trainer() -> Trainer<MemoryStore, StdRng> {
        Trainer::new(MemoryStore::new(), StdRng::seed_from_u64(7), TrainerConfig::default())
    }

    fn solve(t: &mut Trainer<MemoryStore, StdRng>, wall: DateTime<Utc>) -> Vec<SessionEffect> {
        let view = t.view().unwrap();
        let session = t.session().unwrap();
        let solution: Vec<Pitch> = session.soprano().notes.iter().map(|n| n.pitch).collect();
        assert_eq!(view.phase, Phase::Practice);
        let mut effects = Vec::new();
        for (i, pitch) in solution.into_iter().enumerate() {
            effects.extend(t.place_note(pitch, i, i as f64, wall).unwrap());
        }
        effects
    }

    #[test]
    fn test_catalogue_starts_with_library() {
        let t = trainer();
        assert_eq!(t.exercises().len(), get_library().len());
        assert!(t.view().is_err());
    }

    #[test]
    fn test_unknown_exercise() {
        let mut t = trainer();
        assert_eq!(
            t.open("nope"),
            Err(TrainerError::UnknownExercise("nope".to_string()))
        );
        assert_eq!(t.start_practice(), Err(TrainerError::NoSession));
    }

    #[test]
    fn test_completion_is_recorded() {
        let mut t = trainer();
        let id = t.exercises()[0].id().to_string();
        t.open(&id).unwrap();
        t.start_practice().unwrap();
        let effects = solve(&mut t, wall());
        assert!(effects.iter().any(|e| matches!(e, SessionEffect::Completed(_))));

        let progress = t.scheduler().progress(&id).unwrap();
        assert!(progress.completed);
        assert_eq!(progress.best_accuracy, 1.0);
        assert_eq!(progress.mastery_level, 1);
        assert_eq!(t.scheduler().queue().len(), 1);
    }

    #[test]
    fn test_quiz_settles_instead_of_recording() {
        let mut t = trainer();
        let id = t.exercises()[0].id().to_string();
        t.open(&id).unwrap();
        t.start_practice().unwrap();
        solve(&mut t, wall());

        let later = wall() + Duration::days(5);
        let quiz = t.due_for_review(later).remove(0);
        let view = t.open_quiz(&quiz.id).unwrap();
        assert_eq!(view.phase, Phase::Practice);
        assert_eq!(view.key, quiz.key);

        solve(&mut t, later);
        assert!(t.scheduler().queue().is_empty());
        let progress = t.scheduler().progress(&id).unwrap();
        assert_eq!(progress.mastery_level, 2);
        assert_eq!(progress.next_review, Some(later + Duration::days(7)));
    }

    #[test]
    fn test_unknown_quiz() {
        let mut t = trainer();
        assert_eq!(
            t.open_quiz("x@0"),
            Err(TrainerError::UnknownQuiz("x@0".to_string()))
        );
    }

    #[test]
    fn test_switching_exercise_stops_audio() {
        let mut t = trainer();
        let first = t.exercises()[0].id().to_string();
        let second = t.exercises()[1].id().to_string();
        t.open(&first).unwrap();
        t.play().unwrap();
        t.open(&second).unwrap();
        let commands = t.drain_audio();
        assert!(matches!(commands[0], AudioCommand::Play { .. }));
        assert_eq!(commands.last(), Some(&AudioCommand::Stop));
        assert!(t.drain_audio().is_empty());
    }

    #[test]
    fn test_add_exercise_replaces_by_id() {
        let mut t = trainer();
        let before = t.exercises().len();
        let copy = t.exercises()[0].clone();
        t.add_exercise(copy);
        assert_eq!(t.exercises().len(), before);
    }

    #[test]
    fn test_replace_store_restores_snapshot() {
        let mut t = trainer();
        let id = t.exercises()[0].id().to_string();
        t.open(&id).unwrap();
        t.start_practice().unwrap();
        solve(&mut t, wall());
        let saved = t.scheduler().store().snapshot();

        let mut fresh = trainer();
        let old = fresh.replace_store(MemoryStore::from_snapshot(saved.clone()));
        assert!(old.all().is_empty());
        assert_eq!(fresh.scheduler().store().snapshot(), saved);
        assert!(fresh.scheduler().progress(&id).is_some());
    }

    #[test]
    fn test_reset_progress() {
        let mut t = trainer();
        let id = t.exercises()[0].id().to_string();
        t.open(&id).unwrap();
        t.start_practice().unwrap();
        solve(&mut t, wall());
        t.reset_progress();
        assert!(t.all_progress().is_empty());
        assert!(t.scheduler().queue().is_empty());
    }
}
