//! The exercise state machine: study the solution, recall it note by note in
//! practice, then review. Every mutating call returns the effects it caused
//! so the UI can react without observing the session directly.

pub mod audio;
pub mod timers;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::exercises::types::{Exercise, Voice};
use crate::theory::interval::between_in;
use crate::theory::{Accidental, Key, Letter, Pitch};
use crate::transposition::{staff_shift, transpose};

use audio::{merge_events, AudioSink, PlaybackEvent};
use timers::{NoteId, TaskAction, TaskRegistry};

/// Delays are in seconds of the host clock passed to the session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub fade_delay: f64,
    pub removal_delay: f64,
    pub hint_duration: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            fade_delay: 2.0,
            removal_delay: 0.5,
            hint_duration: 3.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Study,
    Practice,
    Review,
}

#[derive(Serialize, Clone, Debug, PartialEq, Default)]
#[serde(tag = "state", content = "interval", rename_all = "lowercase")]
pub enum NoteState {
    /// Placed, not yet judged.
    #[default]
    Normal,
    Correct,
    /// Wrong; carries the bass-to-note interval label, e.g. `"P4"`.
    Incorrect(String),
    Fading,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PlacedNote {
    pub id: NoteId,
    pub pitch: Pitch,
    pub beat_index: usize,
    pub state: NoteState,
}

/// What the progress tracker needs to know about a finished attempt.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CompletionRecord {
    pub exercise_id: String,
    pub accuracy: f64,
    pub key: Key,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEffect {
    PhaseChanged { phase: Phase },
    NotePlaced { note_id: NoteId, correct: bool },
    FadeScheduled { note_id: NoteId, fade_at: f64, remove_at: f64 },
    NoteFaded { note_id: NoteId },
    NoteRemoved { note_id: NoteId },
    HintShown { hide_at: f64 },
    HintHidden,
    TimersCancelled { count: usize },
    Completed(CompletionRecord),
}

/// Everything the UI draws for the current session.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SessionView {
    pub exercise_id: String,
    pub name: String,
    pub phase: Phase,
    pub key: Key,
    pub key_signature: Vec<(Letter, Accidental)>,
    pub bass: Voice,
    /// Present only while the solution is shown.
    pub soprano: Option<Voice>,
    pub solution_index: usize,
    pub solution_count: usize,
    pub placed_notes: Vec<PlacedNote>,
    pub figured_bass: Vec<String>,
    pub correct_count: u32,
    pub total_attempts: u32,
    pub accuracy: Option<f64>,
    pub next_deadline: Option<f64>,
}

pub struct ExerciseSession<A: AudioSink> {
    exercise: Exercise,
    audio: A,
    config: SessionConfig,
    phase: Phase,
    key: Key,
    solution: usize,
    bass: Voice,
    soprano: Voice,
    soprano_visible: bool,
    placed: Vec<PlacedNote>,
    correct_count: u32,
    total_attempts: u32,
    accuracy: Option<f64>,
    timers: TaskRegistry,
    next_note_id: NoteId,
}

impl<A: AudioSink> ExerciseSession<A> {
    /// Opens `exercise` in study, in its authored key, with the solution shown.
    pub fn new(exercise: Exercise, audio: A, config: SessionConfig) -> Self {
        let key = exercise.key();
        let bass = exercise.bass().clone();
        let soprano = exercise.sopranos()[0].clone();
        ExerciseSession {
            exercise,
            audio,
            config,
            phase: Phase::Study,
            key,
            solution: 0,
            bass,
            soprano,
            soprano_visible: true,
            placed: Vec::new(),
            correct_count: 0,
            total_attempts: 0,
            accuracy: None,
            timers: TaskRegistry::new(),
            next_note_id: 1,
        }
    }

    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_key(&self) -> Key {
        self.key
    }

    pub fn solution_index(&self) -> usize {
        self.solution
    }

    /// Bass line in the current key.
    pub fn bass(&self) -> &Voice {
        &self.bass
    }

    /// Active solution in the current key. Whether to draw it is up to
    /// `soprano_visible`.
    pub fn soprano(&self) -> &Voice {
        &self.soprano
    }

    pub fn soprano_visible(&self) -> bool {
        self.soprano_visible
    }

    pub fn placed_notes(&self) -> &[PlacedNote] {
        &self.placed
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    /// Set once the attempt is complete.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn key_signature(&self) -> Vec<(Letter, Accidental)> {
        self.key.signature()
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_due()
    }

    pub fn pending_tasks(&self) -> usize {
        self.timers.len()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            exercise_id: self.exercise.id().to_string(),
            name: self.exercise.name().to_string(),
            phase: self.phase,
            key: self.key,
            key_signature: self.key_signature(),
            bass: self.bass.clone(),
            soprano: self.soprano_visible.then(|| self.soprano.clone()),
            solution_index: self.solution,
            solution_count: self.exercise.sopranos().len(),
            placed_notes: self.placed.clone(),
            figured_bass: self.figured_bass(),
            correct_count: self.correct_count,
            total_attempts: self.total_attempts,
            accuracy: self.accuracy,
            next_deadline: self.next_deadline(),
        }
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    /// Per-beat interval sizes from bass to solution, 1..=7 with unisons
    /// and octaves written as "8".
    pub fn figured_bass(&self) -> Vec<String> {
        self.bass
            .notes
            .iter()
            .zip(&self.soprano.notes)
            .map(|(b, s)| between_in(&b.pitch, &s.pitch, &self.key).figure())
            .collect()
    }

    pub fn start_practice(&mut self) -> Vec<SessionEffect> {
        if self.phase != Phase::Study {
            return Vec::new();
        }
        self.restart(Phase::Practice)
    }

    pub fn show_study(&mut self) -> Vec<SessionEffect> {
        self.restart(Phase::Study)
    }

    /// Review back to practice in the same key.
    pub fn practice_again(&mut self) -> Vec<SessionEffect> {
        if self.phase != Phase::Review {
            return Vec::new();
        }
        self.restart(Phase::Practice)
    }

    /// Review to practice in the next key on the circle of fourths.
    pub fn next_key(&mut self) -> Vec<SessionEffect> {
        if self.phase != Phase::Review {
            return Vec::new();
        }
        self.key = self.key.next_in_circle();
        log::debug!("{}: advancing to {}", self.exercise.id(), self.key);
        self.retranspose();
        self.restart(Phase::Practice)
    }

    /// Moves to any key. Study stays in study; practice and review restart
    /// practice.
    pub fn set_key(&mut self, key: Key) -> Vec<SessionEffect> {
        self.key = key;
        self.retranspose();
        self.restart(self.phase_after_change())
    }

    /// Switches to another known solution. Out-of-range indices are ignored.
    pub fn select_solution(&mut self, index: usize) -> Vec<SessionEffect> {
        if index >= self.exercise.sopranos().len() {
            return Vec::new();
        }
        self.solution = index;
        self.retranspose();
        self.restart(self.phase_after_change())
    }

    /// Places `pitch` at `beat_index` and judges it against the solution.
    ///
    /// Ignored outside practice, past the last beat, or on a beat already
    /// solved. A pitch matches when it sits on the expected line or space
    /// and sounds the same once the current key signature is applied, so an
    /// unmarked F in G major matches a written F sharp.
    pub fn place_note(&mut self, pitch: Pitch, beat_index: usize, now: f64) -> Vec<SessionEffect> {
        if self.phase != Phase::Practice {
            return Vec::new();
        }
        let (Some(expected), Some(bass)) = (
            self.soprano.pitch_at(beat_index),
            self.bass.pitch_at(beat_index),
        ) else {
            return Vec::new();
        };
        if let Some(pos) = self.placed.iter().position(|n| n.beat_index == beat_index) {
            if self.placed[pos].state == NoteState::Correct {
                return Vec::new();
            }
            let old = self.placed.remove(pos);
            self.timers.cancel_note(old.id);
        }

        let id = self.next_note_id;
        self.next_note_id += 1;
        self.total_attempts += 1;

        let event = PlaybackEvent {
            pitch,
            midi: pitch.chromatic_value_in(&self.key),
            start_beat: 0.0,
            duration_beats: 1.0,
        };
        self.audio.preview(event);

        let mut note = PlacedNote {
            id,
            pitch,
            beat_index,
            state: NoteState::default(),
        };
        let mut effects = Vec::new();

        if pitch.matches_in(&expected, &self.key) {
            note.state = NoteState::Correct;
            self.correct_count += 1;
            self.placed.push(note);
            effects.push(SessionEffect::NotePlaced {
                note_id: id,
                correct: true,
            });
            effects.extend(self.check_completion());
        } else {
            let label = between_in(&bass, &pitch, &self.key).display_name();
            note.state = NoteState::Incorrect(label);
            self.placed.push(note);

            let fade_at = now + self.config.fade_delay;
            let remove_at = fade_at + self.config.removal_delay;
            self.timers.schedule(fade_at, TaskAction::Fade(id));
            self.timers.schedule(remove_at, TaskAction::Remove(id));
            effects.push(SessionEffect::NotePlaced {
                note_id: id,
                correct: false,
            });
            effects.push(SessionEffect::FadeScheduled {
                note_id: id,
                fade_at,
                remove_at,
            });
        }
        effects
    }

    /// Shows the solution during practice for `hint_duration` seconds.
    pub fn reveal_hint(&mut self, now: f64) -> Vec<SessionEffect> {
        if self.phase != Phase::Practice {
            return Vec::new();
        }
        self.timers.cancel_hint();
        let hide_at = now + self.config.hint_duration;
        self.timers.schedule(hide_at, TaskAction::HideHint);
        self.soprano_visible = true;
        vec![SessionEffect::HintShown { hide_at }]
    }

    /// Runs every deferred task due at `now`. Tasks whose note is gone, or a
    /// hint that expires after practice ended, do nothing.
    pub fn tick(&mut self, now: f64) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        for action in self.timers.take_due(now) {
            match action {
                TaskAction::Fade(id) => {
                    if let Some(note) = self.placed.iter_mut().find(|n| n.id == id) {
                        if matches!(note.state, NoteState::Incorrect(_)) {
                            note.state = NoteState::Fading;
                            effects.push(SessionEffect::NoteFaded { note_id: id });
                        }
                    }
                }
                TaskAction::Remove(id) => {
                    let before = self.placed.len();
                    self.placed
                        .retain(|n| n.id != id || n.state == NoteState::Correct);
                    if self.placed.len() < before {
                        effects.push(SessionEffect::NoteRemoved { note_id: id });
                    }
                }
                TaskAction::HideHint => {
                    if self.phase == Phase::Practice {
                        self.soprano_visible = false;
                        effects.push(SessionEffect::HintHidden);
                    }
                }
            }
        }
        effects
    }

    /// Plays the bass and, if shown, the solution.
    pub fn play(&mut self) {
        let events = self.playback_events(self.soprano_visible);
        self.audio.play(&events);
    }

    pub fn playback_events(&self, include_soprano: bool) -> Vec<PlaybackEvent> {
        if include_soprano {
            merge_events(&[&self.bass, &self.soprano], &self.key)
        } else {
            merge_events(&[&self.bass], &self.key)
        }
    }

    fn phase_after_change(&self) -> Phase {
        match self.phase {
            Phase::Study => Phase::Study,
            Phase::Practice | Phase::Review => Phase::Practice,
        }
    }

    fn retranspose(&mut self) {
        let from = self.exercise.key();
        log::debug!(
            "Transposing {} from {} to {} ({} staff steps)",
            self.exercise.id(),
            from,
            self.key,
            staff_shift(&from, &self.key)
        );
        self.bass = transpose(self.exercise.bass(), &from, &self.key);
        self.soprano = transpose(&self.exercise.sopranos()[self.solution], &from, &self.key);
    }

    /// Clears the attempt and enters `phase`. The solution is shown only in
    /// study.
    fn restart(&mut self, phase: Phase) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            log::debug!("Cancelled {} pending session tasks", cancelled);
            effects.push(SessionEffect::TimersCancelled { count: cancelled });
        }
        self.audio.stop();
        self.placed.clear();
        self.correct_count = 0;
        self.total_attempts = 0;
        self.accuracy = None;
        self.soprano_visible = phase == Phase::Study;
        self.phase = phase;
        log::debug!("{} entered {:?} in {}", self.exercise.id(), phase, self.key);
        effects.push(SessionEffect::PhaseChanged { phase });
        effects
    }

    fn check_completion(&mut self) -> Vec<SessionEffect> {
        let solved: BTreeSet<usize> = self
            .placed
            .iter()
            .filter(|n| n.state == NoteState::Correct)
            .map(|n| n.beat_index)
            .collect();
        if solved.len() < self.exercise.len() {
            return Vec::new();
        }

        let accuracy = if self.total_attempts == 0 {
            1.0
        } else {
            self.correct_count as f64 / self.total_attempts as f64
        };
        self.accuracy = Some(accuracy);
        self.phase = Phase::Review;
        self.soprano_visible = true;
        log::debug!(
            "{} complete in {} with accuracy {:.2}",
            self.exercise.id(),
            self.key,
            accuracy
        );

        vec![
            SessionEffect::PhaseChanged {
                phase: Phase::Review,
            },
            SessionEffect::Completed(CompletionRecord {
                exercise_id: self.exercise.id().to_string(),
                accuracy,
                key: self.key,
            }),
        ]
    }
}
