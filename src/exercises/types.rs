use serde::{Deserialize, Serialize};

use crate::error::ExerciseError;
use crate::theory::{Key, Pitch};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Duration {
    Whole,
    Half,
    Quarter,
    Eighth,
}

impl Duration {
    pub fn beats(self) -> f64 {
        match self {
            Duration::Whole => 4.0,
            Duration::Half => 2.0,
            Duration::Quarter => 1.0,
            Duration::Eighth => 0.5,
        }
    }

    /// Maps a MusicXML `<type>` name.
    pub fn from_type_name(name: &str) -> Option<Duration> {
        match name {
            "whole" => Some(Duration::Whole),
            "half" => Some(Duration::Half),
            "quarter" => Some(Duration::Quarter),
            "eighth" => Some(Duration::Eighth),
            _ => None,
        }
    }

    /// Closest duration for a length in beats.
    pub fn from_beats(beats: f64) -> Duration {
        if beats >= 3.0 {
            Duration::Whole
        } else if beats >= 1.5 {
            Duration::Half
        } else if beats >= 0.75 {
            Duration::Quarter
        } else {
            Duration::Eighth
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub pitch: Pitch,
    pub duration: Duration,
    /// Offset from the start of the voice, in quarter-note beats.
    pub beat: f64,
}

/// One line of music, ordered by `beat`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Voice {
    pub notes: Vec<Note>,
}

impl Voice {
    pub fn new(notes: Vec<Note>) -> Self {
        Voice { notes }
    }

    /// Consecutive whole notes starting at beat 0.
    pub fn whole_notes(pitches: &[Pitch]) -> Self {
        let notes = pitches
            .iter()
            .enumerate()
            .map(|(i, &pitch)| Note {
                pitch,
                duration: Duration::Whole,
                beat: i as f64 * Duration::Whole.beats(),
            })
            .collect();
        Voice { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn total_beats(&self) -> f64 {
        self.notes.iter().map(|n| n.duration.beats()).sum()
    }

    pub fn pitch_at(&self, index: usize) -> Option<Pitch> {
        self.notes.get(index).map(|n| n.pitch)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// Note against note, whole-note rhythm.
    First,
}

/// A bass line with its known soprano solutions, authored in one key.
/// Other keys are derived by transposition and never stored.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Exercise {
    id: String,
    name: String,
    bassline: String,
    species: Species,
    key: Key,
    bass: Voice,
    sopranos: Vec<Voice>,
    pattern: String,
}

impl Exercise {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        bassline: impl Into<String>,
        key: Key,
        bass: Voice,
        sopranos: Vec<Voice>,
        pattern: impl Into<String>,
    ) -> Result<Self, ExerciseError> {
        let id = id.into();
        if bass.is_empty() {
            return Err(ExerciseError::EmptyBass(id));
        }
        if sopranos.is_empty() {
            return Err(ExerciseError::NoSoprano(id));
        }
        if let Some((index, soprano)) = sopranos
            .iter()
            .enumerate()
            .find(|(_, s)| s.len() != bass.len())
        {
            return Err(ExerciseError::SopranoLength {
                id,
                index,
                expected: bass.len(),
                found: soprano.len(),
            });
        }

        Ok(Exercise {
            id,
            name: name.into(),
            bassline: bassline.into(),
            species: Species::First,
            key,
            bass,
            sopranos,
            pattern: pattern.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bassline(&self) -> &str {
        &self.bassline
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn bass(&self) -> &Voice {
        &self.bass
    }

    pub fn sopranos(&self) -> &[Voice] {
        &self.sopranos
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of note pairs (beat indices) in the exercise.
    pub fn len(&self) -> usize {
        self.bass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bass.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitches(names: &[&str]) -> Vec<Pitch> {
        names.iter().map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn test_whole_notes_layout() {
        let voice = Voice::whole_notes(&pitches(&["C3", "G3", "C3"]));
        assert_eq!(voice.len(), 3);
        let beats: Vec<f64> = voice.notes.iter().map(|n| n.beat).collect();
        assert_eq!(beats, vec![0.0, 4.0, 8.0]);
        assert_eq!(voice.total_beats(), 12.0);
        assert!(voice.notes.iter().all(|n| n.duration == Duration::Whole));
    }

    #[test]
    fn test_duration_beats() {
        assert_eq!(Duration::Half.beats(), 2.0);
        assert_eq!(Duration::Eighth.beats(), 0.5);
        assert_eq!(Duration::from_type_name("quarter"), Some(Duration::Quarter));
        assert_eq!(Duration::from_type_name("breve"), None);
        assert_eq!(Duration::from_beats(4.0), Duration::Whole);
        assert_eq!(Duration::from_beats(2.0), Duration::Half);
    }

    #[test]
    fn test_exercise_validation() {
        let bass = Voice::whole_notes(&pitches(&["C3", "G3", "C3"]));
        let good = Voice::whole_notes(&pitches(&["C5", "B4", "C5"]));
        let short = Voice::whole_notes(&pitches(&["C5", "B4"]));

        let ex = Exercise::new("a", "A", "1", Key::default(), bass.clone(), vec![good.clone()], "8-3-8")
            .unwrap();
        assert_eq!(ex.len(), 3);
        assert_eq!(ex.species(), Species::First);

        assert_eq!(
            Exercise::new("b", "B", "1", Key::default(), Voice::default(), vec![good.clone()], ""),
            Err(ExerciseError::EmptyBass("b".to_string()))
        );
        assert_eq!(
            Exercise::new("c", "C", "1", Key::default(), bass.clone(), vec![], ""),
            Err(ExerciseError::NoSoprano("c".to_string()))
        );
        assert!(matches!(
            Exercise::new("d", "D", "1", Key::default(), bass, vec![good, short], ""),
            Err(ExerciseError::SopranoLength { index: 1, expected: 3, found: 2, .. })
        ));
    }
}
