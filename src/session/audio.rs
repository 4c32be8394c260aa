use serde::Serialize;

use crate::exercises::types::Voice;
use crate::theory::{Key, Pitch};

/// One note for the audio layer. Beats are quarter notes from the start of
/// the exercise; turning them into wall-clock time is up to the player.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct PlaybackEvent {
    pub pitch: Pitch,
    /// Sounding MIDI number with the key signature applied.
    pub midi: i32,
    pub start_beat: f64,
    pub duration_beats: f64,
}

pub fn voice_events(voice: &Voice, key: &Key) -> Vec<PlaybackEvent> {
    voice
        .notes
        .iter()
        .map(|note| PlaybackEvent {
            pitch: note.pitch,
            midi: note.pitch.chromatic_value_in(key),
            start_beat: note.beat,
            duration_beats: note.duration.beats(),
        })
        .collect()
}

/// Merges several voices into one beat-ordered list. Simultaneous notes
/// keep the order of `voices`.
pub fn merge_events(voices: &[&Voice], key: &Key) -> Vec<PlaybackEvent> {
    let mut events: Vec<PlaybackEvent> = voices
        .iter()
        .flat_map(|voice| voice_events(voice, key))
        .collect();
    events.sort_by(|a, b| {
        a.start_beat
            .partial_cmp(&b.start_beat)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    events
}

/// Where a session sends sound.
pub trait AudioSink {
    /// Short audition of a single placed note.
    fn preview(&mut self, event: PlaybackEvent);
    fn play(&mut self, events: &[PlaybackEvent]);
    fn stop(&mut self);
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioCommand {
    Preview { event: PlaybackEvent },
    Play { events: Vec<PlaybackEvent> },
    Stop,
}

/// Buffers commands until the host drains them; the browser shell forwards
/// them to its synthesizer.
#[derive(Clone, Debug, Default)]
pub struct QueuedAudio {
    commands: Vec<AudioCommand>,
}

impl QueuedAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl AudioSink for QueuedAudio {
    fn preview(&mut self, event: PlaybackEvent) {
        self.commands.push(AudioCommand::Preview { event });
    }

    fn play(&mut self, events: &[PlaybackEvent]) {
        self.commands.push(AudioCommand::Play {
            events: events.to_vec(),
        });
    }

    fn stop(&mut self) {
        self.commands.push(AudioCommand::Stop);
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn preview(&mut self, _event: PlaybackEvent) {}
    fn play(&mut self, _events: &[PlaybackEvent]) {}
    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(names: &[&str]) -> Voice {
        let pitches: Vec<Pitch> = names.iter().map(|n| n.parse().unwrap()).collect();
        Voice::whole_notes(&pitches)
    }

    #[test]
    fn test_voice_events_apply_key() {
        let key: Key = "F".parse().unwrap();
        let events = voice_events(&voice(&["F2", "B2"]), &key);
        assert_eq!(events[0].midi, 41);
        assert_eq!(events[1].midi, 46);
        assert_eq!(events[1].start_beat, 4.0);
        assert_eq!(events[1].duration_beats, 4.0);
    }

    #[test]
    fn test_merge_events_interleaves_by_beat() {
        let key = Key::default();
        let bass = voice(&["C3", "G3"]);
        let soprano = voice(&["C5", "B4"]);
        let events = merge_events(&[&bass, &soprano], &key);
        let midis: Vec<i32> = events.iter().map(|e| e.midi).collect();
        assert_eq!(midis, vec![48, 72, 55, 71]);
    }

    #[test]
    fn test_queued_audio_drains() {
        let mut audio = QueuedAudio::new();
        audio.stop();
        audio.play(&[]);
        assert_eq!(audio.drain().len(), 2);
        assert!(audio.drain().is_empty());
    }
}
