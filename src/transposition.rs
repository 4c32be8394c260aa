use crate::exercises::types::Voice;
use crate::theory::Key;

/// Number of staff steps that carries music written in `from` to `to`.
///
/// The step count follows the tonic letters; when the tonics are more than
/// a tritone apart the shift goes the other way round the octave, so that a
/// line never drifts more than six semitones from where it was written.
/// For C to A that is two steps down rather than five up.
pub fn staff_shift(from: &Key, to: &Key) -> i32 {
    let semitones = to.tonic_semitone() - from.tonic_semitone();
    let steps = to.tonic.index() - from.tonic.index();
    if semitones > 6 {
        steps - 7
    } else if semitones < -6 {
        steps + 7
    } else {
        steps
    }
}

/// Re-writes `voice` from `from` into `to` by moving every note the same
/// number of staff steps. Notes without an explicit accidental pick up the
/// new key's signature. Explicit accidentals are kept as written and are not
/// re-spelled for the new key. Beats and durations are untouched.
pub fn transpose(voice: &Voice, from: &Key, to: &Key) -> Voice {
    let shift = staff_shift(from, to);
    let notes = voice
        .notes
        .iter()
        .map(|note| {
            let mut note = *note;
            note.pitch = note.pitch.shifted(shift);
            note
        })
        .collect();
    Voice::new(notes)
}
