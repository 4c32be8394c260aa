use serde::{Deserialize, Serialize};

use crate::theory::key::Key;
use crate::theory::pitch::Pitch;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Perfect,
    Major,
    Minor,
    Augmented,
    Diminished,
}

impl Quality {
    pub fn letter(self) -> &'static str {
        match self {
            Quality::Perfect => "P",
            Quality::Major => "M",
            Quality::Minor => "m",
            Quality::Augmented => "A",
            Quality::Diminished => "d",
        }
    }
}

/// A diatonic interval. `diatonic_size` counts lines and spaces inclusively
/// (1 = unison, 8 = octave, 10 = compound third) and `semitones` is the
/// absolute chromatic distance.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub semitones: i32,
    pub quality: Quality,
    pub diatonic_size: i32,
}

// Semitones of the perfect or major interval for simple sizes 1..=7.
const REFERENCE_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

fn is_perfect_size(simple: i32) -> bool {
    matches!(simple, 1 | 4 | 5)
}

/// Interval from `lower` to `upper`, using each pitch's own spelling.
/// Order only matters for naming; a reversed pair gives the same interval.
pub fn between(lower: &Pitch, upper: &Pitch) -> Interval {
    measure(
        upper.staff_position() - lower.staff_position(),
        upper.chromatic_value() - lower.chromatic_value(),
    )
}

/// Like `between`, with notes lacking an explicit accidental read through
/// `key`'s signature.
pub fn between_in(lower: &Pitch, upper: &Pitch, key: &Key) -> Interval {
    measure(
        upper.staff_position() - lower.staff_position(),
        upper.chromatic_value_in(key) - lower.chromatic_value_in(key),
    )
}

fn measure(steps: i32, semitones: i32) -> Interval {
    let steps = steps.abs();
    let semitones = semitones.abs();
    let diatonic_size = steps + 1;
    let simple = simple_size(diatonic_size);

    // Signed distance from the reference interval, folded into -6..=5 so
    // that e.g. a diminished octave (11 semitones over a unison size) reads as -1.
    let reference = REFERENCE_SEMITONES[(simple - 1) as usize];
    let deviation = (semitones.rem_euclid(12) - reference + 6).rem_euclid(12) - 6;

    let quality = if is_perfect_size(simple) {
        match deviation {
            0 => Quality::Perfect,
            d if d > 0 => Quality::Augmented,
            _ => Quality::Diminished,
        }
    } else {
        match deviation {
            0 => Quality::Major,
            -1 => Quality::Minor,
            d if d > 0 => Quality::Augmented,
            _ => Quality::Diminished,
        }
    };

    Interval {
        semitones,
        quality,
        diatonic_size,
    }
}

/// Folds a compound size into 1..=7.
pub fn simple_size(diatonic_size: i32) -> i32 {
    (diatonic_size - 1).rem_euclid(7) + 1
}

impl Interval {
    pub fn simple_size(&self) -> i32 {
        simple_size(self.diatonic_size)
    }

    /// Perfect unisons/octaves/fifths and major or minor thirds/sixths.
    /// Fourths count as dissonant here.
    pub fn is_consonant(&self) -> bool {
        match (self.simple_size(), self.quality) {
            (1 | 5, Quality::Perfect) => true,
            (3 | 6, Quality::Major | Quality::Minor) => true,
            _ => false,
        }
    }

    /// Quality letter and simple size, e.g. `"P5"` or `"m3"`. Compound
    /// unisons keep their octave name (`"P8"`).
    pub fn display_name(&self) -> String {
        let simple = self.simple_size();
        let size = if simple == 1 && self.diatonic_size > 1 {
            8
        } else {
            simple
        };
        format!("{}{}", self.quality.letter(), size)
    }

    /// Figured-bass digit: the simple size, with unisons written as "8".
    pub fn figure(&self) -> String {
        match self.simple_size() {
            1 => "8".to_string(),
            n => n.to_string(),
        }
    }
}
