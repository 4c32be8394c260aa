use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TheoryError;
use crate::theory::pitch::{Accidental, Letter};

/// Order in which sharps enter a key signature.
pub const SHARP_ORDER: [Letter; 7] = [
    Letter::F,
    Letter::C,
    Letter::G,
    Letter::D,
    Letter::A,
    Letter::E,
    Letter::B,
];

/// Order in which flats enter a key signature.
pub const FLAT_ORDER: [Letter; 7] = [
    Letter::B,
    Letter::E,
    Letter::A,
    Letter::D,
    Letter::G,
    Letter::C,
    Letter::F,
];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub tonic: Letter,
    pub accidental: Accidental,
    pub mode: Mode,
}

/// The practice progression: each step moves the tonic up a fourth.
/// G flat is followed by B rather than C flat.
pub const CIRCLE_OF_FOURTHS: [Key; 12] = [
    Key::major(Letter::C, Accidental::Natural),
    Key::major(Letter::F, Accidental::Natural),
    Key::major(Letter::B, Accidental::Flat),
    Key::major(Letter::E, Accidental::Flat),
    Key::major(Letter::A, Accidental::Flat),
    Key::major(Letter::D, Accidental::Flat),
    Key::major(Letter::G, Accidental::Flat),
    Key::major(Letter::B, Accidental::Natural),
    Key::major(Letter::E, Accidental::Natural),
    Key::major(Letter::A, Accidental::Natural),
    Key::major(Letter::D, Accidental::Natural),
    Key::major(Letter::G, Accidental::Natural),
];

// Major keys indexed by fifths + 7.
const MAJOR_BY_FIFTHS: [Key; 15] = [
    Key::major(Letter::C, Accidental::Flat),
    Key::major(Letter::G, Accidental::Flat),
    Key::major(Letter::D, Accidental::Flat),
    Key::major(Letter::A, Accidental::Flat),
    Key::major(Letter::E, Accidental::Flat),
    Key::major(Letter::B, Accidental::Flat),
    Key::major(Letter::F, Accidental::Natural),
    Key::major(Letter::C, Accidental::Natural),
    Key::major(Letter::G, Accidental::Natural),
    Key::major(Letter::D, Accidental::Natural),
    Key::major(Letter::A, Accidental::Natural),
    Key::major(Letter::E, Accidental::Natural),
    Key::major(Letter::B, Accidental::Natural),
    Key::major(Letter::F, Accidental::Sharp),
    Key::major(Letter::C, Accidental::Sharp),
];

// Minor keys indexed by fifths + 7.
const MINOR_BY_FIFTHS: [Key; 15] = [
    Key::minor(Letter::A, Accidental::Flat),
    Key::minor(Letter::E, Accidental::Flat),
    Key::minor(Letter::B, Accidental::Flat),
    Key::minor(Letter::F, Accidental::Natural),
    Key::minor(Letter::C, Accidental::Natural),
    Key::minor(Letter::G, Accidental::Natural),
    Key::minor(Letter::D, Accidental::Natural),
    Key::minor(Letter::A, Accidental::Natural),
    Key::minor(Letter::E, Accidental::Natural),
    Key::minor(Letter::B, Accidental::Natural),
    Key::minor(Letter::F, Accidental::Sharp),
    Key::minor(Letter::C, Accidental::Sharp),
    Key::minor(Letter::G, Accidental::Sharp),
    Key::minor(Letter::D, Accidental::Sharp),
    Key::minor(Letter::A, Accidental::Sharp),
];

impl Key {
    pub const fn major(tonic: Letter, accidental: Accidental) -> Self {
        Key {
            tonic,
            accidental,
            mode: Mode::Major,
        }
    }

    pub const fn minor(tonic: Letter, accidental: Accidental) -> Self {
        Key {
            tonic,
            accidental,
            mode: Mode::Minor,
        }
    }

    /// Signed number of sharps (positive) or flats (negative).
    ///
    /// This is an exact lookup, one entry per spelling: G flat major is -6 and
    /// F sharp major is +6 even though they sound alike. Spellings outside the
    /// table fall back to 0, i.e. they read as C major.
    pub fn fifths(&self) -> i32 {
        use Accidental::{Flat, Natural, Sharp};
        use Letter::*;

        match (self.tonic, self.accidental, self.mode) {
            (C, Natural, Mode::Major) => 0,
            (G, Natural, Mode::Major) => 1,
            (D, Natural, Mode::Major) => 2,
            (A, Natural, Mode::Major) => 3,
            (E, Natural, Mode::Major) => 4,
            (B, Natural, Mode::Major) => 5,
            (F, Sharp, Mode::Major) => 6,
            (C, Sharp, Mode::Major) => 7,
            (F, Natural, Mode::Major) => -1,
            (B, Flat, Mode::Major) => -2,
            (E, Flat, Mode::Major) => -3,
            (A, Flat, Mode::Major) => -4,
            (D, Flat, Mode::Major) => -5,
            (G, Flat, Mode::Major) => -6,
            (C, Flat, Mode::Major) => -7,

            (A, Natural, Mode::Minor) => 0,
            (E, Natural, Mode::Minor) => 1,
            (B, Natural, Mode::Minor) => 2,
            (F, Sharp, Mode::Minor) => 3,
            (C, Sharp, Mode::Minor) => 4,
            (G, Sharp, Mode::Minor) => 5,
            (D, Sharp, Mode::Minor) => 6,
            (A, Sharp, Mode::Minor) => 7,
            (D, Natural, Mode::Minor) => -1,
            (G, Natural, Mode::Minor) => -2,
            (C, Natural, Mode::Minor) => -3,
            (F, Natural, Mode::Minor) => -4,
            (B, Flat, Mode::Minor) => -5,
            (E, Flat, Mode::Minor) => -6,
            (A, Flat, Mode::Minor) => -7,

            _ => {
                log::warn!("Unrecognized key {}, using an empty key signature", self);
                0
            }
        }
    }

    /// Key with the given signature, for content that only records fifths
    /// (MusicXML `<key>`). Out-of-range values fall back to C major / A minor.
    pub fn from_fifths(fifths: i32, mode: Mode) -> Key {
        let table = match mode {
            Mode::Major => &MAJOR_BY_FIFTHS,
            Mode::Minor => &MINOR_BY_FIFTHS,
        };
        match usize::try_from(fifths + 7).ok().and_then(|i| table.get(i)) {
            Some(key) => *key,
            None => {
                log::warn!("Key signature with {} fifths is out of range", fifths);
                table[7]
            }
        }
    }

    /// Accidental the signature applies to `letter`.
    pub fn signature_accidental(&self, letter: Letter) -> Accidental {
        let fifths = self.fifths();
        let count = fifths.unsigned_abs() as usize;
        if fifths > 0 && SHARP_ORDER[..count].contains(&letter) {
            Accidental::Sharp
        } else if fifths < 0 && FLAT_ORDER[..count].contains(&letter) {
            Accidental::Flat
        } else {
            Accidental::Natural
        }
    }

    /// Signature accidentals in drawing order.
    pub fn signature(&self) -> Vec<(Letter, Accidental)> {
        let fifths = self.fifths();
        let count = fifths.unsigned_abs() as usize;
        if fifths > 0 {
            SHARP_ORDER[..count]
                .iter()
                .map(|&l| (l, Accidental::Sharp))
                .collect()
        } else {
            FLAT_ORDER[..count]
                .iter()
                .map(|&l| (l, Accidental::Flat))
                .collect()
        }
    }

    /// Pitch class of the tonic, 0..12 with C = 0.
    pub fn tonic_semitone(&self) -> i32 {
        (self.tonic.base_semitone() + self.accidental.offset()).rem_euclid(12)
    }

    /// The key after this one on the circle of fourths. Keys that are not on
    /// the circle restart it from C.
    pub fn next_in_circle(&self) -> Key {
        let next = match CIRCLE_OF_FOURTHS.iter().position(|k| k == self) {
            Some(i) => (i + 1) % CIRCLE_OF_FOURTHS.len(),
            None => 0,
        };
        CIRCLE_OF_FOURTHS[next]
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::major(Letter::C, Accidental::Natural)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let acc = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
        };
        let mode = match self.mode {
            Mode::Major => "",
            Mode::Minor => "m",
        };
        write!(f, "{}{}{}", self.tonic, acc, mode)
    }
}

impl FromStr for Key {
    type Err = TheoryError;

    /// Parses `"C"`, `"F#"`, `"Bb"`, `"Am"`, `"C#m"`. Spellings missing from
    /// the fifths table still parse; they just have no signature.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TheoryError::InvalidKey(s.to_string());

        let mut chars = s.chars();
        let tonic = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();

        let (accidental, rest) = if let Some(r) = rest.strip_prefix('#') {
            (Accidental::Sharp, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (Accidental::Flat, r)
        } else {
            (Accidental::Natural, rest)
        };

        let mode = match rest {
            "" => Mode::Major,
            "m" => Mode::Minor,
            _ => return Err(invalid()),
        };

        Ok(Key {
            tonic,
            accidental,
            mode,
        })
    }
}
