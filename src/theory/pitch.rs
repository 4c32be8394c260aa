use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TheoryError;
use crate::theory::key::Key;

/// The seven diatonic note letters, in staff order from C.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Position in the C-based letter cycle (C=0 .. B=6).
    pub fn index(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 1,
            Letter::E => 2,
            Letter::F => 3,
            Letter::G => 4,
            Letter::A => 5,
            Letter::B => 6,
        }
    }

    pub fn from_index(index: i32) -> Letter {
        Letter::ALL[index.rem_euclid(7) as usize]
    }

    /// Semitones above C of the natural letter.
    pub fn base_semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Letter::C => "C",
            Letter::D => "D",
            Letter::E => "E",
            Letter::F => "F",
            Letter::G => "G",
            Letter::A => "A",
            Letter::B => "B",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    pub fn offset(self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Accidental::Natural => "n",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
        }
    }
}

/// A written pitch. `accidental` is `None` when the note follows the key
/// signature and `Some` for an explicit override (including an explicit natural).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub letter: Letter,
    pub octave: i32,
    pub accidental: Option<Accidental>,
}

impl Pitch {
    pub fn new(letter: Letter, octave: i32) -> Self {
        Pitch {
            letter,
            octave,
            accidental: None,
        }
    }

    pub fn with_accidental(letter: Letter, octave: i32, accidental: Accidental) -> Self {
        Pitch {
            letter,
            octave,
            accidental: Some(accidental),
        }
    }

    /// Diatonic line/space index relative to middle C (C4 = 0).
    /// Accidentals never move a note off its line or space.
    pub fn staff_position(&self) -> i32 {
        (self.octave - 4) * 7 + self.letter.index()
    }

    /// The natural-letter pitch sitting at `position`, with no accidental.
    pub fn from_staff_position(position: i32) -> Self {
        Pitch::new(Letter::from_index(position), 4 + position.div_euclid(7))
    }

    /// MIDI-equivalent semitone number (C4 = 60), honouring only the
    /// pitch's own accidental.
    pub fn chromatic_value(&self) -> i32 {
        let offset = self.accidental.map(Accidental::offset).unwrap_or(0);
        (self.octave + 1) * 12 + self.letter.base_semitone() + offset
    }

    /// Like `chromatic_value`, but a pitch without an explicit accidental
    /// takes the one implied by `key`'s signature.
    pub fn chromatic_value_in(&self, key: &Key) -> i32 {
        let accidental = self
            .accidental
            .unwrap_or_else(|| key.signature_accidental(self.letter));
        (self.octave + 1) * 12 + self.letter.base_semitone() + accidental.offset()
    }

    pub fn same_position(&self, other: &Pitch) -> bool {
        self.staff_position() == other.staff_position()
    }

    /// Same line/space and same sounding pitch once the key's implied
    /// accidentals are applied to both sides.
    pub fn matches_in(&self, other: &Pitch, key: &Key) -> bool {
        self.same_position(other) && self.chromatic_value_in(key) == other.chromatic_value_in(key)
    }

    /// Moves the note by `steps` lines/spaces, keeping its accidental override.
    pub fn shifted(&self, steps: i32) -> Pitch {
        let natural = Pitch::from_staff_position(self.staff_position() + steps);
        Pitch {
            accidental: self.accidental,
            ..natural
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let acc = self.accidental.map(Accidental::symbol).unwrap_or("");
        write!(f, "{}{}{}", self.letter, acc, self.octave)
    }
}

/// Octaves accepted from spelled input, the MIDI range C-1 to B9.
pub const OCTAVE_RANGE: std::ops::RangeInclusive<i32> = -1..=9;

impl FromStr for Pitch {
    type Err = TheoryError;

    /// Parses spellings like `"C4"`, `"F#4"`, `"Bb3"` or `"En5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TheoryError::InvalidPitch(s.to_string());

        let mut chars = s.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();

        let (accidental, octave_str) = if let Some(r) = rest.strip_prefix('#') {
            (Some(Accidental::Sharp), r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (Some(Accidental::Flat), r)
        } else if let Some(r) = rest.strip_prefix('n') {
            (Some(Accidental::Natural), r)
        } else {
            (None, rest)
        };

        let octave: i32 = octave_str.parse().map_err(|_| invalid())?;
        if !OCTAVE_RANGE.contains(&octave) {
            return Err(invalid());
        }
        Ok(Pitch {
            letter,
            octave,
            accidental,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn test_staff_position_middle_c() {
        assert_eq!(p("C4").staff_position(), 0);
        assert_eq!(p("D4").staff_position(), 1);
        assert_eq!(p("B3").staff_position(), -1);
        assert_eq!(p("C5").staff_position(), 7);
        assert_eq!(p("G3").staff_position(), -3);
    }

    #[test]
    fn test_accidental_does_not_move_staff_position() {
        assert_eq!(p("F#4").staff_position(), p("F4").staff_position());
        assert_eq!(p("Bb3").staff_position(), p("B3").staff_position());
        assert_eq!(p("En4").staff_position(), p("E4").staff_position());
    }

    #[test]
    fn test_from_staff_position_roundtrip() {
        for n in -70..=70 {
            assert_eq!(Pitch::from_staff_position(n).staff_position(), n);
        }
    }

    #[test]
    fn test_natural_pitch_roundtrip() {
        for octave in 0..=8 {
            for letter in Letter::ALL {
                let pitch = Pitch::new(letter, octave);
                assert_eq!(Pitch::from_staff_position(pitch.staff_position()), pitch);
            }
        }
    }

    #[test]
    fn test_from_staff_position_negative() {
        assert_eq!(Pitch::from_staff_position(-1), p("B3"));
        assert_eq!(Pitch::from_staff_position(-7), p("C3"));
        assert_eq!(Pitch::from_staff_position(-8), p("B2"));
    }

    #[test]
    fn test_chromatic_value() {
        assert_eq!(p("C4").chromatic_value(), 60);
        assert_eq!(p("A4").chromatic_value(), 69);
        assert_eq!(p("C#4").chromatic_value(), 61);
        assert_eq!(p("Bb4").chromatic_value(), 70);
        assert_eq!(p("G3").chromatic_value(), 55);
    }

    #[test]
    fn test_chromatic_value_in_key() {
        let g_major: Key = "G".parse().unwrap();
        let f_major: Key = "F".parse().unwrap();
        assert_eq!(p("F4").chromatic_value_in(&g_major), 66);
        assert_eq!(p("Fn4").chromatic_value_in(&g_major), 65);
        assert_eq!(p("B4").chromatic_value_in(&f_major), 70);
        assert_eq!(p("C4").chromatic_value_in(&g_major), 60);
    }

    #[test]
    fn test_matches_in_key_accepts_implied_accidental() {
        let g_major: Key = "G".parse().unwrap();
        assert!(p("F4").matches_in(&p("F#4"), &g_major));
        assert!(!p("Fn4").matches_in(&p("F4"), &g_major));
        assert!(!p("F5").matches_in(&p("F4"), &g_major));
    }

    #[test]
    fn test_shifted_keeps_accidental() {
        assert_eq!(p("F#4").shifted(1), p("G#4"));
        assert_eq!(p("B4").shifted(1), p("C5"));
        assert_eq!(p("C4").shifted(-1), p("B3"));
    }

    #[test]
    fn test_parse_and_display() {
        for s in ["C4", "F#4", "Bb3", "En5", "A0", "C-1"] {
            assert_eq!(p(s).to_string(), s);
        }
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
        assert!("".parse::<Pitch>().is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_octaves() {
        assert_eq!(p("B9").octave, 9);
        assert_eq!(p("Cb-1").octave, -1);
        for s in ["C10", "C-2", "C999999999", "F#-2147483648"] {
            assert!(s.parse::<Pitch>().is_err(), "{}", s);
        }
    }
}
