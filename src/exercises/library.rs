use crate::error::TheoryError;
use crate::exercises::types::{Exercise, Voice};
use crate::theory::{Key, Pitch};

struct LibraryEntry {
    id: &'static str,
    bassline: &'static str,
    key: &'static str,
    bass: &'static [&'static str],
    sopranos: &'static [&'static [&'static str]],
    pattern: &'static str,
}

const LIBRARY: &[LibraryEntry] = &[
    // Bassline 1: I-V-I in C
    LibraryEntry {
        id: "bl1-8-3-8",
        bassline: "1",
        key: "C",
        bass: &["C3", "G3", "C3"],
        sopranos: &[&["C5", "B4", "C5"]],
        pattern: "8-3-8",
    },
    LibraryEntry {
        id: "bl1-3-5-8",
        bassline: "1",
        key: "C",
        bass: &["C3", "G3", "C3"],
        sopranos: &[&["E4", "D4", "C4"]],
        pattern: "3-5-8",
    },
    LibraryEntry {
        id: "bl1-5-8-3",
        bassline: "1",
        key: "C",
        bass: &["C3", "G3", "C3"],
        sopranos: &[&["G4", "G4", "E4"]],
        pattern: "5-8-3",
    },
    // Bassline 2: I-IV-V-I in C
    LibraryEntry {
        id: "bl2-8-3-3-8",
        bassline: "2",
        key: "C",
        bass: &["C3", "F3", "G3", "C3"],
        sopranos: &[&["C5", "A4", "B4", "C5"]],
        pattern: "8-3-3-8",
    },
    LibraryEntry {
        id: "bl2-3-8-5-8",
        bassline: "2",
        key: "C",
        bass: &["C3", "F3", "G3", "C3"],
        sopranos: &[&["E4", "F4", "D4", "C4"], &["E5", "F5", "D5", "C5"]],
        pattern: "3-8-5-8",
    },
    LibraryEntry {
        id: "bl2-5-3-3-8",
        bassline: "2",
        key: "C",
        bass: &["C3", "F3", "G3", "C3"],
        sopranos: &[&["G4", "A4", "B4", "C5"]],
        pattern: "5-3-3-8",
    },
    // Bassline 3: I-IV-V-I in G
    LibraryEntry {
        id: "bl3-3-8-5-3",
        bassline: "3",
        key: "G",
        bass: &["G2", "C3", "D3", "G2"],
        sopranos: &[&["B4", "C5", "A4", "B4"]],
        pattern: "3-8-5-3",
    },
    LibraryEntry {
        id: "bl3-8-3-3-8",
        bassline: "3",
        key: "G",
        bass: &["G2", "C3", "D3", "G2"],
        sopranos: &[&["G4", "E4", "F4", "G4"]],
        pattern: "8-3-3-8",
    },
    // Bassline 4: I-IV-V-I in F
    LibraryEntry {
        id: "bl4-3-8-5-3",
        bassline: "4",
        key: "F",
        bass: &["F2", "B2", "C3", "F2"],
        sopranos: &[&["A4", "B4", "G4", "A4"]],
        pattern: "3-8-5-3",
    },
    LibraryEntry {
        id: "bl4-8-3-3-8",
        bassline: "4",
        key: "F",
        bass: &["F2", "B2", "C3", "F2"],
        sopranos: &[&["F4", "D4", "E4", "F4"]],
        pattern: "8-3-3-8",
    },
];

fn parse_voice(names: &[&str]) -> Result<Voice, TheoryError> {
    let pitches = names
        .iter()
        .map(|n| n.parse::<Pitch>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Voice::whole_notes(&pitches))
}

fn build(entry: &LibraryEntry) -> Result<Exercise, String> {
    let key: Key = entry.key.parse().map_err(|e: TheoryError| e.to_string())?;
    let bass = parse_voice(entry.bass).map_err(|e| e.to_string())?;
    let sopranos = entry
        .sopranos
        .iter()
        .map(|s| parse_voice(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    let name = format!("Bassline {}: {}", entry.bassline, entry.pattern);
    Exercise::new(entry.id, name, entry.bassline, key, bass, sopranos, entry.pattern)
        .map_err(|e| e.to_string())
}

/// The built-in first-species exercises, in presentation order.
pub fn get_library() -> Vec<Exercise> {
    LIBRARY
        .iter()
        .filter_map(|entry| match build(entry) {
            Ok(exercise) => Some(exercise),
            Err(e) => {
                log::warn!("Skipping library exercise {}: {}", entry.id, e);
                None
            }
        })
        .collect()
}

pub fn find_exercise(id: &str) -> Option<Exercise> {
    LIBRARY
        .iter()
        .find(|entry| entry.id == id)
        .and_then(|entry| build(entry).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::interval::between_in;

    #[test]
    fn test_library_builds_completely() {
        let library = get_library();
        assert_eq!(library.len(), LIBRARY.len());

        let mut ids: Vec<&str> = library.iter().map(|e| e.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), library.len(), "duplicate exercise ids");
    }

    #[test]
    fn test_every_vertical_is_consonant() {
        for exercise in get_library() {
            let key = exercise.key();
            for soprano in exercise.sopranos() {
                for (bass, upper) in exercise.bass().notes.iter().zip(&soprano.notes) {
                    let interval = between_in(&bass.pitch, &upper.pitch, &key);
                    assert!(
                        interval.is_consonant(),
                        "{}: {} against {} is {}",
                        exercise.id(),
                        upper.pitch,
                        bass.pitch,
                        interval.display_name()
                    );
                }
            }
        }
    }

    #[test]
    fn test_soprano_stays_above_bass() {
        for exercise in get_library() {
            for soprano in exercise.sopranos() {
                for (bass, upper) in exercise.bass().notes.iter().zip(&soprano.notes) {
                    assert!(upper.pitch.staff_position() > bass.pitch.staff_position());
                }
            }
        }
    }

    #[test]
    fn test_bassline_groups() {
        let library = get_library();
        let first: Vec<&Exercise> = library.iter().filter(|e| e.bassline() == "1").collect();
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|e| e.len() == 3));
    }

    #[test]
    fn test_find_exercise() {
        let ex = find_exercise("bl2-3-8-5-8").unwrap();
        assert_eq!(ex.sopranos().len(), 2);
        assert_eq!(ex.name(), "Bassline 2: 3-8-5-8");
        assert!(find_exercise("missing").is_none());
    }
}
