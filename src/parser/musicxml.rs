use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ImportError;
use crate::exercises::types::{Duration, Exercise, Note, Voice};
use crate::theory::interval::between_in;
use crate::theory::{Accidental, Key, Letter, Mode, Pitch};

/// Bassline group label given to every imported exercise.
pub const IMPORTED_BASSLINE: &str = "imported";

/// Spelling for a written MusicXML pitch. `alter` is the sounding
/// alteration, so it only becomes an explicit accidental where it differs
/// from what the key signature already gives the letter. Double sharps and
/// flats have no spelling here and give `None`.
pub fn pitch_from_parts(step: char, alter: i32, octave: i32, key: &Key) -> Option<Pitch> {
    let letter = Letter::from_char(step)?;
    let accidental = if alter == key.signature_accidental(letter).offset() {
        None
    } else {
        match alter {
            1 => Some(Accidental::Sharp),
            -1 => Some(Accidental::Flat),
            0 => Some(Accidental::Natural),
            _ => return None,
        }
    };
    Some(Pitch {
        letter,
        octave,
        accidental,
    })
}

/// Reads a partwise score with the soprano solution(s) on top and the bass
/// as the last part. Rests advance time; chord tones past the first are
/// dropped.
pub fn parse_exercise(id: &str, xml: &str) -> Result<Exercise, ImportError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    let mut divisions: f64 = 1.0;
    let mut parts: Vec<Vec<Note>> = Vec::new();
    let mut part_id = String::new();
    let mut part_notes: Vec<Note> = Vec::new();
    let mut current_beat: f64 = 0.0;

    let mut current_tag: Option<&'static str> = None;

    // Note state
    let mut in_note = false;
    let mut note_is_rest = false;
    let mut note_is_chord = false;
    let mut note_duration_divs: Option<f64> = None;
    let mut note_type: Option<Duration> = None;
    let mut step: Option<char> = None;
    let mut alter: i32 = 0;
    let mut octave: Option<i32> = None;

    // Score-level metadata
    let mut key_fifths: i32 = 0;
    let mut mode = Mode::Major;
    let mut title: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"part" => {
                        part_id = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"id")
                            .and_then(|a| std::str::from_utf8(&a.value).ok().map(str::to_string))
                            .unwrap_or_else(|| format!("P{}", parts.len() + 1));
                        part_notes.clear();
                        current_beat = 0.0;
                    }
                    b"note" => {
                        in_note = true;
                        note_is_rest = false;
                        note_is_chord = false;
                        note_duration_divs = None;
                        note_type = None;
                        step = None;
                        alter = 0;
                        octave = None;
                    }
                    b"rest" if in_note => note_is_rest = true,
                    b"chord" if in_note => note_is_chord = true,
                    b"divisions" => current_tag = Some("divisions"),
                    b"duration" => current_tag = Some("duration"),
                    b"step" => current_tag = Some("step"),
                    b"alter" => current_tag = Some("alter"),
                    b"octave" => current_tag = Some("octave"),
                    b"fifths" => current_tag = Some("fifths"),
                    b"mode" => current_tag = Some("mode"),
                    b"type" if in_note => current_tag = Some("type"),
                    b"movement-title" => current_tag = Some("movement-title"),
                    b"work-title" => current_tag = Some("work-title"),
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"rest" if in_note => note_is_rest = true,
                b"chord" if in_note => note_is_chord = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(tag) = current_tag.take() {
                    let text = e.unescape().map_err(|e| ImportError::Xml(e.to_string()))?;
                    let text = text.trim();
                    match tag {
                        "divisions" => {
                            if let Ok(v) = text.parse::<f64>() {
                                if v > 0.0 {
                                    divisions = v;
                                }
                            }
                        }
                        "duration" => {
                            if let Ok(v) = text.parse::<f64>() {
                                note_duration_divs = Some(v);
                            }
                        }
                        "step" => step = text.chars().next(),
                        "alter" => {
                            if let Ok(v) = text.parse::<f64>() {
                                alter = v.round() as i32;
                            }
                        }
                        "octave" => {
                            if let Ok(v) = text.parse::<i32>() {
                                octave = Some(v);
                            }
                        }
                        "fifths" => {
                            if let Ok(v) = text.parse::<i32>() {
                                key_fifths = v;
                            }
                        }
                        "mode" => {
                            if text == "minor" {
                                mode = Mode::Minor;
                            }
                        }
                        "type" => note_type = Duration::from_type_name(text),
                        "movement-title" | "work-title" => {
                            if title.is_none() && !text.is_empty() {
                                title = Some(text.to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"note" if in_note => {
                        in_note = false;
                        let duration_beats = note_duration_divs.unwrap_or(0.0) / divisions;

                        if note_is_chord {
                            log::debug!("Dropping chord tone in part {}", part_id);
                        } else if note_is_rest {
                            current_beat += duration_beats;
                        } else {
                            let s = step
                                .ok_or_else(|| ImportError::MissingPitch("step", part_id.clone()))?;
                            let o = octave
                                .ok_or_else(|| ImportError::MissingPitch("octave", part_id.clone()))?;
                            // Signature is only known once <attributes> has been read, which
                            // always precedes the first note.
                            let key = Key::from_fifths(key_fifths, mode);
                            if !(-1..=1).contains(&alter) {
                                log::warn!("Alteration {} in part {} is not supported", alter, part_id);
                                return Err(ImportError::UnsupportedAlter(alter, part_id.clone()));
                            }
                            let pitch = pitch_from_parts(s, alter, o, &key)
                                .ok_or_else(|| ImportError::MissingPitch("step", part_id.clone()))?;
                            let duration = note_type.unwrap_or_else(|| Duration::from_beats(duration_beats));
                            part_notes.push(Note {
                                pitch,
                                duration,
                                beat: current_beat,
                            });
                            current_beat += if duration_beats > 0.0 {
                                duration_beats
                            } else {
                                duration.beats()
                            };
                        }
                    }
                    b"part" => {
                        log::debug!("Read part {} with {} notes", part_id, part_notes.len());
                        parts.push(std::mem::take(&mut part_notes));
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ImportError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if parts.len() < 2 {
        return Err(ImportError::MissingPart(parts.len()));
    }

    let key = Key::from_fifths(key_fifths, mode);
    let bass = parts.pop().map(Voice::new).unwrap_or_default();
    let sopranos: Vec<Voice> = parts.into_iter().map(Voice::new).collect();
    let pattern = sopranos
        .first()
        .map(|soprano| figures(&bass, soprano, &key))
        .unwrap_or_default();

    let exercise = Exercise::new(
        id,
        title.unwrap_or_else(|| id.to_string()),
        IMPORTED_BASSLINE,
        key,
        bass,
        sopranos,
        pattern,
    )?;
    Ok(exercise)
}

/// Imports every `(id, xml)` document, skipping the ones that fail.
pub fn import_all<'a, I>(documents: I) -> Vec<Exercise>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    documents
        .into_iter()
        .filter_map(|(id, xml)| match parse_exercise(id, xml) {
            Ok(exercise) => Some(exercise),
            Err(e) => {
                log::warn!("Skipping {}: {}", id, e);
                None
            }
        })
        .collect()
}

/// Figured-bass pattern such as "8-3-8".
fn figures(bass: &Voice, soprano: &Voice, key: &Key) -> String {
    bass.notes
        .iter()
        .zip(&soprano.notes)
        .map(|(b, s)| between_in(&b.pitch, &s.pitch, key).figure())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::audio::QueuedAudio;
    use crate::session::{ExerciseSession, NoteState, SessionConfig};

    fn note(step: &str, alter: Option<i32>, octave: i32) -> String {
        let alter = alter
            .map(|a| format!("<alter>{}</alter>", a))
            .unwrap_or_default();
        format!(
            "<note><pitch><step>{}</step>{}<octave>{}</octave></pitch>\
             <duration>4</duration><type>whole</type></note>",
            step, alter, octave
        )
    }

    fn part(id: &str, fifths: i32, notes: &[String]) -> String {
        let measures: String = notes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let attributes = if i == 0 {
                    format!(
                        "<attributes><divisions>1</divisions><key><fifths>{}</fifths>\
                         <mode>major</mode></key><time><beats>4</beats>\
                         <beat-type>4</beat-type></time></attributes>",
                        fifths
                    )
                } else {
                    String::new()
                };
                format!(r#"<measure number="{}">{}{}</measure>"#, i + 1, attributes, n)
            })
            .collect();
        format!(r#"<part id="{}">{}</part>"#, id, measures)
    }

    fn score(title: &str, parts: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <movement-title>{}</movement-title>
  <part-list>
    <score-part id="P1"><part-name>Soprano</part-name></score-part>
    <score-part id="P2"><part-name>Bass</part-name></score-part>
  </part-list>
  {}
</score-partwise>"#,
            title,
            parts.concat()
        )
    }

    fn c_major_score() -> String {
        score(
            "Tonic and dominant",
            &[
                part(
                    "P1",
                    0,
                    &[note("C", None, 5), note("B", None, 4), note("C", None, 5)],
                ),
                part(
                    "P2",
                    0,
                    &[note("C", None, 3), note("G", None, 3), note("C", None, 3)],
                ),
            ],
        )
    }

    fn names(voice: &Voice) -> Vec<String> {
        voice.notes.iter().map(|n| n.pitch.to_string()).collect()
    }

    #[test]
    fn test_pitch_from_parts() {
        let c = Key::default();
        let g: Key = "G".parse().unwrap();
        assert_eq!(pitch_from_parts('C', 0, 4, &c).unwrap().chromatic_value(), 60);
        assert_eq!(pitch_from_parts('B', -1, 4, &c).unwrap().to_string(), "Bb4");
        assert_eq!(pitch_from_parts('F', 1, 4, &c).unwrap().to_string(), "F#4");
        assert_eq!(pitch_from_parts('F', 1, 4, &g).unwrap().to_string(), "F4");
        assert_eq!(pitch_from_parts('F', 0, 4, &g).unwrap().to_string(), "Fn4");
        assert_eq!(pitch_from_parts('F', 0, 4, &c).unwrap().to_string(), "F4");
        assert_eq!(pitch_from_parts('C', 1, 4, &g).unwrap().to_string(), "C#4");
        assert!(pitch_from_parts('H', 0, 4, &c).is_none());
        assert!(pitch_from_parts('F', 2, 4, &c).is_none());
    }

    #[test]
    fn test_parse_two_part_exercise() {
        let exercise = parse_exercise("xml-1", &c_major_score()).unwrap();
        assert_eq!(exercise.id(), "xml-1");
        assert_eq!(exercise.name(), "Tonic and dominant");
        assert_eq!(exercise.bassline(), IMPORTED_BASSLINE);
        assert_eq!(exercise.key(), Key::default());
        assert_eq!(exercise.len(), 3);
        assert_eq!(names(exercise.bass()), vec!["C3", "G3", "C3"]);
        assert_eq!(exercise.sopranos().len(), 1);
        assert_eq!(names(&exercise.sopranos()[0]), vec!["C5", "B4", "C5"]);
        assert_eq!(exercise.pattern(), "8-3-8");

        let beats: Vec<f64> = exercise.bass().notes.iter().map(|n| n.beat).collect();
        assert_eq!(beats, vec![0.0, 4.0, 8.0]);
        assert!(exercise
            .bass()
            .notes
            .iter()
            .all(|n| n.duration == Duration::Whole));
    }

    #[test]
    fn test_key_signature_is_read() {
        let xml = score(
            "In G",
            &[
                part(
                    "P1",
                    1,
                    &[note("B", None, 4), note("A", None, 4), note("B", None, 4)],
                ),
                part(
                    "P2",
                    1,
                    &[note("G", None, 2), note("D", None, 3), note("G", None, 2)],
                ),
            ],
        );
        let exercise = parse_exercise("xml-g", &xml).unwrap();
        assert_eq!(exercise.key(), "G".parse::<Key>().unwrap());
        assert_eq!(exercise.pattern(), "3-5-3");
    }

    #[test]
    fn test_signature_sharp_is_unmarked_and_transposes() {
        let xml = score(
            "Leading tone in G",
            &[
                part(
                    "P1",
                    1,
                    &[
                        note("B", None, 4),
                        note("A", None, 4),
                        note("F", Some(1), 4),
                        note("G", None, 4),
                    ],
                ),
                part(
                    "P2",
                    1,
                    &[
                        note("G", None, 2),
                        note("D", None, 3),
                        note("D", None, 3),
                        note("G", None, 2),
                    ],
                ),
            ],
        );
        let exercise = parse_exercise("xml-leading", &xml).unwrap();
        assert_eq!(names(&exercise.sopranos()[0]), vec!["B4", "A4", "F4", "G4"]);

        let mut session = ExerciseSession::new(exercise, QueuedAudio::new(), SessionConfig::default());
        session.set_key(Key::default());
        session.start_practice();
        let expected = session.soprano().notes[2].pitch;
        assert_eq!(expected.to_string(), "B4");

        session.place_note(Pitch::from_staff_position(expected.staff_position()), 2, 0.0);
        let state = session
            .placed_notes()
            .iter()
            .find(|n| n.beat_index == 2)
            .map(|n| n.state.clone());
        assert_eq!(state, Some(NoteState::Correct));
    }

    #[test]
    fn test_double_alteration_is_rejected() {
        let xml = score(
            "Double sharp",
            &[
                part("P1", 0, &[note("C", None, 5), note("F", Some(2), 4)]),
                part("P2", 0, &[note("C", None, 3), note("G", None, 3)]),
            ],
        );
        assert!(matches!(
            parse_exercise("double", &xml),
            Err(ImportError::UnsupportedAlter(2, _))
        ));
    }

    #[test]
    fn test_missing_title_uses_id() {
        let xml = c_major_score().replace("<movement-title>Tonic and dominant</movement-title>", "");
        let exercise = parse_exercise("untitled", &xml).unwrap();
        assert_eq!(exercise.name(), "untitled");
    }

    #[test]
    fn test_rests_advance_time() {
        let rest = "<note><rest/><duration>4</duration><type>whole</type></note>".to_string();
        let xml = score(
            "With rest",
            &[
                part("P1", 0, &[rest.clone(), note("E", None, 4)]),
                part("P2", 0, &[rest, note("C", None, 3)]),
            ],
        );
        let exercise = parse_exercise("rest", &xml).unwrap();
        assert_eq!(exercise.len(), 1);
        assert_eq!(exercise.bass().notes[0].beat, 4.0);
    }

    #[test]
    fn test_missing_octave_is_an_error() {
        let broken = "<note><pitch><step>C</step></pitch><duration>4</duration></note>".to_string();
        let xml = score(
            "Broken",
            &[
                part("P1", 0, &[broken]),
                part("P2", 0, &[note("C", None, 3)]),
            ],
        );
        match parse_exercise("broken", &xml) {
            Err(ImportError::MissingPitch(field, part)) => {
                assert_eq!(field, "octave");
                assert_eq!(part, "P1");
            }
            other => panic!("expected missing octave, got {:?}", other),
        }
    }

    #[test]
    fn test_single_part_is_rejected() {
        let xml = score("Solo", &[part("P1", 0, &[note("C", None, 4)])]);
        assert!(matches!(
            parse_exercise("solo", &xml),
            Err(ImportError::MissingPart(1))
        ));
    }

    #[test]
    fn test_mismatched_lengths_are_rejected() {
        let xml = score(
            "Short soprano",
            &[
                part("P1", 0, &[note("C", None, 5)]),
                part("P2", 0, &[note("C", None, 3), note("G", None, 3)]),
            ],
        );
        assert!(matches!(
            parse_exercise("short", &xml),
            Err(ImportError::Exercise(_))
        ));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(matches!(
            parse_exercise("bad", "<score-partwise><part id=\"P1\"></score-partwise>"),
            Err(ImportError::Xml(_))
        ));
    }

    #[test]
    fn test_import_all_skips_failures() {
        let good = c_major_score();
        let solo = score("Solo", &[part("P1", 0, &[note("C", None, 4)])]);
        let imported = import_all(vec![("a", good.as_str()), ("b", solo.as_str()), ("c", good.as_str())]);
        let ids: Vec<&str> = imported.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
