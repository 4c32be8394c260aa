use wasm_bindgen::prelude::*;

pub mod error;
pub mod exercises;
pub mod parser;
pub mod progress;
pub mod session;
pub mod theory;
pub mod trainer;
pub mod transposition;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use progress::{MemoryStore, ProgressSnapshot};
use theory::{Key, Pitch};
use trainer::TrainerConfig;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Debug).is_err() {
        return;
    }
    log::info!("Counterpoint trainer WASM module initialized");
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(err_to_js)
}

fn err_to_js<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn wall_clock() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
}

fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64((js_sys::Math::random() * u64::MAX as f64) as u64)
}

/// The built-in exercise library.
#[wasm_bindgen]
pub fn list_exercises() -> Result<JsValue, JsValue> {
    to_js(&exercises::get_library())
}

/// Parse a two-part MusicXML document into an exercise.
#[wasm_bindgen]
pub fn import_musicxml(id: &str, xml: &str) -> Result<JsValue, JsValue> {
    let exercise = parser::musicxml::parse_exercise(id, xml).map_err(err_to_js)?;
    to_js(&exercise)
}

/// Signature accidentals for a key spelling such as "Bb", in drawing order.
#[wasm_bindgen]
pub fn key_signature(key: &str) -> Result<JsValue, JsValue> {
    let key: Key = key.parse().map_err(err_to_js)?;
    to_js(&key.signature())
}

/// One open exercise plus the learner's progress. `now` arguments are the
/// page clock in seconds and drive fades and hints.
#[wasm_bindgen(js_name = Trainer)]
pub struct WasmTrainer {
    inner: trainer::Trainer<MemoryStore, StdRng>,
}

#[wasm_bindgen(js_class = Trainer)]
impl WasmTrainer {
    /// `config` may be undefined or a partial `{ session, scheduler }` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmTrainer, JsValue> {
        let config: TrainerConfig = if config.is_null() || config.is_undefined() {
            TrainerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(err_to_js)?
        };
        Ok(WasmTrainer {
            inner: trainer::Trainer::new(MemoryStore::new(), seeded_rng(), config),
        })
    }

    /// Replaces all progress with a snapshot produced by `progress_json`.
    pub fn restore_progress(&mut self, json: &str) -> Result<(), JsValue> {
        let snapshot = ProgressSnapshot::from_json(json).map_err(err_to_js)?;
        self.inner.replace_store(MemoryStore::from_snapshot(snapshot));
        Ok(())
    }

    pub fn progress_json(&self) -> Result<String, JsValue> {
        self.inner
            .scheduler()
            .store()
            .snapshot()
            .to_json()
            .map_err(err_to_js)
    }

    pub fn exercises(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.exercises())
    }

    /// Adds a MusicXML exercise to the catalogue and returns it.
    pub fn add_musicxml(&mut self, id: &str, xml: &str) -> Result<JsValue, JsValue> {
        let exercise = parser::musicxml::parse_exercise(id, xml).map_err(err_to_js)?;
        let value = to_js(&exercise)?;
        self.inner.add_exercise(exercise);
        Ok(value)
    }

    /// Adds every importable `[id, xml]` pair and returns how many made it.
    pub fn add_musicxml_batch(&mut self, documents: JsValue) -> Result<usize, JsValue> {
        let documents: Vec<(String, String)> =
            serde_wasm_bindgen::from_value(documents).map_err(err_to_js)?;
        let imported = parser::musicxml::import_all(
            documents.iter().map(|(id, xml)| (id.as_str(), xml.as_str())),
        );
        let count = imported.len();
        for exercise in imported {
            self.inner.add_exercise(exercise);
        }
        Ok(count)
    }

    pub fn open(&mut self, id: &str) -> Result<JsValue, JsValue> {
        to_js(&self.inner.open(id).map_err(err_to_js)?)
    }

    pub fn open_quiz(&mut self, quiz_id: &str) -> Result<JsValue, JsValue> {
        to_js(&self.inner.open_quiz(quiz_id).map_err(err_to_js)?)
    }

    pub fn view(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.view().map_err(err_to_js)?)
    }

    pub fn start_practice(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.start_practice().map_err(err_to_js)?)
    }

    pub fn show_study(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.show_study().map_err(err_to_js)?)
    }

    pub fn practice_again(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.practice_again().map_err(err_to_js)?)
    }

    pub fn next_key(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.next_key().map_err(err_to_js)?)
    }

    pub fn set_key(&mut self, key: &str) -> Result<JsValue, JsValue> {
        let key: Key = key.parse().map_err(err_to_js)?;
        to_js(&self.inner.set_key(key).map_err(err_to_js)?)
    }

    pub fn select_solution(&mut self, index: usize) -> Result<JsValue, JsValue> {
        to_js(&self.inner.select_solution(index).map_err(err_to_js)?)
    }

    /// `pitch` is a spelling like "F#4"; an unmarked letter follows the key.
    pub fn place_note(&mut self, pitch: &str, beat_index: usize, now: f64) -> Result<JsValue, JsValue> {
        let pitch: Pitch = pitch.parse().map_err(err_to_js)?;
        let effects = self
            .inner
            .place_note(pitch, beat_index, now, wall_clock())
            .map_err(err_to_js)?;
        to_js(&effects)
    }

    pub fn reveal_hint(&mut self, now: f64) -> Result<JsValue, JsValue> {
        to_js(&self.inner.reveal_hint(now).map_err(err_to_js)?)
    }

    pub fn tick(&mut self, now: f64) -> Result<JsValue, JsValue> {
        to_js(&self.inner.tick(now).map_err(err_to_js)?)
    }

    pub fn play(&mut self) -> Result<(), JsValue> {
        self.inner.play().map_err(err_to_js)
    }

    /// Pending audio commands for the page synthesizer.
    pub fn drain_audio(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.drain_audio())
    }

    pub fn due_for_review(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.due_for_review(wall_clock()))
    }

    pub fn progress(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.all_progress())
    }

    pub fn reset_progress(&mut self) {
        self.inner.reset_progress();
    }
}
