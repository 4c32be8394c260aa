//! Pitch, key and interval arithmetic shared by every other module.

pub mod interval;
pub mod key;
pub mod pitch;

pub use interval::{between, between_in, Interval, Quality};
pub use key::{Key, Mode, CIRCLE_OF_FOURTHS};
pub use pitch::{Accidental, Letter, Pitch};
