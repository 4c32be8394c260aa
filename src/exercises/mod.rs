pub mod library;
pub mod types;

pub use library::{find_exercise, get_library};
pub use types::{Duration, Exercise, Note, Species, Voice};
