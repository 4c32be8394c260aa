pub mod scheduler;
pub mod store;
pub mod types;

pub use scheduler::ReviewScheduler;
pub use store::{MemoryStore, ProgressSnapshot, ProgressStore};
pub use types::{ExerciseProgress, QuizItem, SchedulerConfig};
