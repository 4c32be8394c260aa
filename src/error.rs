use thiserror::Error;

/// Failures parsing note and key spellings such as `"F#4"` or `"Bb"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TheoryError {
    #[error("Invalid pitch spelling: {0}")]
    InvalidPitch(String),

    #[error("Invalid key spelling: {0}")]
    InvalidKey(String),
}

/// Shape violations rejected by `Exercise::new`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExerciseError {
    #[error("Exercise '{0}' has an empty bass line")]
    EmptyBass(String),

    #[error("Exercise '{0}' has no soprano solution")]
    NoSoprano(String),

    #[error("Exercise '{id}': soprano {index} has {found} notes, bass has {expected}")]
    SopranoLength {
        id: String,
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Errors importing an exercise from MusicXML.
#[derive(Debug, Clone, Error)]
pub enum ImportError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Missing pitch {0} in part {1}")]
    MissingPitch(&'static str, String),

    #[error("Unsupported alteration {0} in part {1}")]
    UnsupportedAlter(i32, String),

    #[error("Expected at least two parts, found {0}")]
    MissingPart(usize),

    #[error(transparent)]
    Exercise(#[from] ExerciseError),
}

/// Errors decoding persisted progress.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Progress snapshot is not valid JSON: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Requests the trainer cannot route to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainerError {
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("No quiz with id {0} is queued")]
    UnknownQuiz(String),

    #[error("No exercise is open")]
    NoSession,
}
