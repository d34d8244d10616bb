use thiserror::Error;

/// Which label axis a lookup ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Tokenizer,
    Language,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Tokenizer => write!(f, "tokenizer"),
            Axis::Language => write!(f, "language"),
        }
    }
}

/// Domain errors raised by the array model and the index resolver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("{axis} \"{label}\" not found in metadata")]
    LabelNotFound { axis: Axis, label: String },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("unknown chart type: {0}")]
    UnknownChartKind(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
