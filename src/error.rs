use crate::types::Word;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SageError {
    #[error("Step budget of {budget} exceeded")]
    StepBudgetExhausted { budget: u64 },

    #[error("Tape index {index} is beyond the cell limit of {limit}")]
    TapeLimitExceeded { index: Word, limit: usize },

    #[error("Call to undefined function {0}")]
    UndefinedFunction(Word),

    #[error("Nesting limit of {depth} levels exceeded")]
    NestingLimitExceeded { depth: usize },

    #[error("Malformed genome: {0}")]
    MalformedGenome(String),

    #[error("Cannot encode operation: {0}")]
    Unencodable(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Parse error at token {position} ({token:?}): {message}")]
    Parse {
        token: String,
        position: usize,
        message: String,
    },

    #[error("No fitness hook attached to genome")]
    MissingFitnessHook,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl SageError {
    /// True for the conditions that end a run early without failing it.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            SageError::StepBudgetExhausted { .. } | SageError::TapeLimitExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SageError>;
