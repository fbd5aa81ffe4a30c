pub mod config;
pub mod engines;
pub mod error;
pub mod functions;
pub mod parser;
pub mod types;

pub use error::{Result, SageError};
pub use types::{Operation, OutputValue, Program, Word};
