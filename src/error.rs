// 🚫 Input Errors - the only failures that stop a run
// Row-level problems are never errors: they become `Exception` values.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is missing mandatory columns: {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("Product master row {row}: {message}")]
    Reference { row: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type InputResult<T> = Result<T, InputError>;
