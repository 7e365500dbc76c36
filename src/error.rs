//! Error type shared by the reading, normalizing and rendering stages.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line} has {fields} comma-separated fields, expected at least 6")]
    MalformedRow { line: usize, fields: usize },

    #[error("could not parse date/time '{input}': {source}")]
    DateTime {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("row {row}: invalid consumption value '{value}': {source}")]
    Consumption {
        row: usize,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("sequences have different lengths: {left} and {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no samples to process")]
    Empty,

    #[error("render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, Error>;
