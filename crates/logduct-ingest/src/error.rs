//! Error types for the ingest pipeline
//!
//! Every stage returns its own error kind; [`IngestError`] wraps them for the
//! run as a whole. All of them are fatal: the run stops at the first one.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Run-level error
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to open log file {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Format string could not be compiled
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("log format is empty")]
    Empty,

    #[error("malformed placeholder at byte {position}: '$' must be followed by a field name")]
    MalformedPlaceholder { position: usize },

    #[error("placeholders ${first} and ${second} have no separator between them")]
    AdjacentPlaceholders { first: String, second: String },

    #[error("field ${name} appears more than once")]
    DuplicateField { name: String },

    #[error("compiled pattern rejected: {0}")]
    Regex(#[from] regex::Error),
}

/// A line did not have the shape of the template
#[derive(Error, Debug, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    pub line: u64,
    pub reason: ParseFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// Text does not match the compiled format
    NoMatch,
    /// Line is not valid UTF-8
    InvalidUtf8,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFailure::NoMatch => write!(f, "does not match log format"),
            ParseFailure::InvalidUtf8 => write!(f, "is not valid UTF-8"),
        }
    }
}

/// A matched line carried a missing or unusable field value
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Line {line}, Field: {field}, not present in log format")]
    MissingField { line: u64, field: String },

    #[error("Line {line}, Field: {field}, Value too long ({limit}): {value}")]
    TooLong {
        line: u64,
        field: String,
        limit: usize,
        value: String,
    },

    #[error("Line {line}, Field: {field}, not an integer: {value:?}")]
    InvalidInteger { line: u64, field: String, value: String },

    #[error("Line {line}, Field: {field}, not a number: {value:?}")]
    InvalidFloat { line: u64, field: String, value: String },
}

impl ValidationError {
    /// Source line the error refers to
    pub fn line(&self) -> u64 {
        match self {
            ValidationError::MissingField { line, .. }
            | ValidationError::TooLong { line, .. }
            | ValidationError::InvalidInteger { line, .. }
            | ValidationError::InvalidFloat { line, .. } => *line,
        }
    }

    /// Field the error refers to
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidInteger { field, .. }
            | ValidationError::InvalidFloat { field, .. } => field,
        }
    }
}

/// Destination store failure
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to connect to destination: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to create table {table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to truncate table {table}: {source}")]
    Truncate {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("bulk insert into {table} failed: {source}")]
    Insert {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("bulk insert into {table} reported {inserted} rows, expected {expected}")]
    CountMismatch {
        table: String,
        expected: u64,
        inserted: u64,
    },
}
