//! Error types for the correlation library

use std::path::PathBuf;

/// Failure while reading one disassembly CSV or live-register report.
///
/// Local to a single file: the cache records the entry as failed and the
/// rest of the loaded state stays usable.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Line {line}: expected 1 or {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: unbalanced quotes in field")]
    UnbalancedQuotes { line: usize },
    #[error("Line {line}: invalid source line number '{value}'")]
    InvalidSourceLine { line: usize, value: String },
    #[error("Live register report has no register summary")]
    MissingRegisterSummary,
}

/// Errors surfaced by the entry-point cache and the multi-GPU view
#[derive(thiserror::Error, Debug)]
pub enum CorrelationError {
    #[error("No disassembly entry for '{entry}' in {file}")]
    EntryNotFound { file: String, entry: String },
    #[error("'{0}' contains the entry key separator")]
    InvalidKeyComponent(String),
    #[error("Disassembly unavailable for '{entry}' in {file}: {source}")]
    DisassemblyUnavailable {
        file: String,
        entry: String,
        #[source]
        source: ParseError,
    },
    #[error("Unknown target GPU: {0}")]
    UnknownTargetGpu(String),
}

/// Result type used by the cache and view layers
pub type Result<T> = std::result::Result<T, CorrelationError>;

/// Result type used by the parsers
pub type ParseResult<T> = std::result::Result<T, ParseError>;
