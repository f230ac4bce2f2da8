use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Location and context of a grammar mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// File being parsed, or `<input>` for in-memory text.
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// Production the parser was trying to match.
    pub expected: String,
    /// Surface text of the offending token, empty at end of input.
    pub found: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.found.is_empty() {
            write!(
                f,
                "{}:{}:{}: expected {}, got end of input",
                self.file, self.line, self.column, self.expected
            )
        } else {
            write!(
                f,
                "{}:{}:{}: expected {}, got {:?}",
                self.file, self.line, self.column, self.expected, self.found
            )
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors surfaced by the BIND 9 and Kea configuration cores.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token stream does not match the grammar.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Reading or parsing an included file failed.
    #[error("failed to expand include {path}: {source}")]
    Expand {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// The ACL walk for a view exceeded its depth limit.
    #[error("too much recursion while resolving the key of view {view}")]
    TooMuchRecursion { view: String },

    /// A key statement lacks its algorithm or secret.
    #[error("key {key} has no {missing} clause")]
    MissingKeyMaterial { key: String, missing: &'static str },

    /// An option field could not be converted.
    #[error("option conversion failed: {0}")]
    Conversion(String),

    /// The parameter does not apply to this configuration role.
    #[error("parameter {parameter} is not supported by {daemon} configuration")]
    UnsupportedConfigParameter { parameter: String, daemon: String },

    /// Kea data was not valid JSON or did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }
}
