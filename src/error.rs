//! Errors surfaced by the acquisition entry points.

use std::fmt::Display;

/// A single syntax error reported by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SyntaxError {
    /// 1-based line.
    pub line: usize,
    /// 0-based column, counted in characters.
    pub column: usize,
    pub message: String,
    /// Index of the offending token in the token stream, if known.
    pub token_index: Option<usize>,
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}:{} {}", self.line, self.column, self.message)
    }
}

/// All syntax errors collected while parsing one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors {
    /// The preprocessed SQL the errors refer to.
    pub sql: String,
    pub errors: Vec<SyntaxError>,
}

impl Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "parse error"),
            [single] => write!(f, "parse error: {}", single),
            many => write!(
                f,
                "parse error(s): {}",
                many.iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<String>>()
                    .join("; ")
            ),
        }
    }
}

impl std::error::Error for ParseErrors {}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input holds no statement at all.
    #[error("no statements found")]
    NoStatements,

    #[error(transparent)]
    Parse(#[from] ParseErrors),

    /// Returned by the exactly-one-statement mode.
    #[error("multiple statements found: expected exactly 1 statement, got {count}")]
    MultipleStatements { count: usize },

    /// An extractor was handed a node without the structure it requires.
    #[error("{0}: nil context")]
    NilContext(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
