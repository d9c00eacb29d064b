//! Error types for pattern parsing, rule compilation, and lookup.

use thiserror::Error;

/// Errors produced while building or running transliterators.
#[derive(Debug, Error)]
pub enum Error {
    /// A UnicodeSet pattern could not be parsed.
    #[error("{message} in pattern \"{context}\"")]
    Pattern { message: String, context: String },

    /// A rule set could not be compiled. `rule` is the offending rule text.
    #[error("{message} in rule \"{rule}\"")]
    Rule { message: String, rule: String },

    /// An ID did not parse, or nothing is registered under it.
    #[error("Invalid transliterator ID: {0}")]
    InvalidId(String),

    /// A position violates `context_start <= start <= limit <= context_limit <= len`.
    #[error("Invalid position {position} for text of length {len}")]
    InvalidPosition { position: crate::Position, len: usize },

    /// A frozen UnicodeSet was asked to mutate.
    #[error("Attempt to modify a frozen UnicodeSet")]
    Frozen,

    /// No inverse exists for the transliterator.
    #[error("No inverse for transliterator: {0}")]
    NotInvertible(String),

    /// I/O error (reading rule files from the command line).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn pattern(message: impl Into<String>, context: impl Into<String>) -> Self {
        Error::Pattern { message: message.into(), context: context.into() }
    }

    pub(crate) fn rule(message: impl Into<String>, rule: impl Into<String>) -> Self {
        Error::Rule { message: message.into(), rule: rule.into() }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
