//! Error types for qail-mql.

use thiserror::Error;

/// The main error type for transpiler operations.
#[derive(Debug, Error)]
pub enum MqlError {
    /// Every literal decoding strategy failed.
    #[error("Parse error: could not decode literal '{literal}'")]
    Parse { literal: String },

    /// The call chain is not `db.<collection>.find(...)`.
    #[error("Unsupported call: expected db.<collection>.find(...), found '{0}'")]
    UnsupportedCall(String),

    /// A literal decoded fine but is not an object where one is required.
    #[error("Expected {what} to be an object literal, found '{literal}'")]
    NotAnObject { what: &'static str, literal: String },

    /// Bad argument to `.sort()`, `.skip()` or `.limit()`.
    #[error("Invalid .{name}() argument: '{literal}'")]
    InvalidModifier { name: &'static str, literal: String },

    /// A reserved option key in a flat predicate holds an unusable value.
    #[error("Invalid value for option '{key}': {value}")]
    InvalidOption { key: String, value: String },

    /// A line-based field got both a direct value and operators.
    #[error("Conflict in {field}: direct value and operator")]
    LineConflict { field: String },

    /// Regenerated query text differs from the canonical original.
    #[error("Round trip mismatch:\n  original:      {original}\n  reconstructed: {reconstructed}")]
    RoundTrip {
        original: String,
        reconstructed: String,
    },

    /// Malformed schema document.
    #[error("Schema error: {0}")]
    Schema(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A built-in pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MqlError {
    /// Create a parse error carrying the offending literal.
    pub fn parse(literal: impl Into<String>) -> Self {
        Self::Parse {
            literal: literal.into(),
        }
    }

    /// Create an invalid modifier error.
    pub fn modifier(name: &'static str, literal: impl Into<String>) -> Self {
        Self::InvalidModifier {
            name,
            literal: literal.into(),
        }
    }

    /// Create an invalid option error.
    pub fn option(key: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidOption {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

/// Result type alias for transpiler operations.
pub type MqlResult<T> = Result<T, MqlError>;
