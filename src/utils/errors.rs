//! Error types for the polyhedral algebra engine.
//!
//! Errors are grouped by the concern that produces them: structural contract
//! violations (arity, declarations, tuple constants), parsing, and the
//! affine backend round trip. Absence-of-solution conditions such as
//! `solve_for_factor` or `find_function` returning `None` are ordinary
//! values, not errors.

use crate::utils::location::Span;
use std::fmt;
use thiserror::Error;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum PolyError {
    /// A UF call references a name with no environment entry.
    #[error("undeclared uninterpreted function `{0}`")]
    UndeclaredFunction(String),

    /// A function name (or its synthesized inverse) was declared twice.
    #[error("duplicate declaration of uninterpreted function `{0}`")]
    DuplicateDeclaration(String),

    /// Two different constant values assigned to one tuple position.
    #[error("tuple position {position} already holds constant {existing}, cannot set {attempted}")]
    TupleDeclConflict {
        /// The tuple position in question
        position: usize,
        /// The constant already stored there
        existing: i64,
        /// The conflicting constant
        attempted: i64,
    },

    /// Operands of a set/relation operation have incompatible arities.
    #[error("arity mismatch in {operation}: {lhs} vs {rhs}")]
    ArityMismatch {
        /// The operation that was attempted
        operation: &'static str,
        /// Left operand arity description
        lhs: String,
        /// Right operand arity description
        rhs: String,
    },

    /// Neither operand of compose/apply is provably a function or inverse.
    #[error("not composable: {0}")]
    NotComposable(String),

    /// A construct the backend serialization cannot express.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// Malformed textual set/relation input.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Failure in the external affine backend round trip.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Error during parsing of the set/relation grammar.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in the input
    pub span: Span,
    /// The offending substring
    pub snippet: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, span: Span, snippet: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
            snippet: snippet.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.snippet.is_empty() {
            write!(f, "{} at {}", self.message, self.span.start)
        } else {
            write!(f, "{} at {} near `{}`", self.message, self.span.start, self.snippet)
        }
    }
}

/// Error from the affine backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend executable is not installed or not runnable.
    #[error("affine backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the configured timeout.
    #[error("affine backend timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The backend process reported failure.
    #[error("affine backend command failed: {0}")]
    CommandFailed(String),

    /// The backend's response could not be parsed.
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// I/O failure talking to the backend process.
    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias used throughout the crate.
pub type PolyResult<T> = Result<T, PolyError>;
