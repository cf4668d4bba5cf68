//! Frontend: lexer and parser for the textual set/relation grammar.
//!
//! ## Grammar overview
//!
//! Sets and relations are written ISL-style, with symbolic parameters
//! declared up front and constraints after the colon:
//!
//! ```text
//! [n, nnz] -> { [i, k] : rowptr(i) <= k < rowptr(i + 1) && 0 <= i < n }
//! { [i, k] -> [k', i'] : k' = k && i' = colidx(k) }
//! ```
//!
//! Uninterpreted function calls may nest and may carry a `[c]`
//! component index into a multi-valued result.

pub mod lexer;
pub mod parser;
pub mod token;

// Re-exports
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};
pub use crate::utils::errors::ParseError;

use crate::constraints::set_relation::{Relation, Set};
use crate::utils::errors::PolyResult;

/// Parse a set from its textual form.
pub fn parse_set(input: &str) -> PolyResult<Set> {
    Ok(Parser::new(input)?.parse_set()?)
}

/// Parse a relation from its textual form.
pub fn parse_relation(input: &str) -> PolyResult<Relation> {
    Ok(Parser::new(input)?.parse_relation()?)
}
