//! Source location tracking for parse error reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in an input string (line, column, byte offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of input
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// The location at the start of an input.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A contiguous region of an input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start of the region
    pub start: SourceLocation,
    /// End of the region (exclusive)
    pub end: SourceLocation,
}

impl Span {
    /// Create a span from start and end locations.
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    /// A span covering a single location.
    pub fn at(loc: SourceLocation) -> Self {
        Self { start: loc, end: loc }
    }

    /// Extract the spanned text from the original input.
    pub fn snippet<'a>(&self, source: &'a str) -> &'a str {
        let lo = self.start.offset.min(source.len());
        let hi = self.end.offset.min(source.len()).max(lo);
        &source[lo..hi]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
