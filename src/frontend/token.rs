//! Tokens of the set/relation grammar.

use crate::utils::location::Span;
use std::fmt;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier (tuple variable, parameter, or function name)
    Ident,
    /// Integer literal
    Integer,

    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `->`
    Arrow,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `=` or `==`
    Equal,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `&&`
    AmpAmp,

    /// `union`
    Union,
    /// `and` (alternative conjunction spelling)
    And,
    /// `FALSE`
    False,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Keyword lookup for an identifier lexeme.
    pub fn keyword(lexeme: &str) -> Option<TokenKind> {
        match lexeme {
            "union" => Some(TokenKind::Union),
            "and" => Some(TokenKind::And),
            "FALSE" => Some(TokenKind::False),
            _ => None,
        }
    }
}

/// A token with its source span and original text.
#[derive(Debug, Clone)]
pub struct Token {
    /// What kind of token this is
    pub kind: TokenKind,
    /// Where it came from
    pub span: Span,
    /// The original text
    pub lexeme: String,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, span, lexeme }
    }

    /// Whether this is the EOF token.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            write!(f, "end of input")
        } else {
            write!(f, "`{}`", self.lexeme)
        }
    }
}
