//! Recursive-descent parser for the set/relation grammar.
//!
//! ```text
//! input   := [ "[" ident ("," ident)* "]" "->" ] block ("union" block)*
//! block   := "{" tuple [ "->" tuple ] [ ":" body ] "}"
//! tuple   := "[" [ elem ("," elem)* ] "]"
//! elem    := ident | int | "-" int
//! body    := "FALSE" | chain (("&&" | "and") chain)*
//! chain   := expr (relop expr)+
//! expr    := [ "-" ] term (("+" | "-") term)*
//! term    := int [ "*"? factor ] | factor
//! factor  := ident [ "(" expr ("," expr)* ")" ] [ "[" int "]" ] | "(" expr ")"
//! ```
//!
//! An identifier resolves to a tuple position when the enclosing tuple
//! declares it, otherwise it is a symbolic parameter. Chained
//! comparisons (`0 <= i < n`) emit one constraint per adjacent pair.

use crate::algebra::exp::Exp;
use crate::algebra::term::{Term, TermKind, UfCall};
use crate::algebra::tuple_decl::TupleDecl;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::{Relation, Set};
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::ParseError;

/// One parsed `{ ... }` block.
struct Block {
    conj: Conjunction,
    is_false: bool,
}

/// Recursive-descent parser over a lexed token stream.
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Lex `source` and position the parser at the first token.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(&format!("expected {}, found {}", what, self.peek())))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        let tok = self.peek();
        ParseError::new(message, tok.span, tok.lexeme.clone())
    }

    /// Parse a complete set.
    pub fn parse_set(&mut self) -> Result<Set, ParseError> {
        let blocks = self.parse_input(false)?;
        let arity = blocks[0].conj.arity();
        let mut set = Set::empty(arity);
        for b in blocks {
            if b.conj.arity() != arity {
                return Err(self.error("union operands have different arities"));
            }
            if !b.is_false {
                set.add_conjunction(b.conj)
                    .map_err(|e| self.error(&e.to_string()))?;
            }
        }
        Ok(set)
    }

    /// Parse a complete relation.
    pub fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        let blocks = self.parse_input(true)?;
        let in_arity = blocks[0].conj.in_arity();
        let out_arity = blocks[0].conj.out_arity();
        let mut rel = Relation::empty(in_arity, out_arity);
        for b in blocks {
            if b.conj.in_arity() != in_arity || b.conj.out_arity() != out_arity {
                return Err(self.error("union operands have different arities"));
            }
            if !b.is_false {
                rel.add_conjunction(b.conj)
                    .map_err(|e| self.error(&e.to_string()))?;
            }
        }
        Ok(rel)
    }

    fn parse_input(&mut self, relation: bool) -> Result<Vec<Block>, ParseError> {
        // optional symbolic-parameter header: [n, m] ->
        if self.peek_kind() == TokenKind::LeftBracket {
            self.advance();
            if self.peek_kind() != TokenKind::RightBracket {
                loop {
                    self.expect(TokenKind::Ident, "parameter name")?;
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RightBracket, "`]`")?;
            self.expect(TokenKind::Arrow, "`->` after parameter list")?;
        }

        let mut blocks = vec![self.parse_block(relation)?];
        while self.matches(TokenKind::Union) {
            blocks.push(self.parse_block(relation)?);
        }
        self.expect(TokenKind::Eof, "end of input")?;
        Ok(blocks)
    }

    fn parse_block(&mut self, relation: bool) -> Result<Block, ParseError> {
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let first = self.parse_tuple()?;
        let (decl, in_arity) = if self.matches(TokenKind::Arrow) {
            let second = self.parse_tuple()?;
            (first.concat(&second), first.size())
        } else {
            if relation {
                return Err(self.error("expected `->` between input and output tuples"));
            }
            (first, 0)
        };
        if relation && in_arity == 0 {
            return Err(self.error("a relation needs an input tuple"));
        }
        if !relation && in_arity > 0 {
            return Err(self.error("unexpected `->` in a set"));
        }

        let mut conj = Conjunction::with_in_arity(decl, in_arity);
        let mut is_false = false;
        if self.matches(TokenKind::Colon) {
            if self.matches(TokenKind::False) {
                is_false = true;
            } else {
                loop {
                    self.parse_chain(&mut conj)?;
                    if !self.matches(TokenKind::AmpAmp) && !self.matches(TokenKind::And) {
                        break;
                    }
                }
            }
        }
        self.expect(TokenKind::RightBrace, "`}`")?;
        Ok(Block { conj, is_false })
    }

    fn parse_tuple(&mut self) -> Result<TupleDecl, ParseError> {
        self.expect(TokenKind::LeftBracket, "`[`")?;
        let mut decl = TupleDecl::empty();
        if self.peek_kind() != TokenKind::RightBracket {
            loop {
                match self.peek_kind() {
                    TokenKind::Ident => {
                        let tok = self.advance();
                        decl.append_var(tok.lexeme);
                    }
                    TokenKind::Integer => {
                        let v = self.parse_integer()?;
                        decl.append_const(v);
                    }
                    TokenKind::Minus => {
                        self.advance();
                        let v = self.parse_integer()?;
                        decl.append_const(-v);
                    }
                    _ => return Err(self.error("expected tuple element")),
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBracket, "`]`")?;
        Ok(decl)
    }

    fn parse_integer(&mut self) -> Result<i64, ParseError> {
        let tok = self.expect(TokenKind::Integer, "integer")?;
        tok.lexeme
            .parse::<i64>()
            .map_err(|_| ParseError::new("integer literal out of range", tok.span, tok.lexeme))
    }

    /// One comparison chain; each adjacent pair emits a constraint.
    fn parse_chain(&mut self, conj: &mut Conjunction) -> Result<(), ParseError> {
        let mut lhs = self.parse_expr(conj.tuple_decl())?;
        let mut count = 0;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Equal
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual => self.advance().kind,
                _ => break,
            };
            let rhs = self.parse_expr(conj.tuple_decl())?;
            // every comparison becomes `e = 0` or `e >= 0`
            let mut e = rhs.clone();
            match op {
                TokenKind::Equal => {
                    e.sub_exp(&lhs);
                    conj.add_equality(e);
                }
                TokenKind::LessEqual => {
                    e.sub_exp(&lhs);
                    conj.add_inequality(e);
                }
                TokenKind::Less => {
                    e.sub_exp(&lhs);
                    e.add_exp(&Exp::constant(-1));
                    conj.add_inequality(e);
                }
                TokenKind::GreaterEqual => {
                    let mut e = lhs.clone();
                    e.sub_exp(&rhs);
                    conj.add_inequality(e);
                }
                TokenKind::Greater => {
                    let mut e = lhs.clone();
                    e.sub_exp(&rhs);
                    e.add_exp(&Exp::constant(-1));
                    conj.add_inequality(e);
                }
                _ => unreachable!(),
            }
            lhs = rhs;
            count += 1;
        }
        if count == 0 {
            return Err(self.error("expected a comparison operator"));
        }
        Ok(())
    }

    fn parse_expr(&mut self, decl: &TupleDecl) -> Result<Exp, ParseError> {
        let mut exp = Exp::zero();
        let mut sign = if self.matches(TokenKind::Minus) { -1 } else { 1 };
        loop {
            let term = self.parse_term(decl)?;
            let mut term = term;
            term.multiply_by(sign);
            exp.add_exp(&term);
            sign = if self.matches(TokenKind::Plus) {
                1
            } else if self.matches(TokenKind::Minus) {
                -1
            } else {
                break;
            };
        }
        Ok(exp)
    }

    fn parse_term(&mut self, decl: &TupleDecl) -> Result<Exp, ParseError> {
        if self.peek_kind() == TokenKind::Integer {
            let coeff = self.parse_integer()?;
            // `3*x`, `3 x`, and `3 f(i)` all scale the following factor
            let has_factor = self.matches(TokenKind::Star)
                || self.peek_kind() == TokenKind::Ident
                || self.peek_kind() == TokenKind::LeftParen;
            if has_factor {
                let mut factor = self.parse_factor(decl)?;
                factor.multiply_by(coeff);
                Ok(factor)
            } else {
                Ok(Exp::constant(coeff))
            }
        } else {
            self.parse_factor(decl)
        }
    }

    fn parse_factor(&mut self, decl: &TupleDecl) -> Result<Exp, ParseError> {
        match self.peek_kind() {
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr(decl)?;
                self.expect(TokenKind::RightParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident => {
                let tok = self.advance();
                let name = tok.lexeme;
                if self.matches(TokenKind::LeftParen) {
                    let mut args = Vec::new();
                    if self.peek_kind() != TokenKind::RightParen {
                        loop {
                            args.push(self.parse_expr(decl)?);
                            if !self.matches(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RightParen, "`)`")?;
                    let call = if let Some(index) = self.parse_component_index()? {
                        UfCall::indexed(name, args, index)
                    } else {
                        UfCall::new(name, args)
                    };
                    return Ok(Exp::single(Term::uf_call(1, call)));
                }
                if let Some(loc) = decl.position_of(&name) {
                    let sub = self.parse_component_index()?;
                    return Ok(Exp::single(Term::new(
                        1,
                        TermKind::TupleVar { loc, sub },
                    )));
                }
                Ok(Exp::var(name))
            }
            _ => Err(self.error("expected an expression")),
        }
    }

    /// An optional `[k]` component-index suffix.
    fn parse_component_index(&mut self) -> Result<Option<usize>, ParseError> {
        if self.peek_kind() == TokenKind::LeftBracket {
            self.advance();
            let v = self.parse_integer()?;
            self.expect(TokenKind::RightBracket, "`]`")?;
            Ok(Some(v as usize))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(input: &str) -> Set {
        Parser::new(input).unwrap().parse_set().unwrap()
    }

    fn relation(input: &str) -> Relation {
        Parser::new(input).unwrap().parse_relation().unwrap()
    }

    #[test]
    fn test_simple_set() {
        let s = set("{ [i] : i >= 0 }");
        assert_eq!(s.arity(), 1);
        assert_eq!(s.conjunctions().len(), 1);
        assert_eq!(format!("{}", s), "{ [i] : i >= 0 }");
    }

    #[test]
    fn test_chained_comparison() {
        let s = set("[n] -> { [i] : 0 <= i < n }");
        let c = &s.conjunctions()[0];
        assert_eq!(c.inequalities().len(), 2);
        assert_eq!(format!("{}", s), "[n] -> { [i] : -i + n - 1 >= 0 && i >= 0 }");
    }

    #[test]
    fn test_coefficient_juxtaposition() {
        let a = set("{ [x] : 3 x - 6 = 0 }");
        let b = set("{ [x] : 3*x - 6 = 0 }");
        assert_eq!(a, b);
    }

    #[test]
    fn test_relation_with_params() {
        let r = relation("[n] -> { [i] -> [j] : j = i + 1 && 0 <= i < n }");
        assert_eq!(r.in_arity(), 1);
        assert_eq!(r.out_arity(), 1);
        assert_eq!(r.conjunctions()[0].equalities().len(), 1);
    }

    #[test]
    fn test_uf_call_constraint() {
        let s = set("{ [i, k] : rowptr(i) <= k < rowptr(i + 1) }");
        let c = &s.conjunctions()[0];
        assert_eq!(c.inequalities().len(), 2);
        assert!(c.contains_uf_call());
    }

    #[test]
    fn test_indexed_uf_call() {
        let s = set("{ [i, t] : i = f(t)[1] }");
        let eq = &s.conjunctions()[0].equalities()[0];
        let has_indexed = eq.terms().iter().any(|t| {
            matches!(&t.kind, TermKind::UfCall(c) if c.tuple_index == Some(1))
        });
        assert!(has_indexed);
    }

    #[test]
    fn test_union_and_false() {
        let s = set("{ [i] : i = 0 } union { [i] : FALSE } union { [i] : i - 5 = 0 }");
        assert_eq!(s.conjunctions().len(), 2);
        let all_false = set("{ [i] : FALSE }");
        assert!(all_false.is_false());
        assert_eq!(all_false.arity(), 1);
    }

    #[test]
    fn test_constant_tuple_elements() {
        let s = set("{ [0, j] : j >= 0 }");
        assert!(s.conjunctions()[0].tuple_decl().elem_is_const(0));
    }

    #[test]
    fn test_and_keyword() {
        let a = set("{ [i] : i >= 0 and i <= 9 }");
        let b = set("{ [i] : i >= 0 && i <= 9 }");
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_round_trip() {
        let original = "[n] -> { [i, k] : k - rowptr(i) >= 0 && -i + n - 1 >= 0 }";
        let s = set(original);
        assert_eq!(set(&format!("{}", s)), s);
    }

    #[test]
    fn test_error_carries_span() {
        let err = Parser::new("{ [i] : i @ }").unwrap_err();
        assert!(err.span.start.column > 1);
        let err = Parser::new("{ [i] i }").unwrap().parse_set().unwrap_err();
        assert!(err.message.contains("expected"));
    }

    #[test]
    fn test_relation_rejected_as_set() {
        assert!(Parser::new("{ [i] -> [j] : j = i }")
            .unwrap()
            .parse_set()
            .is_err());
    }
}
