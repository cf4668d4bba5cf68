//! Omega-style serialization: UF calls become declared symbolic
//! constants.
//!
//! The Omega calculator cannot parse function-call syntax, so each call
//! is replaced by a flat symbol (via `UfcMap`) and declared with a
//! `symbolic` line ahead of the set text. The rewriter is reused across
//! the statements of one analysis: `prepare_for_next` clears the
//! per-statement declarations while keeping the memoized call-to-symbol
//! dictionary, and `reset` clears both.

use crate::algebra::exp::{Exp, SubstitutionMap};
use crate::algebra::term::TermKind;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::Set;
use crate::env::UfcMap;
use crate::utils::errors::PolyResult;

/// Rewrites UFC-bearing sets into Omega calculator input.
#[derive(Debug, Clone, Default)]
pub struct OmegaRewriter {
    ufc_map: UfcMap,
    declared: Vec<String>,
}

impl OmegaRewriter {
    /// A rewriter with an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated call-to-symbol dictionary.
    pub fn ufc_map(&self) -> &UfcMap {
        &self.ufc_map
    }

    /// Symbols declared for the current statement, in first-use order.
    pub fn declared_symbols(&self) -> &[String] {
        &self.declared
    }

    /// Partial reset between statements: per-statement declarations are
    /// dropped, the memoized dictionary survives so symbols stay stable
    /// across the whole analysis.
    pub fn prepare_for_next(&mut self) {
        self.declared.clear();
    }

    /// Full reset: forget declarations and the dictionary.
    pub fn reset(&mut self) {
        self.declared.clear();
        self.ufc_map = UfcMap::new();
    }

    /// Serialize a set with every UF call replaced by its symbol,
    /// prefixed by the `symbolic` declaration line Omega expects.
    pub fn rewrite_set(&mut self, set: &Set) -> PolyResult<String> {
        let mut body = Set::empty(set.arity());
        for c in set.conjunctions() {
            body.add_conjunction(self.rewrite_conjunction(c))?;
        }
        let mut out = String::new();
        if !self.declared.is_empty() {
            out.push_str(&format!("symbolic {};\n", self.declared.join(", ")));
        }
        out.push_str(&body.to_string());
        out.push(';');
        Ok(out)
    }

    fn rewrite_conjunction(&mut self, conj: &Conjunction) -> Conjunction {
        let mut map = SubstitutionMap::new();
        let mut calls = Vec::new();
        for e in conj.equalities().iter().chain(conj.inequalities()) {
            e.collect_uf_calls(&mut calls);
        }
        // innermost first, so outer calls are keyed on rewritten arguments
        for call in &calls {
            let mut call = call.clone();
            call.args = call.args.iter().map(|a| a.substitute(&map)).collect();
            let sym = self.ufc_map.insert(&call);
            if !self.declared.contains(&sym) {
                self.declared.push(sym.clone());
            }
            map.insert(TermKind::UfCall(call), Exp::var(sym));
        }
        conj.substitute(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::term::{Term, UfCall};
    use crate::algebra::tuple_decl::TupleDecl;

    fn sample_set() -> Set {
        // { [i, k] : k - rowptr(i) >= 0 }
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        c.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, UfCall::new("rowptr", vec![Exp::tuple_var(0)])),
        ]));
        Set::from_conjunction(c)
    }

    #[test]
    fn test_rewrite_declares_and_substitutes() {
        let mut rw = OmegaRewriter::new();
        let text = rw.rewrite_set(&sample_set()).unwrap();
        assert!(text.starts_with("symbolic rowptr___tv0_;\n"));
        assert!(text.contains("rowptr___tv0_"));
        assert!(!text.contains("rowptr("), "call syntax must not survive: {}", text);
    }

    #[test]
    fn test_partial_reset_keeps_dictionary() {
        let mut rw = OmegaRewriter::new();
        rw.rewrite_set(&sample_set()).unwrap();
        let before = rw.ufc_map().len();
        rw.prepare_for_next();
        assert!(rw.declared_symbols().is_empty());
        assert_eq!(rw.ufc_map().len(), before);
        // same call gets the same symbol on the next statement
        let text = rw.rewrite_set(&sample_set()).unwrap();
        assert!(text.contains("rowptr___tv0_"));
    }

    #[test]
    fn test_full_reset_clears_dictionary() {
        let mut rw = OmegaRewriter::new();
        rw.rewrite_set(&sample_set()).unwrap();
        rw.reset();
        assert!(rw.declared_symbols().is_empty());
        assert!(rw.ufc_map().is_empty());
    }
}
