//! Linear expressions: ordered sums of coefficient-scaled terms.
//!
//! An `Exp` keeps its terms sorted in the canonical term order and merged
//! on insertion, so structurally equal expressions compare equal. The
//! equality/inequality interpretation (`= 0` vs `>= 0`) lives one level up,
//! on the conjunction that owns the expression.

use crate::algebra::term::{Term, TermKind, TupleExp, UfCall};
use num_integer::Integer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A linear expression over constants, parameters, tuple variables, and
/// uninterpreted function calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Exp {
    terms: Vec<Term>,
}

/// A simultaneous factor-for-expression replacement map.
///
/// All lookups happen against the original expression, so substituting
/// `{a -> b, b -> a}` swaps the two factors instead of chaining.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    entries: Vec<(TermKind, Exp)>,
}

impl SubstitutionMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add or replace the replacement for a factor.
    pub fn insert(&mut self, kind: TermKind, exp: Exp) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = exp;
        } else {
            self.entries.push((kind, exp));
        }
    }

    /// Add a replacement and first fold it into every existing entry, so
    /// entries that referenced this factor become fully resolved.
    pub fn insert_composing(&mut self, kind: TermKind, exp: Exp) {
        let mut single = SubstitutionMap::new();
        single.insert(kind.clone(), exp.clone());
        for (_, e) in self.entries.iter_mut() {
            *e = e.substitute(&single);
        }
        self.insert(kind, exp);
    }

    /// Look up the replacement for a factor.
    pub fn lookup(&self, kind: &TermKind) -> Option<&Exp> {
        self.entries
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, e)| e)
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(TermKind, Exp)> {
        self.entries.iter()
    }
}

/// Assignment of concrete integer values to the symbols an expression can
/// mention. Used by point-sampling tests and the soundness checks.
pub trait TermEval {
    /// Value of the tuple variable at `loc`.
    fn tuple_value(&self, loc: usize) -> i64;
    /// Value of the named parameter.
    fn var_value(&self, name: &str) -> i64;
    /// Value of the UF call on the given concrete arguments.
    fn uf_value(&self, name: &str, args: &[i64], index: Option<usize>) -> i64;
}

impl Exp {
    /// The zero expression.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self::single(Term::constant(value))
    }

    /// An expression holding one tuple-variable reference.
    pub fn tuple_var(loc: usize) -> Self {
        Self::single(Term::tuple_var(1, loc))
    }

    /// An expression holding one named parameter.
    pub fn var(name: impl Into<String>) -> Self {
        Self::single(Term::var(1, name))
    }

    /// An expression holding one term.
    pub fn single(term: Term) -> Self {
        let mut e = Self::zero();
        e.add_term(term);
        e
    }

    /// Build an expression by summing terms (merging equal factors).
    pub fn from_terms(terms: Vec<Term>) -> Self {
        let mut e = Self::zero();
        for t in terms {
            e.add_term(t);
        }
        e
    }

    /// The terms of this expression, in canonical order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Add one term, merging coefficients when the factor already occurs
    /// and dropping the term if the merged coefficient cancels to zero.
    pub fn add_term(&mut self, term: Term) {
        if term.coeff == 0 {
            return;
        }
        match self.terms.iter().position(|t| t.same_factor(&term)) {
            Some(i) => {
                self.terms[i].coeff += term.coeff;
                if self.terms[i].coeff == 0 {
                    self.terms.remove(i);
                }
            }
            None => {
                let at = self
                    .terms
                    .partition_point(|t| t.kind < term.kind);
                self.terms.insert(at, term);
            }
        }
    }

    /// Add another expression into this one.
    pub fn add_exp(&mut self, other: &Exp) {
        for t in &other.terms {
            self.add_term(t.clone());
        }
    }

    /// Subtract another expression from this one.
    pub fn sub_exp(&mut self, other: &Exp) {
        for t in &other.terms {
            let mut t = t.clone();
            t.coeff = -t.coeff;
            self.add_term(t);
        }
    }

    /// Multiply every coefficient by a scalar.
    pub fn multiply_by(&mut self, factor: i64) {
        if factor == 0 {
            self.terms.clear();
            return;
        }
        for t in &mut self.terms {
            t.coeff *= factor;
        }
    }

    /// Whether the expression reduced to zero (trivially true as `= 0`).
    pub fn equals_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether the expression is a (possibly zero) constant.
    pub fn is_const(&self) -> bool {
        match self.terms.as_slice() {
            [] => true,
            [t] => t.is_const(),
            _ => false,
        }
    }

    /// The constant value, if `is_const()`.
    pub fn const_val(&self) -> Option<i64> {
        match self.terms.as_slice() {
            [] => Some(0),
            [t] if t.is_const() => Some(t.coeff),
            _ => None,
        }
    }

    /// Flip signs so the first nonzero term has a positive coefficient.
    /// Only meaningful for equality expressions, where both signs denote
    /// the same constraint.
    pub fn sign_normalize(&mut self) {
        if let Some(first) = self.terms.first() {
            if first.coeff < 0 {
                self.multiply_by(-1);
            }
        }
    }

    /// Whether the given factor occurs anywhere in this expression,
    /// including inside UF-call arguments and tuple components.
    pub fn depends_on(&self, kind: &TermKind) -> bool {
        self.terms.iter().any(|t| {
            if t.kind == *kind {
                return true;
            }
            match &t.kind {
                TermKind::UfCall(c) => c.args.iter().any(|a| a.depends_on(kind)),
                TermKind::TupleExp(te) => te.elems.iter().any(|e| e.depends_on(kind)),
                _ => false,
            }
        })
    }

    /// Whether any UF call occurs in this expression.
    pub fn contains_uf_call(&self) -> bool {
        self.terms.iter().any(|t| match &t.kind {
            TermKind::UfCall(_) => true,
            TermKind::TupleExp(te) => te.elems.iter().any(|e| e.contains_uf_call()),
            _ => false,
        })
    }

    /// Collect every UF call in this expression, innermost first.
    pub fn collect_uf_calls(&self, out: &mut Vec<UfCall>) {
        for t in &self.terms {
            match &t.kind {
                TermKind::UfCall(c) => {
                    for a in &c.args {
                        a.collect_uf_calls(out);
                    }
                    out.push(c.clone());
                }
                TermKind::TupleExp(te) => {
                    for e in &te.elems {
                        e.collect_uf_calls(out);
                    }
                }
                _ => {}
            }
        }
    }

    /// Collect every named parameter mentioned anywhere in the expression.
    pub fn collect_var_names(&self, out: &mut std::collections::BTreeSet<String>) {
        for t in &self.terms {
            match &t.kind {
                TermKind::Var(name) => {
                    out.insert(name.clone());
                }
                TermKind::UfCall(c) => {
                    for a in &c.args {
                        a.collect_var_names(out);
                    }
                }
                TermKind::TupleExp(te) => {
                    for e in &te.elems {
                        e.collect_var_names(out);
                    }
                }
                _ => {}
            }
        }
    }

    /// Collect every tuple position referenced anywhere in the expression.
    pub fn collect_tuple_locs(&self, out: &mut std::collections::BTreeSet<usize>) {
        for t in &self.terms {
            match &t.kind {
                TermKind::TupleVar { loc, .. } => {
                    out.insert(*loc);
                }
                TermKind::UfCall(c) => {
                    for a in &c.args {
                        a.collect_tuple_locs(out);
                    }
                }
                TermKind::TupleExp(te) => {
                    for e in &te.elems {
                        e.collect_tuple_locs(out);
                    }
                }
                _ => {}
            }
        }
    }

    /// The highest tuple position referenced anywhere in the expression.
    pub fn max_tuple_loc(&self) -> Option<usize> {
        let mut max = None;
        for t in &self.terms {
            let cand = match &t.kind {
                TermKind::TupleVar { loc, .. } => Some(*loc),
                TermKind::UfCall(c) => c.args.iter().filter_map(|a| a.max_tuple_loc()).max(),
                TermKind::TupleExp(te) => te.elems.iter().filter_map(|e| e.max_tuple_loc()).max(),
                _ => None,
            };
            max = max.max(cand);
        }
        max
    }

    /// Solve `self = 0` for the given factor.
    ///
    /// Returns `Some(rest)` with `factor = rest` when the factor occurs
    /// exactly once (and not nested inside another term) and its
    /// coefficient divides every other coefficient. Returns `None` when no
    /// such solved form exists; that is a valid negative result, not an
    /// error.
    pub fn solve_for_factor(&self, kind: &TermKind) -> Option<Exp> {
        let mut hits = self.terms.iter().filter(|t| t.kind == *kind);
        let hit = hits.next()?;
        if hits.next().is_some() {
            return None;
        }
        let c = hit.coeff;
        let mut rest = Exp::zero();
        for t in &self.terms {
            if t.kind != *kind {
                rest.add_term(t.clone());
            }
        }
        // A nested occurrence makes the solved form self-referential.
        if rest.depends_on(kind) {
            return None;
        }
        if c.abs() != 1 {
            if rest.terms.iter().any(|t| !t.coeff.is_multiple_of(&c)) {
                return None;
            }
        }
        for t in &mut rest.terms {
            t.coeff = -t.coeff / c;
        }
        Some(rest)
    }

    /// Simultaneously replace factors per the map, recursing into UF-call
    /// arguments and tuple components. All lookups are against the original
    /// expression, never against already-substituted results.
    pub fn substitute(&self, map: &SubstitutionMap) -> Exp {
        let mut out = Exp::zero();
        for t in &self.terms {
            if let Some(rep) = map.lookup(&t.kind) {
                let mut rep = rep.clone();
                rep.multiply_by(t.coeff);
                out.add_exp(&rep);
                continue;
            }
            let kind = match &t.kind {
                TermKind::UfCall(c) => TermKind::UfCall(UfCall {
                    name: c.name.clone(),
                    args: c.args.iter().map(|a| a.substitute(map)).collect(),
                    tuple_index: c.tuple_index,
                }),
                TermKind::TupleExp(te) => TermKind::TupleExp(TupleExp::new(
                    te.elems.iter().map(|e| e.substitute(map)).collect(),
                )),
                other => other.clone(),
            };
            // Argument substitution may have produced a factor the map knows.
            if let Some(rep) = map.lookup(&kind) {
                let mut rep = rep.clone();
                rep.multiply_by(t.coeff);
                out.add_exp(&rep);
            } else {
                out.add_term(Term::new(t.coeff, kind));
            }
        }
        out
    }

    /// Rewrite every tuple-variable reference through `old_to_new`, where
    /// `old_to_new[old] = new` and `-1` marks a vanished position.
    ///
    /// Referencing a vanished position is a programmer error: callers must
    /// drop constraints that still depend on a position before removing it.
    pub fn remap_tuple_vars(&mut self, old_to_new: &[i64]) {
        let remapped: Vec<Term> = self
            .terms
            .iter()
            .map(|t| {
                let kind = match &t.kind {
                    TermKind::TupleVar { loc, sub } => {
                        let new = old_to_new
                            .get(*loc)
                            .copied()
                            .unwrap_or_else(|| panic!("tuple position {} out of remap range", loc));
                        assert!(new >= 0, "remapped a reference to vanished tuple position {}", loc);
                        TermKind::TupleVar {
                            loc: new as usize,
                            sub: *sub,
                        }
                    }
                    TermKind::UfCall(c) => {
                        let mut c = c.clone();
                        for a in &mut c.args {
                            a.remap_tuple_vars(old_to_new);
                        }
                        TermKind::UfCall(c)
                    }
                    TermKind::TupleExp(te) => {
                        let mut te = te.clone();
                        for e in &mut te.elems {
                            e.remap_tuple_vars(old_to_new);
                        }
                        TermKind::TupleExp(te)
                    }
                    other => other.clone(),
                };
                Term::new(t.coeff, kind)
            })
            .collect();
        *self = Exp::from_terms(remapped);
    }

    /// Fold nested applications of a function and its inverse:
    /// `f(f_inv(x))` and `f_inv(f(x))` both collapse to `x`. Only unary
    /// calls participate. `inverse_of` reports the registered inverse for
    /// a function name, if any.
    pub fn collapse_nested_inverses(&mut self, inverse_of: &dyn Fn(&str) -> Option<String>) {
        let terms: Vec<Term> = self
            .terms
            .iter()
            .map(|t| {
                let kind = match &t.kind {
                    TermKind::UfCall(c) => {
                        let mut c = c.clone();
                        for a in &mut c.args {
                            a.collapse_nested_inverses(inverse_of);
                        }
                        if c.args.len() == 1 && c.tuple_index.is_none() {
                            if let [inner] = c.args[0].terms() {
                                if inner.coeff == 1 {
                                    if let TermKind::UfCall(ic) = &inner.kind {
                                        let inverse_pair = ic.args.len() == 1
                                            && ic.tuple_index.is_none()
                                            && (inverse_of(&c.name).as_deref() == Some(ic.name.as_str())
                                                || inverse_of(&ic.name).as_deref()
                                                    == Some(c.name.as_str()));
                                        if inverse_pair {
                                            let mut folded = ic.args[0].clone();
                                            folded.multiply_by(t.coeff);
                                            return folded.terms.clone();
                                        }
                                    }
                                }
                            }
                        }
                        TermKind::UfCall(c)
                    }
                    other => other.clone(),
                };
                vec![Term::new(t.coeff, kind)]
            })
            .flatten()
            .collect();
        *self = Exp::from_terms(terms);
    }

    /// Evaluate a scalar expression under a concrete assignment.
    ///
    /// Panics on tuple-expression terms, which have no scalar value.
    pub fn evaluate<E: TermEval>(&self, env: &E) -> i64 {
        self.terms
            .iter()
            .map(|t| {
                let base = match &t.kind {
                    TermKind::Const => 1,
                    TermKind::Var(name) => env.var_value(name),
                    TermKind::TupleVar { loc, .. } => env.tuple_value(*loc),
                    TermKind::UfCall(c) => {
                        let args: Vec<i64> = c.args.iter().map(|a| a.evaluate(env)).collect();
                        env.uf_value(&c.name, &args, c.tuple_index)
                    }
                    TermKind::TupleExp(_) => {
                        panic!("cannot evaluate a tuple expression as a scalar")
                    }
                };
                t.coeff * base
            })
            .sum()
    }
}

/// Renders an expression with tuple variables named by a declaration
/// instead of the positional `__tvN` default.
pub struct ExpDisplay<'a> {
    exp: &'a Exp,
    decl: &'a crate::algebra::tuple_decl::TupleDecl,
}

impl Exp {
    /// Display adapter using the declaration's variable names.
    pub fn display_with<'a>(
        &'a self,
        decl: &'a crate::algebra::tuple_decl::TupleDecl,
    ) -> ExpDisplay<'a> {
        ExpDisplay { exp: self, decl }
    }
}

fn write_term_named(
    f: &mut fmt::Formatter<'_>,
    term: &Term,
    decl: &crate::algebra::tuple_decl::TupleDecl,
    coeff: i64,
) -> fmt::Result {
    if term.is_const() {
        return write!(f, "{}", coeff);
    }
    match coeff {
        1 => {}
        -1 => write!(f, "-")?,
        c => write!(f, "{} ", c)?,
    }
    match &term.kind {
        TermKind::Const => unreachable!(),
        TermKind::Var(name) => write!(f, "{}", name),
        TermKind::TupleVar { loc, sub } => {
            if *loc < decl.size() {
                write!(f, "{}", decl.elem_var_string(*loc))?;
            } else {
                write!(f, "__tv{}", loc)?;
            }
            if let Some(s) = sub {
                write!(f, "[{}]", s)?;
            }
            Ok(())
        }
        TermKind::UfCall(c) => {
            write!(f, "{}(", c.name)?;
            for (i, a) in c.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", a.display_with(decl))?;
            }
            write!(f, ")")?;
            if let Some(idx) = c.tuple_index {
                write!(f, "[{}]", idx)?;
            }
            Ok(())
        }
        TermKind::TupleExp(te) => {
            write!(f, "(")?;
            for (i, e) in te.elems.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", e.display_with(decl))?;
            }
            write!(f, ")")
        }
    }
}

/// Rendering order for terms: tuple variables first, then uninterpreted
/// calls, tuple expressions, free symbols, and the constant last. Storage
/// keeps terms in canonical `Ord` order; printing reorders them so that
/// `i + 1` and `j - n` read the way a human would write them.
fn display_order(terms: &[Term]) -> Vec<&Term> {
    let mut ordered: Vec<&Term> = terms.iter().collect();
    ordered.sort_by_key(|t| match &t.kind {
        TermKind::TupleVar { .. } => 0,
        TermKind::UfCall(_) => 1,
        TermKind::TupleExp(_) => 2,
        TermKind::Var(_) => 3,
        TermKind::Const => 4,
    });
    ordered
}

impl fmt::Display for ExpDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exp.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, t) in display_order(&self.exp.terms).into_iter().enumerate() {
            if i == 0 {
                write_term_named(f, t, self.decl, t.coeff)?;
            } else if t.coeff < 0 {
                write!(f, " - ")?;
                write_term_named(f, t, self.decl, -t.coeff)?;
            } else {
                write!(f, " + ")?;
                write_term_named(f, t, self.decl, t.coeff)?;
            }
        }
        Ok(())
    }
}

impl Add for Exp {
    type Output = Exp;
    fn add(mut self, rhs: Exp) -> Exp {
        self.add_exp(&rhs);
        self
    }
}

impl Sub for Exp {
    type Output = Exp;
    fn sub(mut self, rhs: Exp) -> Exp {
        self.sub_exp(&rhs);
        self
    }
}

impl Neg for Exp {
    type Output = Exp;
    fn neg(mut self) -> Exp {
        self.multiply_by(-1);
        self
    }
}

impl Mul<i64> for Exp {
    type Output = Exp;
    fn mul(mut self, rhs: i64) -> Exp {
        self.multiply_by(rhs);
        self
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, t) in display_order(&self.terms).into_iter().enumerate() {
            if i == 0 {
                write!(f, "{}", t)?;
            } else if t.coeff < 0 {
                let mut pos = t.clone();
                pos.coeff = -pos.coeff;
                write!(f, " - {}", pos)?;
            } else {
                write!(f, " + {}", t)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(loc: usize) -> TermKind {
        TermKind::tuple_var(loc)
    }

    #[test]
    fn test_merge_and_cancel() {
        let mut e = Exp::zero();
        e.add_term(Term::var(2, "n"));
        e.add_term(Term::var(3, "n"));
        assert_eq!(e.terms().len(), 1);
        assert_eq!(e.terms()[0].coeff, 5);
        e.add_term(Term::var(-5, "n"));
        assert!(e.equals_zero());
    }

    #[test]
    fn test_display_orders_tuple_vars_first() {
        let e = Exp::from_terms(vec![
            Term::uf_call(1, UfCall::new("f", vec![Exp::tuple_var(0)])),
            Term::tuple_var(1, 1),
            Term::constant(7),
            Term::var(1, "n"),
        ]);
        assert_eq!(format!("{}", e), "__tv1 + f(__tv0) + n + 7");
    }

    #[test]
    fn test_solve_for_factor_simple() {
        // 2 tv0 - 4 n + 6 = 0  =>  tv0 = 2 n - 3
        let e = Exp::from_terms(vec![
            Term::tuple_var(2, 0),
            Term::var(-4, "n"),
            Term::constant(6),
        ]);
        let solved = e.solve_for_factor(&tv(0)).unwrap();
        assert_eq!(format!("{}", solved), "2 n - 3");
    }

    #[test]
    fn test_solve_for_factor_indivisible() {
        // 2 tv0 + n = 0 has no integer solved form for tv0
        let e = Exp::from_terms(vec![Term::tuple_var(2, 0), Term::var(1, "n")]);
        assert!(e.solve_for_factor(&tv(0)).is_none());
    }

    #[test]
    fn test_solve_for_factor_nested_occurrence() {
        // tv0 + f(tv0) = 0: solved form would be self-referential
        let e = Exp::from_terms(vec![
            Term::tuple_var(1, 0),
            Term::uf_call(1, UfCall::new("f", vec![Exp::tuple_var(0)])),
        ]);
        assert!(e.solve_for_factor(&tv(0)).is_none());
    }

    #[test]
    fn test_substitute_is_simultaneous() {
        // {tv0 -> tv1, tv1 -> tv0} must swap, not chain
        let e = Exp::from_terms(vec![Term::tuple_var(1, 0), Term::tuple_var(3, 1)]);
        let mut map = SubstitutionMap::new();
        map.insert(tv(0), Exp::tuple_var(1));
        map.insert(tv(1), Exp::tuple_var(0));
        let r = e.substitute(&map);
        assert_eq!(format!("{}", r), "3 __tv0 + __tv1");
    }

    #[test]
    fn test_substitute_into_uf_args() {
        let e = Exp::single(Term::uf_call(1, UfCall::new("f", vec![Exp::tuple_var(0)])));
        let mut map = SubstitutionMap::new();
        map.insert(tv(0), Exp::constant(4));
        assert_eq!(format!("{}", e.substitute(&map)), "f(4)");
    }

    #[test]
    fn test_insert_composing_resolves_chains() {
        // existing entry tv2 -> tv1 + 1; composing tv1 -> tv0 rewrites it
        let mut map = SubstitutionMap::new();
        map.insert(
            tv(2),
            Exp::from_terms(vec![Term::tuple_var(1, 1), Term::constant(1)]),
        );
        map.insert_composing(tv(1), Exp::tuple_var(0));
        assert_eq!(format!("{}", map.lookup(&tv(2)).unwrap()), "__tv0 + 1");
    }

    #[test]
    fn test_remap_tuple_vars() {
        let mut e = Exp::from_terms(vec![
            Term::tuple_var(1, 2),
            Term::uf_call(1, UfCall::new("f", vec![Exp::tuple_var(1)])),
        ]);
        e.remap_tuple_vars(&[-1, 0, 1]);
        assert_eq!(format!("{}", e), "__tv1 + f(__tv0)");
    }

    #[test]
    #[should_panic]
    fn test_remap_vanished_position_panics() {
        let mut e = Exp::tuple_var(0);
        e.remap_tuple_vars(&[-1]);
    }

    #[test]
    fn test_sign_normalize() {
        let mut e = Exp::from_terms(vec![Term::var(-1, "n"), Term::constant(5)]);
        e.sign_normalize();
        // first term is the constant 5 which is positive already
        assert_eq!(format!("{}", e), "-n + 5");
        let mut e2 = Exp::from_terms(vec![Term::constant(-5), Term::var(1, "n")]);
        e2.sign_normalize();
        assert_eq!(format!("{}", e2), "-n + 5");
    }

    #[test]
    fn test_collapse_nested_inverses() {
        let inner = UfCall::new("f_inv", vec![Exp::tuple_var(3)]);
        let outer = UfCall::new("f", vec![Exp::single(Term::uf_call(1, inner))]);
        let mut e = Exp::single(Term::uf_call(2, outer));
        let lookup = |name: &str| -> Option<String> {
            (name == "f").then(|| "f_inv".to_string())
        };
        e.collapse_nested_inverses(&lookup);
        assert_eq!(format!("{}", e), "2 __tv3");
    }

    #[test]
    fn test_display_with_decl_names() {
        use crate::algebra::tuple_decl::TupleDecl;
        let decl = TupleDecl::from_names(["i", "k"]);
        let e = Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, UfCall::new("rowptr", vec![Exp::tuple_var(0)])),
        ]);
        assert_eq!(format!("{}", e.display_with(&decl)), "k - rowptr(i)");
    }

    #[test]
    fn test_depends_on_nested() {
        let e = Exp::single(Term::uf_call(
            1,
            UfCall::new("f", vec![Exp::tuple_var(5)]),
        ));
        assert!(e.depends_on(&tv(5)));
        assert!(!e.depends_on(&tv(4)));
    }
}
