//! A conjunction: one AND-clause of linear equalities and inequalities
//! over a tuple declaration.
//!
//! Conjunctions are the unit the normalize pipeline, composition, and
//! application work on. Constraint lists stay sorted and deduplicated;
//! equalities are sign-normalized so structurally equal conjunctions
//! compare equal.

use crate::algebra::exp::{Exp, SubstitutionMap};
use crate::algebra::term::{TermKind, TupleExp};
use crate::algebra::tuple_decl::{TupleDecl, TupleElem};
use crate::utils::errors::{PolyError, PolyResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An AND of equality (`= 0`) and inequality (`>= 0`) expressions over a
/// tuple declaration. `in_arity` splits the tuple for relations; it is 0
/// for set conjunctions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Conjunction {
    pub(crate) tuple_decl: TupleDecl,
    pub(crate) in_arity: usize,
    pub(crate) equalities: Vec<Exp>,
    pub(crate) inequalities: Vec<Exp>,
    pub(crate) unsat: bool,
}

impl Conjunction {
    /// A set conjunction (no input/output split) with no constraints yet.
    pub fn new(tuple_decl: TupleDecl) -> Self {
        Self::with_in_arity(tuple_decl, 0)
    }

    /// A relation conjunction whose first `in_arity` positions are inputs.
    pub fn with_in_arity(tuple_decl: TupleDecl, in_arity: usize) -> Self {
        assert!(in_arity <= tuple_decl.size());
        Self {
            tuple_decl,
            in_arity,
            equalities: Vec::new(),
            inequalities: Vec::new(),
            unsat: false,
        }
    }

    /// Total tuple arity.
    pub fn arity(&self) -> usize {
        self.tuple_decl.size()
    }

    /// Input arity (0 for sets).
    pub fn in_arity(&self) -> usize {
        self.in_arity
    }

    /// Output arity.
    pub fn out_arity(&self) -> usize {
        self.arity() - self.in_arity
    }

    /// The tuple declaration.
    pub fn tuple_decl(&self) -> &TupleDecl {
        &self.tuple_decl
    }

    /// The equality expressions, each meaning `exp = 0`.
    pub fn equalities(&self) -> &[Exp] {
        &self.equalities
    }

    /// The inequality expressions, each meaning `exp >= 0`.
    pub fn inequalities(&self) -> &[Exp] {
        &self.inequalities
    }

    /// Whether this conjunction has no constraints at all (the universal
    /// conjunction of its arity).
    pub fn is_universal(&self) -> bool {
        !self.unsat && self.equalities.is_empty() && self.inequalities.is_empty()
    }

    /// Shallow satisfiability check: detects only constraints that reduced
    /// to an infeasible constant (e.g. `5 = 0` or `-1 >= 0`). Deeper affine
    /// infeasibility is deliberately left to the backend.
    pub fn satisfiable(&self) -> bool {
        !self.unsat
    }

    /// Add `exp = 0`. Trivially-true expressions are dropped, duplicates
    /// suppressed, and a nonzero constant marks the conjunction
    /// unsatisfiable.
    pub fn add_equality(&mut self, mut exp: Exp) {
        exp.sign_normalize();
        if let Some(v) = exp.const_val() {
            if v != 0 {
                self.unsat = true;
            }
            return;
        }
        if let Err(at) = self.equalities.binary_search(&exp) {
            self.equalities.insert(at, exp);
        }
    }

    /// Add `exp >= 0`, with the same zero-elimination and deduplication.
    pub fn add_inequality(&mut self, exp: Exp) {
        if let Some(v) = exp.const_val() {
            if v < 0 {
                self.unsat = true;
            }
            return;
        }
        if let Err(at) = self.inequalities.binary_search(&exp) {
            self.inequalities.insert(at, exp);
        }
    }

    /// Whether any constraint mentions a UF call.
    pub fn contains_uf_call(&self) -> bool {
        self.equalities
            .iter()
            .chain(self.inequalities.iter())
            .any(|e| e.contains_uf_call())
    }

    /// Intersect with another conjunction of the same total arity.
    /// The result keeps this conjunction's input arity.
    pub fn intersect(&self, other: &Conjunction) -> PolyResult<Conjunction> {
        if self.arity() != other.arity() {
            return Err(PolyError::ArityMismatch {
                operation: "intersect",
                lhs: self.arity().to_string(),
                rhs: other.arity().to_string(),
            });
        }
        let mut out = self.clone();
        out.unsat = self.unsat || other.unsat;
        for e in &other.equalities {
            out.add_equality(e.clone());
        }
        for e in &other.inequalities {
            out.add_inequality(e.clone());
        }
        Ok(out)
    }

    /// Apply a simultaneous substitution to every constraint, rebuilding
    /// the sorted/deduplicated constraint lists.
    pub fn substitute(&self, map: &SubstitutionMap) -> Conjunction {
        let mut out = Conjunction::with_in_arity(self.tuple_decl.clone(), self.in_arity);
        out.unsat = self.unsat;
        for e in &self.equalities {
            out.add_equality(e.substitute(map));
        }
        for e in &self.inequalities {
            out.add_inequality(e.substitute(map));
        }
        out
    }

    /// Try to express tuple position `pos` as a function of the positions
    /// `allowed` accepts, by solving one of the equalities. A constant
    /// declaration slot is its own solved form. `None` means no solved
    /// form exists; not an error.
    pub fn find_function(&self, pos: usize, allowed: &dyn Fn(usize) -> bool) -> Option<Exp> {
        if let Some(v) = self.tuple_decl.elem_const_val(pos) {
            return Some(Exp::constant(v));
        }
        let key = TermKind::tuple_var(pos);
        for eq in &self.equalities {
            if let Some(sol) = eq.solve_for_factor(&key) {
                let mut locs = BTreeSet::new();
                sol.collect_tuple_locs(&mut locs);
                if locs.iter().all(|&l| allowed(l)) {
                    return Some(sol);
                }
            }
        }
        None
    }

    /// Whether every output position is a function of the inputs.
    pub fn is_function(&self, in_arity: usize) -> bool {
        (in_arity..self.arity()).all(|p| self.find_function(p, &|q| q < in_arity).is_some())
    }

    /// Whether every input position is a function of the outputs.
    pub fn is_function_inverse(&self, in_arity: usize) -> bool {
        (0..in_arity).all(|p| self.find_function(p, &|q| q >= in_arity).is_some())
    }

    /// Drop the tuple positions `old_to_new` maps to -1 and renumber the
    /// rest. Constraints still referencing a dropped position are
    /// discarded (with a debug log); callers substitute dropped positions
    /// away first, so a surviving reference means the position had no
    /// solved form.
    pub fn drop_and_remap(
        &self,
        old_to_new: &[i64],
        new_decl: TupleDecl,
        new_in_arity: usize,
    ) -> Conjunction {
        let dropped: BTreeSet<usize> = old_to_new
            .iter()
            .enumerate()
            .filter(|(_, &n)| n < 0)
            .map(|(p, _)| p)
            .collect();
        let mut out = Conjunction::with_in_arity(new_decl, new_in_arity);
        out.unsat = self.unsat;
        let keep = |e: &Exp| {
            let mut locs = BTreeSet::new();
            e.collect_tuple_locs(&mut locs);
            let ok = locs.is_disjoint(&dropped);
            if !ok {
                debug!("dropping constraint referencing eliminated tuple position: {}", e);
            }
            ok
        };
        for e in &self.equalities {
            if keep(e) {
                let mut e = e.clone();
                e.remap_tuple_vars(old_to_new);
                out.add_equality(e);
            }
        }
        for e in &self.inequalities {
            if keep(e) {
                let mut e = e.clone();
                e.remap_tuple_vars(old_to_new);
                out.add_inequality(e);
            }
        }
        out
    }

    /// Compose `self` after `rhs`: the result maps `x` to `self(rhs(x))`.
    ///
    /// `self` is `B -> C` with `|B| = self.in_arity`; `rhs` is `A -> B`.
    /// Both sides must be forward functions, or both inverse functions,
    /// over the shared inner tuple; otherwise `NotComposable`.
    pub fn compose(&self, rhs: &Conjunction) -> PolyResult<Conjunction> {
        let inner = self.in_arity;
        let rhs_in = rhs.in_arity;
        let rhs_out = rhs.arity() - rhs_in;
        if rhs_out != inner {
            return Err(PolyError::ArityMismatch {
                operation: "compose",
                lhs: format!("{} -> {}", inner, self.out_arity()),
                rhs: format!("{} -> {}", rhs_in, rhs_out),
            });
        }
        let self_out = self.out_arity();

        let forward = self.is_function(inner) && rhs.is_function(rhs_in);
        let backward =
            !forward && self.is_function_inverse(inner) && rhs.is_function_inverse(rhs_in);
        if !forward && !backward {
            return Err(PolyError::NotComposable(
                "neither operand pair is a function or an inverse function over the inner tuple"
                    .into(),
            ));
        }

        // Combined tuple [A, B, C]: rhs constraints land unshifted, self's
        // shift up so its inputs line up with rhs's outputs.
        let mut decl = rhs.tuple_decl.clone();
        for p in inner..self.arity() {
            match self.tuple_decl.elem_const_val(p) {
                Some(v) => decl.append_const(v),
                None => decl.append_var(self.tuple_decl.elem_var_string(p)),
            }
        }
        for p in 0..inner {
            if let Some(v) = self.tuple_decl.elem_const_val(p) {
                decl.set_elem(rhs_in + p, TupleElem::Const(v))?;
            }
        }

        let mut combined = Conjunction::with_in_arity(decl, rhs_in);
        combined.unsat = self.unsat || rhs.unsat;
        for e in rhs.equalities.iter() {
            combined.add_equality(e.clone());
        }
        for e in rhs.inequalities.iter() {
            combined.add_inequality(e.clone());
        }
        let shift: Vec<i64> = (0..self.arity()).map(|p| (p + rhs_in) as i64).collect();
        for e in self.equalities.iter() {
            let mut e = e.clone();
            e.remap_tuple_vars(&shift);
            combined.add_equality(e);
        }
        for e in self.inequalities.iter() {
            let mut e = e.clone();
            e.remap_tuple_vars(&shift);
            combined.add_inequality(e);
        }

        // Express each shared inner position without referencing the inner
        // range, then substitute it away.
        let mut map = SubstitutionMap::new();
        for p in rhs_in..rhs_in + inner {
            let sol = if forward {
                combined.find_function(p, &|q| q < rhs_in)
            } else {
                combined.find_function(p, &|q| q >= rhs_in + inner)
            };
            match sol {
                Some(sol) => map.insert(TermKind::tuple_var(p), sol),
                None => {
                    return Err(PolyError::NotComposable(format!(
                        "inner tuple position {} has no solved form",
                        p - rhs_in
                    )))
                }
            }
        }
        let substituted = combined.substitute(&map);

        let total = rhs_in + inner + self_out;
        let old_to_new: Vec<i64> = (0..total)
            .map(|p| {
                if p < rhs_in {
                    p as i64
                } else if p < rhs_in + inner {
                    -1
                } else {
                    (p - inner) as i64
                }
            })
            .collect();
        let final_decl = substituted.tuple_decl.drop_range(rhs_in, rhs_in + inner);
        Ok(substituted.drop_and_remap(&old_to_new, final_decl, rhs_in))
    }

    /// Apply this relation to a set conjunction of matching input arity,
    /// producing the image set conjunction. Requires the inputs to be
    /// solvable from the outputs.
    pub fn apply(&self, set: &Conjunction) -> PolyResult<Conjunction> {
        let m = self.in_arity;
        let n = self.out_arity();
        if set.arity() != m {
            return Err(PolyError::ArityMismatch {
                operation: "apply",
                lhs: format!("{} -> {}", m, n),
                rhs: set.arity().to_string(),
            });
        }
        if !self.is_function_inverse(m) {
            return Err(PolyError::NotComposable(
                "relation inputs are not solvable from its outputs".into(),
            ));
        }

        let mut decl = self.tuple_decl.clone();
        for p in 0..m {
            if let Some(v) = set.tuple_decl.elem_const_val(p) {
                decl.set_elem(p, TupleElem::Const(v))?;
            }
        }
        let mut combined = Conjunction::with_in_arity(decl, m);
        combined.unsat = self.unsat || set.unsat;
        for e in self.equalities.iter().chain(set.equalities.iter()) {
            combined.add_equality(e.clone());
        }
        for e in self.inequalities.iter().chain(set.inequalities.iter()) {
            combined.add_inequality(e.clone());
        }

        let mut map = SubstitutionMap::new();
        for p in 0..m {
            match combined.find_function(p, &|q| q >= m) {
                Some(sol) => map.insert(TermKind::tuple_var(p), sol),
                None => {
                    return Err(PolyError::NotComposable(format!(
                        "input tuple position {} has no solved form",
                        p
                    )))
                }
            }
        }
        let substituted = combined.substitute(&map);

        let old_to_new: Vec<i64> = (0..m + n)
            .map(|p| if p < m { -1 } else { (p - m) as i64 })
            .collect();
        let final_decl = substituted.tuple_decl.drop_range(0, m);
        Ok(substituted.drop_and_remap(&old_to_new, final_decl, 0))
    }

    /// Swap the input and output tuple ranges. Constraints only need their
    /// tuple positions renumbered; equalities and inequalities are
    /// symmetric in variable identity.
    pub fn inverse(&self) -> Conjunction {
        let in_a = self.in_arity;
        let out_a = self.out_arity();
        let old_to_new: Vec<i64> = (0..self.arity())
            .map(|p| {
                if p < in_a {
                    (p + out_a) as i64
                } else {
                    (p - in_a) as i64
                }
            })
            .collect();
        let mut decl = TupleDecl::empty();
        for p in in_a..self.arity() {
            match self.tuple_decl.elem_const_val(p) {
                Some(v) => decl.append_const(v),
                None => decl.append_var(self.tuple_decl.elem_var_string(p)),
            }
        }
        for p in 0..in_a {
            match self.tuple_decl.elem_const_val(p) {
                Some(v) => decl.append_const(v),
                None => decl.append_var(self.tuple_decl.elem_var_string(p)),
            }
        }
        self.drop_and_remap(&old_to_new, decl, out_a)
    }

    /// Treat this conjunction as a domain/range definition and produce the
    /// constraints that hold when the given expression tuple is one of its
    /// points. The result is a conjunction over `target_decl` whose
    /// constraints mention only the variables appearing in `tuple_exp`.
    pub fn bound_tuple_exp(
        &self,
        tuple_exp: &TupleExp,
        target_decl: &TupleDecl,
    ) -> PolyResult<Conjunction> {
        if tuple_exp.size() != self.arity() {
            return Err(PolyError::ArityMismatch {
                operation: "bound_tuple_exp",
                lhs: self.arity().to_string(),
                rhs: tuple_exp.size().to_string(),
            });
        }
        let mut map = SubstitutionMap::new();
        for i in 0..self.arity() {
            map.insert(TermKind::tuple_var(i), tuple_exp.elem(i).clone());
        }
        let mut out = Conjunction::new(target_decl.clone());
        out.unsat = self.unsat;
        for e in &self.equalities {
            out.add_equality(e.substitute(&map));
        }
        for e in &self.inequalities {
            out.add_inequality(e.substitute(&map));
        }
        // A constant declaration slot pins the corresponding component.
        for i in 0..self.arity() {
            if let Some(v) = self.tuple_decl.elem_const_val(i) {
                let mut eq = tuple_exp.elem(i).clone();
                eq.add_exp(&Exp::constant(-v));
                out.add_equality(eq);
            }
        }
        Ok(out)
    }

    /// Render the constraint list (without the tuple header).
    pub(crate) fn constraints_string(&self) -> String {
        if self.unsat {
            return "FALSE".to_string();
        }
        let mut parts: Vec<String> = Vec::new();
        for e in &self.equalities {
            parts.push(format!("{} = 0", e.display_with(&self.tuple_decl)));
        }
        for e in &self.inequalities {
            parts.push(format!("{} >= 0", e.display_with(&self.tuple_decl)));
        }
        parts.join(" && ")
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = if self.in_arity > 0 {
            self.tuple_decl.to_string_with_arrow(Some(self.in_arity))
        } else {
            self.tuple_decl.to_string_with_arrow(None)
        };
        let body = self.constraints_string();
        if body.is_empty() {
            write!(f, "{{ {} }}", header)
        } else {
            write!(f, "{{ {} : {} }}", header, body)
        }
    }
}
