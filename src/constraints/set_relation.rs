//! Sets and relations: disjunctions of conjunctions with arity bookkeeping.
//!
//! A `SparseConstraints` value is an OR of conjunctions in disjunctive
//! normal form. Zero conjunctions denotes FALSE; a single conjunction with
//! no constraints denotes the universal set of that arity; the two are
//! distinct states. `Set` carries one arity; `Relation` splits its tuple
//! into input and output ranges.

use crate::constraints::conjunction::Conjunction;
use crate::utils::errors::{PolyError, PolyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The shared DNF container: a sorted, deduplicated list of conjunctions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseConstraints {
    conjunctions: Vec<Conjunction>,
}

impl SparseConstraints {
    /// The FALSE container (no conjunctions).
    pub fn empty() -> Self {
        Self::default()
    }

    /// The conjunctions, in canonical order.
    pub fn conjunctions(&self) -> &[Conjunction] {
        &self.conjunctions
    }

    /// Whether there are no conjunctions (FALSE).
    pub fn is_false(&self) -> bool {
        self.conjunctions.is_empty()
    }

    /// Insert a conjunction, keeping the list sorted and deduplicated.
    /// A lone universal conjunction (the fresh-universe sentinel) is
    /// replaced by the first real conjunction added.
    pub fn add_conjunction(&mut self, c: Conjunction) {
        if self.conjunctions.len() == 1 && self.conjunctions[0].is_universal() && !c.is_universal()
        {
            self.conjunctions.clear();
        }
        if let Err(at) = self.conjunctions.binary_search(&c) {
            self.conjunctions.insert(at, c);
        }
    }

    /// Remove unsatisfiable conjunctions (shallow check) and re-sort.
    pub fn clean_up(&mut self) {
        self.conjunctions.retain(|c| c.satisfiable());
        self.conjunctions.sort();
        self.conjunctions.dedup();
    }

    fn params(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for c in &self.conjunctions {
            for e in c.equalities().iter().chain(c.inequalities().iter()) {
                e.collect_var_names(&mut names);
            }
        }
        names
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, arity: usize, split: Option<usize>) -> fmt::Result {
        let params = self.params();
        if !params.is_empty() {
            let names: Vec<String> = params.into_iter().collect();
            write!(f, "[{}] -> ", names.join(", "))?;
        }
        if self.conjunctions.is_empty() {
            let decl = crate::algebra::tuple_decl::TupleDecl::with_size(arity);
            return write!(f, "{{ {} : FALSE }}", decl.to_string_with_arrow(split));
        }
        for (i, c) in self.conjunctions.iter().enumerate() {
            if i > 0 {
                write!(f, " union ")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// An integer tuple set: a DNF of conjunctions sharing one arity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    arity: usize,
    parts: SparseConstraints,
}

impl Set {
    /// The universal set of the given arity: one unconstrained conjunction.
    pub fn universe(arity: usize) -> Self {
        let mut parts = SparseConstraints::empty();
        parts.add_conjunction(Conjunction::new(
            crate::algebra::tuple_decl::TupleDecl::with_size(arity),
        ));
        Self { arity, parts }
    }

    /// The universal set over an explicit tuple declaration.
    pub fn universe_over(decl: crate::algebra::tuple_decl::TupleDecl) -> Self {
        let arity = decl.size();
        let mut parts = SparseConstraints::empty();
        parts.add_conjunction(Conjunction::new(decl));
        Self { arity, parts }
    }

    /// The empty (unsatisfiable) set of the given arity.
    pub fn empty(arity: usize) -> Self {
        Self {
            arity,
            parts: SparseConstraints::empty(),
        }
    }

    /// A set holding one conjunction.
    pub fn from_conjunction(c: Conjunction) -> Self {
        assert_eq!(c.in_arity(), 0, "set conjunctions have no input arity");
        let arity = c.arity();
        let mut parts = SparseConstraints::empty();
        parts.add_conjunction(c);
        Self { arity, parts }
    }

    /// Parse a set from the textual grammar.
    pub fn from_string(input: &str) -> PolyResult<Self> {
        crate::frontend::parse_set(input)
    }

    /// Tuple arity.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The conjunctions of this set.
    pub fn conjunctions(&self) -> &[Conjunction] {
        self.parts.conjunctions()
    }

    /// Whether this is the FALSE set (no conjunctions).
    pub fn is_false(&self) -> bool {
        self.parts.is_false()
    }

    /// Add a conjunction. Fails if its arity disagrees with the set's.
    pub fn add_conjunction(&mut self, c: Conjunction) -> PolyResult<()> {
        if c.arity() != self.arity {
            return Err(PolyError::ArityMismatch {
                operation: "add_conjunction",
                lhs: self.arity.to_string(),
                rhs: c.arity().to_string(),
            });
        }
        self.parts.add_conjunction(c);
        Ok(())
    }

    /// Union: concatenate conjunction lists.
    pub fn union(&self, other: &Set) -> PolyResult<Set> {
        if self.arity != other.arity {
            return Err(PolyError::ArityMismatch {
                operation: "union",
                lhs: self.arity.to_string(),
                rhs: other.arity.to_string(),
            });
        }
        let mut out = Set::empty(self.arity);
        for c in self.conjunctions().iter().chain(other.conjunctions()) {
            out.parts.add_conjunction(c.clone());
        }
        Ok(out)
    }

    /// Intersection: the pairwise cross product of conjunctions. The
    /// worst-case quadratic blow-up is expected and accepted.
    pub fn intersect(&self, other: &Set) -> PolyResult<Set> {
        if self.arity != other.arity {
            return Err(PolyError::ArityMismatch {
                operation: "intersect",
                lhs: self.arity.to_string(),
                rhs: other.arity.to_string(),
            });
        }
        let mut out = Set::empty(self.arity);
        for a in self.conjunctions() {
            for b in other.conjunctions() {
                out.parts.add_conjunction(a.intersect(b)?);
            }
        }
        out.clean_up();
        Ok(out)
    }

    /// Remove unsatisfiable conjunctions and restore canonical order.
    pub fn clean_up(&mut self) {
        self.parts.clean_up();
    }

    /// Canonicalize via the normalize pipeline. Currently restricted to
    /// sets holding exactly one conjunction; anything else is an
    /// `UnsupportedConstruct`.
    pub fn normalize(
        &mut self,
        env: &crate::env::Environment,
        backend: &dyn crate::backend::AffineBackend,
    ) -> PolyResult<()> {
        if self.conjunctions().len() != 1 {
            return Err(PolyError::UnsupportedConstruct(format!(
                "normalize requires exactly one conjunction, found {}",
                self.conjunctions().len()
            )));
        }
        let normalized =
            crate::constraints::normalize::normalize_conjunction(&self.conjunctions()[0], env, backend)?;
        *self = normalized;
        Ok(())
    }

    /// Apply the environment's monotonicity inference rules, adding the
    /// derived ordering constraints to each conjunction.
    pub fn apply_monotonicity(&self, env: &crate::env::Environment) -> Set {
        let mut out = Set::empty(self.arity);
        for c in self.conjunctions() {
            out.parts.add_conjunction(env.apply_rules(c));
        }
        out
    }

    /// Render in ISL syntax (`and` for conjunction).
    pub fn to_isl_string(&self) -> String {
        self.to_string().replace(" && ", " and ")
    }

    /// Render in Omega syntax, replacing UF calls with symbolic constants
    /// memoized in the rewriter's dictionary.
    pub fn to_omega_string(
        &self,
        rewriter: &mut crate::backend::OmegaRewriter,
    ) -> PolyResult<String> {
        rewriter.rewrite_set(self)
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.parts.render(f, self.arity, None)
    }
}

/// A relation: a DNF of conjunctions whose tuples split into input and
/// output ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    in_arity: usize,
    out_arity: usize,
    parts: SparseConstraints,
}

impl Relation {
    /// The universal relation of the given arities.
    pub fn universe(in_arity: usize, out_arity: usize) -> Self {
        let mut parts = SparseConstraints::empty();
        parts.add_conjunction(Conjunction::with_in_arity(
            crate::algebra::tuple_decl::TupleDecl::with_size(in_arity + out_arity),
            in_arity,
        ));
        Self {
            in_arity,
            out_arity,
            parts,
        }
    }

    /// The empty relation of the given arities.
    pub fn empty(in_arity: usize, out_arity: usize) -> Self {
        Self {
            in_arity,
            out_arity,
            parts: SparseConstraints::empty(),
        }
    }

    /// A relation holding one conjunction.
    pub fn from_conjunction(c: Conjunction) -> Self {
        let in_arity = c.in_arity();
        let out_arity = c.out_arity();
        let mut parts = SparseConstraints::empty();
        parts.add_conjunction(c);
        Self {
            in_arity,
            out_arity,
            parts,
        }
    }

    /// Parse a relation from the textual grammar.
    pub fn from_string(input: &str) -> PolyResult<Self> {
        crate::frontend::parse_relation(input)
    }

    /// Input arity.
    pub fn in_arity(&self) -> usize {
        self.in_arity
    }

    /// Output arity.
    pub fn out_arity(&self) -> usize {
        self.out_arity
    }

    /// Total tuple arity.
    pub fn arity(&self) -> usize {
        self.in_arity + self.out_arity
    }

    /// The conjunctions of this relation.
    pub fn conjunctions(&self) -> &[Conjunction] {
        self.parts.conjunctions()
    }

    /// Whether this is the FALSE relation.
    pub fn is_false(&self) -> bool {
        self.parts.is_false()
    }

    /// Add a conjunction. Fails unless both the total arity and the
    /// input/output split agree.
    pub fn add_conjunction(&mut self, c: Conjunction) -> PolyResult<()> {
        if c.arity() != self.arity() || c.in_arity() != self.in_arity {
            return Err(PolyError::ArityMismatch {
                operation: "add_conjunction",
                lhs: format!("{} -> {}", self.in_arity, self.out_arity),
                rhs: format!("{} -> {}", c.in_arity(), c.out_arity()),
            });
        }
        self.parts.add_conjunction(c);
        Ok(())
    }

    /// Union: concatenate conjunction lists.
    pub fn union(&self, other: &Relation) -> PolyResult<Relation> {
        if self.in_arity != other.in_arity || self.out_arity != other.out_arity {
            return Err(PolyError::ArityMismatch {
                operation: "union",
                lhs: format!("{} -> {}", self.in_arity, self.out_arity),
                rhs: format!("{} -> {}", other.in_arity, other.out_arity),
            });
        }
        let mut out = Relation::empty(self.in_arity, self.out_arity);
        for c in self.conjunctions().iter().chain(other.conjunctions()) {
            out.parts.add_conjunction(c.clone());
        }
        Ok(out)
    }

    /// Intersection: pairwise cross product.
    pub fn intersect(&self, other: &Relation) -> PolyResult<Relation> {
        if self.in_arity != other.in_arity || self.out_arity != other.out_arity {
            return Err(PolyError::ArityMismatch {
                operation: "intersect",
                lhs: format!("{} -> {}", self.in_arity, self.out_arity),
                rhs: format!("{} -> {}", other.in_arity, other.out_arity),
            });
        }
        let mut out = Relation::empty(self.in_arity, self.out_arity);
        for a in self.conjunctions() {
            for b in other.conjunctions() {
                out.parts.add_conjunction(a.intersect(b)?);
            }
        }
        out.clean_up();
        Ok(out)
    }

    /// Swap the input and output tuples.
    pub fn inverse(&self) -> Relation {
        let mut out = Relation::empty(self.out_arity, self.in_arity);
        for c in self.conjunctions() {
            out.parts.add_conjunction(c.inverse());
        }
        out
    }

    /// Compose `self` after `rhs`, pairwise over conjunctions.
    pub fn compose(&self, rhs: &Relation) -> PolyResult<Relation> {
        if self.in_arity != rhs.out_arity {
            return Err(PolyError::ArityMismatch {
                operation: "compose",
                lhs: format!("{} -> {}", self.in_arity, self.out_arity),
                rhs: format!("{} -> {}", rhs.in_arity, rhs.out_arity),
            });
        }
        let mut out = Relation::empty(rhs.in_arity, self.out_arity);
        for a in self.conjunctions() {
            for b in rhs.conjunctions() {
                out.parts.add_conjunction(a.compose(b)?);
            }
        }
        out.clean_up();
        Ok(out)
    }

    /// Apply this relation to a set, producing the image set.
    pub fn apply(&self, set: &Set) -> PolyResult<Set> {
        if self.in_arity != set.arity() {
            return Err(PolyError::ArityMismatch {
                operation: "apply",
                lhs: format!("{} -> {}", self.in_arity, self.out_arity),
                rhs: set.arity().to_string(),
            });
        }
        let mut out = Set::empty(self.out_arity);
        for a in self.conjunctions() {
            for b in set.conjunctions() {
                out.add_conjunction(a.apply(b)?)?;
            }
        }
        out.clean_up();
        Ok(out)
    }

    /// Whether every conjunction makes the outputs a function of the inputs.
    pub fn is_function(&self) -> bool {
        self.conjunctions().iter().all(|c| c.is_function(self.in_arity))
    }

    /// Remove unsatisfiable conjunctions and restore canonical order.
    pub fn clean_up(&mut self) {
        self.parts.clean_up();
    }

    /// Canonicalize via the normalize pipeline (single-conjunction
    /// restriction, as for sets).
    pub fn normalize(
        &mut self,
        env: &crate::env::Environment,
        backend: &dyn crate::backend::AffineBackend,
    ) -> PolyResult<()> {
        if self.conjunctions().len() != 1 {
            return Err(PolyError::UnsupportedConstruct(format!(
                "normalize requires exactly one conjunction, found {}",
                self.conjunctions().len()
            )));
        }
        let as_set =
            crate::constraints::normalize::normalize_conjunction(&self.conjunctions()[0], env, backend)?;
        let mut out = Relation::empty(self.in_arity, self.out_arity);
        for c in as_set.conjunctions() {
            // normalize preserves the original tuple and split
            let mut c = c.clone();
            c.in_arity = self.in_arity;
            out.parts.add_conjunction(c);
        }
        *self = out;
        Ok(())
    }

    /// Render in ISL syntax (`and` for conjunction).
    pub fn to_isl_string(&self) -> String {
        self.to_string().replace(" && ", " and ")
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.parts.render(f, self.arity(), Some(self.in_arity))
    }
}
