//! Dependence-relation comparison.
//!
//! Canonicalizes two relations through the normalize pipeline and
//! compares them structurally, ignoring superficial tuple-variable
//! naming. The decision procedure is deliberately partial: anything it
//! cannot prove equal is `Unknown`, never a subset/superset verdict.

use crate::algebra::tuple_decl::TupleDecl;
use crate::backend::AffineBackend;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::{Relation, Set};
use crate::env::Environment;
use crate::utils::errors::PolyResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a relation comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetRelationship {
    /// Both describe the same integer tuples.
    SetEqual,
    /// Equality could not be proven.
    Unknown,
}

impl fmt::Display for SetRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetRelationship::SetEqual => write!(f, "equal"),
            SetRelationship::Unknown => write!(f, "unknown"),
        }
    }
}

/// Compare two dependence relations after canonicalization.
pub fn data_dependence_relationship(
    a: &Relation,
    b: &Relation,
    env: &Environment,
    backend: &dyn AffineBackend,
) -> PolyResult<SetRelationship> {
    if a.in_arity() != b.in_arity() || a.out_arity() != b.out_arity() {
        return Ok(SetRelationship::Unknown);
    }
    let mut a = a.clone();
    let mut b = b.clone();
    a.normalize(env, backend)?;
    b.normalize(env, backend)?;
    if anonymize_relation(&a)? == anonymize_relation(&b)? {
        Ok(SetRelationship::SetEqual)
    } else {
        Ok(SetRelationship::Unknown)
    }
}

/// Whether two sets describe the same tuples, after canonicalization.
pub fn set_equal(
    a: &Set,
    b: &Set,
    env: &Environment,
    backend: &dyn AffineBackend,
) -> PolyResult<bool> {
    if a.arity() != b.arity() {
        return Ok(false);
    }
    let mut a = a.clone();
    let mut b = b.clone();
    a.normalize(env, backend)?;
    b.normalize(env, backend)?;
    Ok(anonymize_set(&a)? == anonymize_set(&b)?)
}

/// Rewrite a conjunction over default positional names, keeping
/// declared constants. Constraints reference positions, not names, so
/// only the declaration changes.
fn anonymize(conj: &Conjunction) -> Conjunction {
    let mut decl = TupleDecl::empty();
    for pos in 0..conj.arity() {
        match conj.tuple_decl().elem_const_val(pos) {
            Some(v) => decl.append_const(v),
            None => decl.append_var(format!("__tv{}", pos)),
        }
    }
    let mut out = Conjunction::with_in_arity(decl, conj.in_arity());
    for eq in conj.equalities() {
        out.add_equality(eq.clone());
    }
    for ineq in conj.inequalities() {
        out.add_inequality(ineq.clone());
    }
    out
}

fn anonymize_set(set: &Set) -> PolyResult<Set> {
    let mut out = Set::empty(set.arity());
    for c in set.conjunctions() {
        out.add_conjunction(anonymize(c))?;
    }
    out.clean_up();
    Ok(out)
}

fn anonymize_relation(rel: &Relation) -> PolyResult<Relation> {
    let mut out = Relation::empty(rel.in_arity(), rel.out_arity());
    for c in rel.conjunctions() {
        out.add_conjunction(anonymize(c))?;
    }
    out.clean_up();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeBackend;
    use crate::env::{Monotonicity, UninterpFunc};
    use crate::frontend::{parse_relation, parse_set};

    fn cholesky_env() -> Environment {
        let mut env = Environment::new();
        for name in ["rowptr", "diagptr"] {
            env.declare(UninterpFunc::new(
                name,
                parse_set("[m] -> { [x] : 0 <= x < m }").unwrap(),
                parse_set("[nnz] -> { [x] : 0 <= x < nnz }").unwrap(),
                false,
                Monotonicity::Nondecreasing,
            ))
            .unwrap();
        }
        env
    }

    #[test]
    fn test_renamed_relations_compare_equal() {
        let env = cholesky_env();
        let backend = NativeBackend::new();
        let a = parse_relation(
            "[n] -> { [i, k] -> [ip, kp] : kp = k && rowptr(i) <= k < diagptr(i) \
             && 0 <= i < n && 0 <= ip < n }",
        )
        .unwrap();
        // same constraints, different names and listing order
        let b = parse_relation(
            "[n] -> { [a, c] -> [b, d] : 0 <= b < n && 0 <= a < n \
             && rowptr(a) <= c < diagptr(a) && d = c }",
        )
        .unwrap();
        assert_eq!(
            data_dependence_relationship(&a, &b, &env, &backend).unwrap(),
            SetRelationship::SetEqual
        );
    }

    #[test]
    fn test_different_relations_unknown() {
        let env = cholesky_env();
        let backend = NativeBackend::new();
        let a = parse_relation("{ [i] -> [j] : j = i }").unwrap();
        let b = parse_relation("{ [i] -> [j] : j = i + 1 }").unwrap();
        assert_eq!(
            data_dependence_relationship(&a, &b, &env, &backend).unwrap(),
            SetRelationship::Unknown
        );
    }

    #[test]
    fn test_set_equal_ignores_names() {
        let env = cholesky_env();
        let backend = NativeBackend::new();
        let a = parse_set("[n] -> { [i] : 0 <= i < n }").unwrap();
        let b = parse_set("[n] -> { [q] : 0 <= q < n }").unwrap();
        assert!(set_equal(&a, &b, &env, &backend).unwrap());
    }

    #[test]
    fn test_arity_mismatch_is_unknown() {
        let env = cholesky_env();
        let backend = NativeBackend::new();
        let a = parse_relation("{ [i] -> [j] : j = i }").unwrap();
        let b = parse_relation("{ [i, k] -> [j] : j = i }").unwrap();
        assert_eq!(
            data_dependence_relationship(&a, &b, &env, &backend).unwrap(),
            SetRelationship::Unknown
        );
    }
}
