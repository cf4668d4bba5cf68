//! Built-in pure-Rust affine canonicalizer.
//!
//! Implements the subset of backend behavior the normalize pipeline
//! relies on, so canonicalization works with nothing installed:
//! complementary inequality pairs fold into equalities, equalities
//! substitute higher tuple positions into every other constraint,
//! trivial and duplicate constraints are dropped, and constant
//! infeasibility prunes the conjunction. Ordering is deterministic, so
//! differently-phrased but equivalent inputs print identically.

use super::AffineBackend;
use crate::algebra::exp::SubstitutionMap;
use crate::algebra::term::TermKind;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::Set;
use crate::utils::errors::BackendError;
use log::trace;

/// The default backend: no external processes, no exact projection, but
/// deterministic canonical output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    /// The backend is stateless; `new` exists for symmetry with the others.
    pub fn new() -> Self {
        Self
    }

    fn simplify(&self, conj: &Conjunction) -> Conjunction {
        // Fold e >= 0 plus -e >= 0 into e = 0.
        let mut stage = Conjunction::with_in_arity(conj.tuple_decl().clone(), conj.in_arity());
        for e in conj.equalities() {
            stage.add_equality(e.clone());
        }
        let ineqs = conj.inequalities();
        let mut folded = vec![false; ineqs.len()];
        for i in 0..ineqs.len() {
            if folded[i] {
                continue;
            }
            let negated = -ineqs[i].clone();
            if let Some(j) = ineqs
                .iter()
                .enumerate()
                .position(|(j, e)| j != i && !folded[j] && *e == negated)
            {
                folded[i] = true;
                folded[j] = true;
                stage.add_equality(ineqs[i].clone());
            }
        }

        // Gaussian-style pass: express each position, highest first, from
        // an equality over strictly lower positions; composing keeps
        // transitively-dependent solutions fully resolved.
        let mut solutions: Vec<(usize, crate::algebra::exp::Exp)> = Vec::new();
        let mut map = SubstitutionMap::new();
        for pos in (0..stage.arity()).rev() {
            if let Some(sol) = stage.find_function(pos, &|q| q < pos) {
                if stage.tuple_decl().elem_const_val(pos).is_some() {
                    continue;
                }
                let sol = sol.substitute(&map);
                map.insert_composing(TermKind::tuple_var(pos), sol.clone());
                solutions.push((pos, sol));
            }
        }

        let mut out = Conjunction::with_in_arity(stage.tuple_decl().clone(), stage.in_arity());
        for e in stage.equalities() {
            out.add_equality(e.substitute(&map));
        }
        for (i, e) in ineqs.iter().enumerate() {
            if !folded[i] {
                out.add_inequality(e.substitute(&map));
            }
        }
        // Re-state the defining equalities in solved form.
        for (pos, sol) in solutions {
            let mut eq = crate::algebra::exp::Exp::tuple_var(pos);
            eq.sub_exp(&sol);
            out.add_equality(eq);
        }
        out
    }
}

impl AffineBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn canonicalize(&self, input: &str) -> Result<String, BackendError> {
        let set = crate::frontend::parse_set(input)
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let mut out = Set::empty(set.arity());
        for c in set.conjunctions() {
            let simplified = self.simplify(c);
            trace!("native simplify: {} => {}", c, simplified);
            out.add_conjunction(simplified)
                .map_err(|e| BackendError::Malformed(e.to_string()))?;
        }
        out.clean_up();
        Ok(out.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(input: &str) -> String {
        NativeBackend::new().canonicalize(input).unwrap()
    }

    #[test]
    fn test_complementary_inequalities_become_equality() {
        let a = canon("{ [i, j] : j - i >= 0 && i - j >= 0 }");
        let b = canon("{ [i, j] : i - j = 0 }");
        assert_eq!(a, b);
        assert!(a.contains("= 0"));
    }

    #[test]
    fn test_equality_substitution_into_inequalities() {
        // j = i + 1 and j < n: the bound rewrites onto i
        let out = canon("{ [i, j] : j - i - 1 = 0 && n - j - 1 >= 0 }");
        assert!(out.contains("-i + n"), "substituted bound in: {}", out);
        // the defining equality survives
        assert!(out.contains("= 0"));
    }

    #[test]
    fn test_infeasible_conjunction_prunes_to_false() {
        let out = canon("{ [i] : i - 3 = 0 && i - 5 = 0 }");
        assert!(out.contains("FALSE"), "expected FALSE, got: {}", out);
    }

    #[test]
    fn test_duplicate_and_trivial_constraints_removed() {
        let out = canon("{ [i] : i >= 0 && i >= 0 && 1 >= 0 }");
        assert_eq!(out, "{ [i] : i >= 0 }");
    }

    #[test]
    fn test_output_is_stable_under_constraint_reordering() {
        let a = canon("{ [i, j] : i >= 0 && n - j - 1 >= 0 && j - i = 0 }");
        let b = canon("{ [i, j] : j - i = 0 && n - j - 1 >= 0 && i >= 0 }");
        assert_eq!(a, b);
    }

    #[test]
    fn test_idempotent() {
        let once = canon("{ [i, j] : j - i - 1 = 0 && n - j - 1 >= 0 && i >= 0 }");
        let twice = canon(&once);
        assert_eq!(once, twice);
    }
}
