//! Small-range point enumeration.
//!
//! Exhaustively enumerates integer tuples over a box and evaluates
//! constraints on each, with concrete parameter values and concrete
//! interpretations for the UF symbols. Used to validate that an affine
//! relaxation really contains every solution of the constraints it was
//! derived from.

use crate::algebra::exp::TermEval;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::Set;
use std::collections::BTreeMap;

/// Concrete bindings for one evaluation: a tuple point, parameter
/// values, and interpretations for the UF symbols.
pub struct PointBinding<'a> {
    point: &'a [i64],
    params: &'a BTreeMap<String, i64>,
    funcs: &'a BTreeMap<String, Box<dyn Fn(&[i64]) -> Vec<i64>>>,
}

impl TermEval for PointBinding<'_> {
    fn tuple_value(&self, loc: usize) -> i64 {
        self.point[loc]
    }

    fn var_value(&self, name: &str) -> i64 {
        *self.params.get(name).unwrap_or(&0)
    }

    fn uf_value(&self, name: &str, args: &[i64], index: Option<usize>) -> i64 {
        let f = self
            .funcs
            .get(name)
            .unwrap_or_else(|| panic!("no interpretation for `{}`", name));
        f(args)[index.unwrap_or(0)]
    }
}

/// Whether the point satisfies every constraint of the conjunction.
pub fn satisfies(
    conj: &Conjunction,
    point: &[i64],
    params: &BTreeMap<String, i64>,
    funcs: &BTreeMap<String, Box<dyn Fn(&[i64]) -> Vec<i64>>>,
) -> bool {
    if !conj.satisfiable() {
        return false;
    }
    for pos in 0..conj.arity() {
        if let Some(v) = conj.tuple_decl().elem_const_val(pos) {
            if point[pos] != v {
                return false;
            }
        }
    }
    let binding = PointBinding { point, params, funcs };
    conj.equalities().iter().all(|e| e.evaluate(&binding) == 0)
        && conj.inequalities().iter().all(|e| e.evaluate(&binding) >= 0)
}

/// Whether the point lies in the set: any conjunction accepts it.
pub fn set_contains(
    set: &Set,
    point: &[i64],
    params: &BTreeMap<String, i64>,
    funcs: &BTreeMap<String, Box<dyn Fn(&[i64]) -> Vec<i64>>>,
) -> bool {
    set.conjunctions()
        .iter()
        .any(|c| satisfies(c, point, params, funcs))
}

/// Every tuple in the box `[lo, hi]^arity` satisfying `conj` also lies
/// in `superset`. Returns the first counterexample point otherwise.
pub fn check_superset(
    conj: &Conjunction,
    superset: &Set,
    lo: i64,
    hi: i64,
    params: &BTreeMap<String, i64>,
    funcs: &BTreeMap<String, Box<dyn Fn(&[i64]) -> Vec<i64>>>,
) -> Result<(), Vec<i64>> {
    let arity = conj.arity();
    let mut point = vec![lo; arity];
    loop {
        if satisfies(conj, &point, params, funcs)
            && !set_contains(superset, &point, params, funcs)
        {
            return Err(point);
        }
        // odometer advance
        let mut pos = 0;
        loop {
            if pos == arity {
                return Ok(());
            }
            point[pos] += 1;
            if point[pos] <= hi {
                break;
            }
            point[pos] = lo;
            pos += 1;
        }
    }
}
