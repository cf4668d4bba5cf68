//! Partial-parallel complexity estimation.
//!
//! Estimates the asymptotic cost of the data-dependence checks an
//! inspector must perform at runtime. Tuple variables that are an
//! affine function of the others are projected away; each remaining
//! variable contributes the symbolic extent of its tightest upper
//! bound. A variable bounded by UF calls over another tuple variable
//! absorbs that variable's factor: iterating `(i, k)` with
//! `rowptr(i) <= k < rowptr(i + 1)` touches `nnz` pairs in total, not
//! `n * nnz`.

use crate::algebra::exp::Exp;
use crate::algebra::term::TermKind;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::Set;
use crate::env::Environment;
use crate::utils::errors::{PolyError, PolyResult};
use std::collections::{BTreeMap, BTreeSet};

/// Estimate inspector complexity for a dependence set, keeping the
/// `parallel` tuple positions. Returns a string like `O(n^1*nnz^1)`.
pub fn complexity(set: &Set, env: &Environment, parallel: &[usize]) -> PolyResult<String> {
    if set.conjunctions().len() != 1 {
        return Err(PolyError::UnsupportedConstruct(format!(
            "complexity estimation requires exactly one conjunction, found {}",
            set.conjunctions().len()
        )));
    }
    let conj = &set.conjunctions()[0];
    let arity = conj.arity();

    // Project away variables solvable from still-surviving ones,
    // highest position first. Parallel loop indices always survive.
    let mut projected = vec![false; arity];
    for pos in (0..arity).rev() {
        if parallel.contains(&pos) || conj.tuple_decl().elem_is_const(pos) {
            continue;
        }
        let survives = |q: usize| q != pos && !projected[q];
        if conj.find_function(pos, &survives).is_some() {
            projected[pos] = true;
        }
    }
    let kept: Vec<usize> = (0..arity)
        .filter(|&p| !projected[p] && !conj.tuple_decl().elem_is_const(p))
        .collect();

    // UF-bounded variables first: they fix their factor and absorb the
    // tuple variables appearing in the bounding call's arguments.
    let mut factors: BTreeMap<String, u32> = BTreeMap::new();
    let mut absorbed: BTreeSet<usize> = BTreeSet::new();
    let mut affine: Vec<usize> = Vec::new();
    for &pos in &kept {
        match uf_upper_bound(conj, pos) {
            Some((func, args)) => {
                let param = range_extent(env, &func)?;
                *factors.entry(param).or_insert(0) += 1;
                for a in &args {
                    let mut locs = BTreeSet::new();
                    a.collect_tuple_locs(&mut locs);
                    absorbed.extend(locs);
                }
            }
            None => affine.push(pos),
        }
    }
    for pos in affine {
        if absorbed.contains(&pos) {
            continue;
        }
        if let Some(param) = affine_upper_bound(conj, pos) {
            *factors.entry(param).or_insert(0) += 1;
        }
    }

    let rendered: Vec<String> = factors
        .iter()
        .map(|(name, exp)| format!("{}^{}", name, exp))
        .collect();
    if rendered.is_empty() {
        Ok("O(1)".into())
    } else {
        Ok(format!("O({})", rendered.join("*")))
    }
}

/// The UF call bounding `pos` from above, if any: an inequality where
/// `pos` carries a negative coefficient alongside a UF call term.
fn uf_upper_bound(conj: &Conjunction, pos: usize) -> Option<(String, Vec<Exp>)> {
    let key = TermKind::tuple_var(pos);
    for ineq in conj.inequalities() {
        let mut bounds_pos = false;
        let mut call = None;
        for t in ineq.terms() {
            if t.kind == key && t.coeff < 0 {
                bounds_pos = true;
            }
            if let TermKind::UfCall(c) = &t.kind {
                call = Some((c.name.clone(), c.args.clone()));
            }
        }
        if bounds_pos {
            if let Some(found) = call {
                return Some(found);
            }
        }
    }
    None
}

/// The symbolic parameter bounding `pos` from above, if any.
fn affine_upper_bound(conj: &Conjunction, pos: usize) -> Option<String> {
    let key = TermKind::tuple_var(pos);
    for ineq in conj.inequalities() {
        let bounds_pos = ineq.terms().iter().any(|t| t.kind == key && t.coeff < 0);
        if !bounds_pos {
            continue;
        }
        for t in ineq.terms() {
            if let TermKind::Var(name) = &t.kind {
                if t.coeff > 0 {
                    return Some(name.clone());
                }
            }
        }
    }
    None
}

/// The symbolic parameter spanning a function's range, taken from the
/// range's own upper-bound constraints.
fn range_extent(env: &Environment, func: &str) -> PolyResult<String> {
    let range = env.range_of(func)?;
    for c in range.conjunctions() {
        for ineq in c.inequalities() {
            for t in ineq.terms() {
                if let TermKind::Var(name) = &t.kind {
                    if t.coeff > 0 {
                        return Ok(name.clone());
                    }
                }
            }
        }
    }
    Err(PolyError::UnsupportedConstruct(format!(
        "range of `{}` has no symbolic extent",
        func
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Monotonicity, UninterpFunc};
    use crate::frontend::parse_set;

    fn interval(param: &str) -> Set {
        parse_set(&format!("[{p}] -> {{ [x] : 0 <= x < {p} }}", p = param)).unwrap()
    }

    fn sparse_env() -> Environment {
        let mut env = Environment::new();
        for name in ["rowptr", "diagptr"] {
            env.declare(UninterpFunc::new(
                name,
                interval("m"),
                interval("nnz"),
                false,
                Monotonicity::Nondecreasing,
            ))
            .unwrap();
        }
        env.declare(UninterpFunc::new(
            "colidx",
            interval("nnz"),
            interval("m"),
            false,
            Monotonicity::None,
        ))
        .unwrap();
        env
    }

    #[test]
    fn test_gauss_seidel_scenario() {
        let env = sparse_env();
        let set = parse_set(
            "[n] -> { [i, ip, k, kp] : i < ip && 0 <= i < n && 0 <= ip < n \
             && rowptr(i) <= k < diagptr(i) && rowptr(ip) <= kp < diagptr(ip) \
             && colidx(k) = colidx(kp) && k = kp }",
        )
        .unwrap();
        let estimate = complexity(&set, &env, &[0, 1]).unwrap();
        assert_eq!(estimate, "O(n^1*nnz^1)");
    }

    #[test]
    fn test_affine_only_counts_every_loop() {
        let env = sparse_env();
        let set = parse_set("[n] -> { [i, j] : 0 <= i < n && 0 <= j < n }").unwrap();
        assert_eq!(complexity(&set, &env, &[0]).unwrap(), "O(n^2)");
    }

    #[test]
    fn test_parallel_variable_never_projected() {
        let env = sparse_env();
        let set = parse_set("[n] -> { [i, j] : j = i && 0 <= i < n && 0 <= j < n }").unwrap();
        // j is solvable from i but belongs to the parallel indices
        assert_eq!(complexity(&set, &env, &[0, 1]).unwrap(), "O(n^2)");
        assert_eq!(complexity(&set, &env, &[0]).unwrap(), "O(n^1)");
    }

    #[test]
    fn test_union_rejected() {
        let env = sparse_env();
        let set = parse_set("{ [i] : i = 0 } union { [i] : i = 5 }").unwrap();
        assert!(complexity(&set, &env, &[]).is_err());
    }
}
