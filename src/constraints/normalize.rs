//! The canonicalization pipeline.
//!
//! A conjunction whose constraints mention UF calls is rewritten into a
//! purely affine superset (each call becomes a fresh temporary tuple
//! variable bounded by the call's declared domain and range), handed to
//! an affine backend for simplification, and then rewritten back: each
//! temporary is replaced by the call it stood for. The result is
//! semantically equivalent to the input, in a canonical form suitable
//! for structural equality testing.
//!
//! Pipeline order is fixed: group indexed components, promote calls to
//! temporaries, backend round trip, reverse substitution, wrap in a Set.

use crate::algebra::exp::{Exp, SubstitutionMap};
use crate::algebra::term::{Term, TermKind, TupleExp, UfCall};
use crate::algebra::tuple_decl::TupleDecl;
use crate::backend::AffineBackend;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::Set;
use crate::constraints::ufc_bounds::UfMapAndBounds;
use crate::env::Environment;
use crate::utils::errors::PolyResult;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize one conjunction. The result preserves the input's tuple
/// declaration; its conjunctions carry no input/output split (callers
/// working with relations restore the split themselves).
pub fn normalize_conjunction(
    conj: &Conjunction,
    env: &Environment,
    backend: &dyn AffineBackend,
) -> PolyResult<Set> {
    let original_decl = conj.tuple_decl().clone();
    debug!("normalize: input {}", conj);

    let grouped = group_indexed_ufc_components(conj, env);
    let (superset, bounds) = ufc_to_temp_vars(&grouped, env)?;
    debug!("normalize: affine superset {}", superset);

    let canonical = backend.canonicalize(&superset.to_string())?;
    trace!("normalize: backend returned {}", canonical);
    let parsed = crate::frontend::parse_set(&canonical)?;

    let initial = bounds.initial_arity();
    let total = bounds.tuple_decl().size();
    let mut out = Set::empty(original_decl.size());
    for rc in parsed.conjunctions() {
        let rc = align_tuple_decl(rc, bounds.tuple_decl());

        // Affine solutions for the temporaries, highest first; composing
        // later entries in resolves transitive temp-on-temp dependence.
        let mut affine = SubstitutionMap::new();
        for pos in (initial..total.min(rc.arity())).rev() {
            if let Some(sol) = rc.find_function(pos, &|q| q < pos) {
                affine.insert_composing(TermKind::tuple_var(pos), sol);
            }
        }

        // Each temporary goes back to its call, the call arguments run
        // through the affine map and through already-restored entries.
        let mut reverse = SubstitutionMap::new();
        for pos in (initial..total).rev() {
            let stored = bounds.uf_call(pos);
            let args: Vec<Exp> = stored
                .args
                .iter()
                .map(|a| a.substitute(&affine).substitute(&reverse))
                .collect();
            let call = UfCall {
                name: stored.name.clone(),
                args,
                tuple_index: stored.tuple_index,
            };
            reverse.insert_composing(
                TermKind::tuple_var(pos),
                Exp::single(Term::uf_call(1, call)),
            );
        }
        let substituted = rc.substitute(&reverse);

        // Truncate back to the original tuple. Constraints that still
        // reference a temporary had no resolvable form and are discarded
        // by drop_and_remap (a documented limitation, not an error).
        let old_to_new: Vec<i64> = (0..substituted.arity())
            .map(|p| if p < initial { p as i64 } else { -1 })
            .collect();
        let restored = substituted.drop_and_remap(&old_to_new, original_decl.clone(), 0);
        out.add_conjunction(restored)?;
    }
    out.clean_up();
    debug!("normalize: result {}", out);
    Ok(out)
}

/// Step 1: merge complete `tv = f(args)[k]` component families into one
/// tuple-expression equality `(tv_0, ..., tv_n) = f(args)`. A family is
/// complete when every component of the function's declared range arity
/// appears; partial families are left untouched.
pub(crate) fn group_indexed_ufc_components(conj: &Conjunction, env: &Environment) -> Conjunction {
    struct Family {
        call: UfCall,
        // component index -> the tuple position equated to it
        members: BTreeMap<usize, usize>,
        eq_indices: Vec<usize>,
    }

    let mut families: BTreeMap<String, Family> = BTreeMap::new();
    for (i, eq) in conj.equalities().iter().enumerate() {
        if let Some((loc, call)) = match_component_equality(eq) {
            let fam = families.entry(call.base_key()).or_insert_with(|| Family {
                call: call.without_index(),
                members: BTreeMap::new(),
                eq_indices: Vec::new(),
            });
            // duplicate component index: not a mergeable family
            if fam
                .members
                .insert(call.tuple_index.unwrap_or(0), loc)
                .is_some()
            {
                fam.members.clear();
            }
            fam.eq_indices.push(i);
        }
    }

    let mut merged_away: BTreeSet<usize> = BTreeSet::new();
    let mut merged: Vec<Exp> = Vec::new();
    for fam in families.values() {
        let out_arity = match env.lookup(&fam.call.name) {
            Ok(f) => f.out_arity(),
            Err(_) => continue,
        };
        if out_arity < 2 || fam.members.len() != out_arity {
            continue;
        }
        if (0..out_arity).any(|k| !fam.members.contains_key(&k)) {
            continue;
        }
        let elems: Vec<Exp> = (0..out_arity)
            .map(|k| Exp::tuple_var(fam.members[&k]))
            .collect();
        let mut eq = Exp::single(Term::tuple_exp(1, TupleExp::new(elems)));
        eq.add_term(Term::uf_call(-1, fam.call.clone()));
        merged.push(eq);
        merged_away.extend(fam.eq_indices.iter().copied());
    }
    if merged.is_empty() {
        return conj.clone();
    }

    let mut out = Conjunction::with_in_arity(conj.tuple_decl().clone(), conj.in_arity());
    for (i, eq) in conj.equalities().iter().enumerate() {
        if !merged_away.contains(&i) {
            out.add_equality(eq.clone());
        }
    }
    for eq in merged {
        out.add_equality(eq);
    }
    for ineq in conj.inequalities() {
        out.add_inequality(ineq.clone());
    }
    out
}

/// Match an equality of the shape `tv - f(args)[k] = 0` (either sign).
fn match_component_equality(eq: &Exp) -> Option<(usize, &UfCall)> {
    let [a, b] = eq.terms() else {
        return None;
    };
    let (tv, cal) = match (&a.kind, &b.kind) {
        (TermKind::TupleVar { loc, sub: None }, TermKind::UfCall(c)) => ((*loc, a.coeff), (c, b.coeff)),
        (TermKind::UfCall(c), TermKind::TupleVar { loc, sub: None }) => ((*loc, b.coeff), (c, a.coeff)),
        _ => return None,
    };
    let ((loc, tv_coeff), (call, call_coeff)) = (tv, cal);
    if call.tuple_index.is_none() || tv_coeff + call_coeff != 0 || tv_coeff.abs() != 1 {
        return None;
    }
    Some((loc, call))
}

/// Step 2: replace every UF call (innermost first, deduplicated by
/// printed form) with temporary tuple variables, and intersect the
/// rewritten constraints with the accumulated domain/range bounds. The
/// result is an affine superset of the input.
pub fn ufc_to_temp_vars(
    conj: &Conjunction,
    env: &Environment,
) -> PolyResult<(Set, UfMapAndBounds)> {
    let mut bounds = UfMapAndBounds::new(conj.tuple_decl().clone());
    let mut map = SubstitutionMap::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    let mut calls: Vec<UfCall> = Vec::new();
    for e in conj.equalities().iter().chain(conj.inequalities()) {
        e.collect_uf_calls(&mut calls);
    }

    for call in &calls {
        // arguments of outer calls may themselves contain already-promoted
        // inner calls; rewrite them first so identity is post-promotion
        let args: Vec<Exp> = call.args.iter().map(|a| a.substitute(&map)).collect();
        let base = UfCall::new(call.name.clone(), args);
        if !seen.insert(base.to_string()) {
            continue;
        }
        bounds.bound_by_domain(&base, env)?;
        let temps = bounds.bound_by_range(&base, env)?;
        if temps.size() == 1 {
            // a scalar range makes f(e)[0] the same value as f(e); register
            // both spellings so neither survives the rewrite
            map.insert(
                TermKind::UfCall(UfCall::indexed(base.name.clone(), base.args.clone(), 0)),
                temps.elem(0).clone(),
            );
            map.insert(TermKind::UfCall(base.clone()), temps.elem(0).clone());
        } else {
            for k in 0..temps.size() {
                map.insert(
                    TermKind::UfCall(UfCall::indexed(base.name.clone(), base.args.clone(), k)),
                    temps.elem(k).clone(),
                );
            }
            map.insert(
                TermKind::UfCall(base),
                Exp::single(Term::tuple_exp(1, temps)),
            );
        }
    }

    let mut rewritten = Conjunction::new(bounds.tuple_decl().clone());
    for e in conj.equalities() {
        for component in expand_tuple_equality(e.substitute(&map)) {
            rewritten.add_equality(component);
        }
    }
    for e in conj.inequalities() {
        rewritten.add_inequality(e.substitute(&map));
    }

    let superset = Set::from_conjunction(rewritten).intersect(&bounds.clone_constraints())?;
    Ok((superset, bounds))
}

/// Split an equality between two tuple expressions into its componentwise
/// scalar equalities. Anything else passes through unchanged.
fn expand_tuple_equality(eq: Exp) -> Vec<Exp> {
    if let [a, b] = eq.terms() {
        if let (TermKind::TupleExp(ta), TermKind::TupleExp(tb)) = (&a.kind, &b.kind) {
            if a.coeff + b.coeff == 0 && a.coeff.abs() == 1 && ta.size() == tb.size() {
                return (0..ta.size())
                    .map(|i| {
                        let mut c = ta.elem(i).clone();
                        c.sub_exp(tb.elem(i));
                        c
                    })
                    .collect();
            }
        }
    }
    vec![eq]
}

/// Step 4 helper: line a backend-result conjunction up with the expected
/// declaration. The backend may echo tuple-variable names in a different
/// order (or keep them); positions are matched by name, falling back to
/// identity for names the expected declaration does not know.
pub fn align_tuple_decl(conj: &Conjunction, expected: &TupleDecl) -> Conjunction {
    if conj.tuple_decl() == expected {
        return conj.clone();
    }
    let mut old_to_new: Vec<i64> = Vec::with_capacity(conj.arity());
    let mut moved = false;
    for pos in 0..conj.arity() {
        let target = if conj.tuple_decl().elem_is_const(pos) {
            None
        } else {
            expected.position_of(&conj.tuple_decl().elem_var_string(pos))
        };
        match target {
            Some(t) => {
                if t != pos {
                    moved = true;
                }
                old_to_new.push(t as i64);
            }
            None => old_to_new.push(pos as i64),
        }
    }
    if !moved && conj.arity() == expected.size() {
        // same positions, only names differ: adopt the expected names
        let mut out = Conjunction::with_in_arity(expected.clone(), conj.in_arity());
        for e in conj.equalities() {
            out.add_equality(e.clone());
        }
        for e in conj.inequalities() {
            out.add_inequality(e.clone());
        }
        return out;
    }
    conj.drop_and_remap(&old_to_new, expected.clone(), conj.in_arity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NativeBackend;
    use crate::env::{Monotonicity, UninterpFunc};

    fn interval(param: &str) -> Set {
        let mut c = Conjunction::new(TupleDecl::from_names(["x"]));
        c.add_inequality(Exp::tuple_var(0));
        c.add_inequality(Exp::from_terms(vec![
            Term::var(1, param),
            Term::tuple_var(-1, 0),
            Term::constant(-1),
        ]));
        Set::from_conjunction(c)
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
    fn test_ufc_to_temp_vars_produces_affine_superset() {
        let env = sparse_env();
        // { [i, k] : k - rowptr(i) >= 0 }
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        c.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, UfCall::new("rowptr", vec![Exp::tuple_var(0)])),
        ]));
        let (superset, bounds) = ufc_to_temp_vars(&c, &env).unwrap();
        assert_eq!(bounds.num_temp_vars(), 1);
        assert_eq!(superset.arity(), 3);
        assert!(!superset.conjunctions()[0].contains_uf_call());
        // k - __tv2 >= 0 plus domain (0 <= i < m) and range (0 <= __tv2 < nnz)
        assert_eq!(superset.conjunctions()[0].inequalities().len(), 5);
    }

    #[test]
    fn test_identical_calls_share_one_temp() {
        let env = sparse_env();
        // rowptr(i) appears twice; one temporary serves both
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        let call = UfCall::new("rowptr", vec![Exp::tuple_var(0)]);
        c.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, call.clone()),
        ]));
        c.add_inequality(Exp::from_terms(vec![
            Term::uf_call(1, call),
            Term::constant(5),
        ]));
        let (_, bounds) = ufc_to_temp_vars(&c, &env).unwrap();
        assert_eq!(bounds.num_temp_vars(), 1);
    }

    #[test]
    fn test_scalar_indexed_spelling_shares_temp() {
        let env = sparse_env();
        // rowptr(i)[0] is the same scalar value as rowptr(i); both
        // spellings must promote to the one temporary
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        c.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, UfCall::new("rowptr", vec![Exp::tuple_var(0)])),
        ]));
        c.add_inequality(Exp::from_terms(vec![
            Term::uf_call(1, UfCall::indexed("rowptr", vec![Exp::tuple_var(0)], 0)),
            Term::tuple_var(-1, 1),
        ]));
        let (superset, bounds) = ufc_to_temp_vars(&c, &env).unwrap();
        assert_eq!(bounds.num_temp_vars(), 1);
        assert!(!superset.conjunctions()[0].contains_uf_call());
    }

    #[test]
    fn test_nested_calls_promoted_innermost_first() {
        let env = sparse_env();
        // colidx(rowptr(i)) needs two temps; the outer call's argument is
        // rewritten to the inner call's temp before bounding
        let inner = UfCall::new("rowptr", vec![Exp::tuple_var(0)]);
        let outer = UfCall::new("colidx", vec![Exp::single(Term::uf_call(1, inner))]);
        let mut c = Conjunction::new(TupleDecl::from_names(["i"]));
        c.add_inequality(Exp::single(Term::uf_call(1, outer)));
        let (superset, bounds) = ufc_to_temp_vars(&c, &env).unwrap();
        assert_eq!(bounds.num_temp_vars(), 2);
        // the recorded outer call's argument is the inner temp, not the call
        assert!(!format!("{}", bounds.uf_call(2)).contains("rowptr"));
        assert!(!superset.conjunctions()[0].contains_uf_call());
    }

    #[test]
    fn test_group_indexed_components_complete_family() {
        // f with 2-D range; i = f(t)[0] and j = f(t)[1] merge
        let mut env = Environment::new();
        let mut range_c = Conjunction::new(TupleDecl::from_names(["x", "y"]));
        range_c.add_inequality(Exp::tuple_var(0));
        range_c.add_inequality(Exp::tuple_var(1));
        env.declare(UninterpFunc::new(
            "f",
            interval("n"),
            Set::from_conjunction(range_c),
            false,
            Monotonicity::None,
        ))
        .unwrap();

        let mut c = Conjunction::new(TupleDecl::from_names(["i", "j", "t"]));
        for k in 0..2usize {
            let mut eq = Exp::tuple_var(k);
            eq.add_term(Term::uf_call(
                -1,
                UfCall::indexed("f", vec![Exp::tuple_var(2)], k),
            ));
            c.add_equality(eq);
        }
        let grouped = group_indexed_ufc_components(&c, &env);
        assert_eq!(grouped.equalities().len(), 1);
        let has_tuple_exp = grouped.equalities()[0]
            .terms()
            .iter()
            .any(|t| matches!(t.kind, TermKind::TupleExp(_)));
        assert!(has_tuple_exp);
    }

    #[test]
    fn test_group_indexed_components_partial_family_untouched() {
        let mut env = Environment::new();
        let mut range_c = Conjunction::new(TupleDecl::from_names(["x", "y"]));
        range_c.add_inequality(Exp::tuple_var(0));
        range_c.add_inequality(Exp::tuple_var(1));
        env.declare(UninterpFunc::new(
            "f",
            interval("n"),
            Set::from_conjunction(range_c),
            false,
            Monotonicity::None,
        ))
        .unwrap();

        // only component 0 present
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "t"]));
        let mut eq = Exp::tuple_var(0);
        eq.add_term(Term::uf_call(
            -1,
            UfCall::indexed("f", vec![Exp::tuple_var(1)], 0),
        ));
        c.add_equality(eq);
        let grouped = group_indexed_ufc_components(&c, &env);
        assert_eq!(grouped, c);
    }

    #[test]
    fn test_align_tuple_decl_renamed_positions() {
        // backend echoed [a, b]; expected [b, a]: positions swap by name
        let mut c = Conjunction::new(TupleDecl::from_names(["a", "b"]));
        c.add_inequality(Exp::tuple_var(0));
        let expected = TupleDecl::from_names(["b", "a"]);
        let aligned = align_tuple_decl(&c, &expected);
        assert_eq!(aligned.tuple_decl(), &expected);
        assert_eq!(aligned.inequalities()[0], Exp::tuple_var(1));
    }

    #[test]
    fn test_align_tuple_decl_renames_and_drops() {
        // backend echoed [i, __tv2] after eliminating k; the surviving
        // names match positions in [i, k, __tv2]
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "__tv2"]));
        c.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::tuple_var(-1, 0),
        ]));
        let expected = TupleDecl::from_names(["i", "k", "__tv2"]);
        let aligned = align_tuple_decl(&c, &expected);
        assert_eq!(aligned.tuple_decl(), &expected);
        assert_eq!(
            aligned.inequalities()[0],
            Exp::from_terms(vec![Term::tuple_var(-1, 0), Term::tuple_var(1, 2)])
        );
    }

    #[test]
    fn test_normalize_restores_calls() {
        let env = sparse_env();
        let backend = NativeBackend::new();
        // { [i, k] : rowptr(i) <= k && k < diagptr(i) }
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        c.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, UfCall::new("rowptr", vec![Exp::tuple_var(0)])),
        ]));
        c.add_inequality(Exp::from_terms(vec![
            Term::uf_call(1, UfCall::new("diagptr", vec![Exp::tuple_var(0)])),
            Term::tuple_var(-1, 1),
            Term::constant(-1),
        ]));
        let result = normalize_conjunction(&c, &env, &backend).unwrap();
        assert_eq!(result.arity(), 2);
        let body = format!("{}", result);
        assert!(body.contains("rowptr"), "calls restored: {}", body);
        assert!(body.contains("diagptr"), "calls restored: {}", body);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let env = sparse_env();
        let backend = NativeBackend::new();
        let mut c = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        c.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, UfCall::new("rowptr", vec![Exp::tuple_var(0)])),
        ]));
        let once = normalize_conjunction(&c, &env, &backend).unwrap();
        assert_eq!(once.conjunctions().len(), 1);
        let twice = normalize_conjunction(&once.conjunctions()[0], &env, &backend).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_detects_rephrased_equality() {
        let env = sparse_env();
        let backend = NativeBackend::new();
        // k = rowptr(i) phrased as an equality vs. a pair of inequalities
        let call = UfCall::new("rowptr", vec![Exp::tuple_var(0)]);
        let mut a = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        a.add_equality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, call.clone()),
        ]));
        let mut b = Conjunction::new(TupleDecl::from_names(["i", "k"]));
        b.add_inequality(Exp::from_terms(vec![
            Term::tuple_var(1, 1),
            Term::uf_call(-1, call.clone()),
        ]));
        b.add_inequality(Exp::from_terms(vec![
            Term::uf_call(1, call),
            Term::tuple_var(-1, 1),
        ]));
        let na = normalize_conjunction(&a, &env, &backend).unwrap();
        let nb = normalize_conjunction(&b, &env, &backend).unwrap();
        assert_eq!(na, nb);
    }

    #[test]
    fn test_normalize_undeclared_function_fails() {
        let env = Environment::new();
        let backend = NativeBackend::new();
        let mut c = Conjunction::new(TupleDecl::from_names(["i"]));
        c.add_inequality(Exp::single(Term::uf_call(
            1,
            UfCall::new("mystery", vec![Exp::tuple_var(0)]),
        )));
        assert!(normalize_conjunction(&c, &env, &backend).is_err());
    }
}
