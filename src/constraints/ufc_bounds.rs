//! UF-call promotion: temporary tuple variables standing in for UF
//! results, bounded by the declared domain and range of each call.
//!
//! `UfMapAndBounds` carries a growing tuple declaration (the original
//! positions plus one temporary per UF result component), a record of
//! which call each temporary stands for, and the accumulated working-set
//! constraints. Range bounding widens the working set; domain bounding
//! constrains the call's arguments in place.

use crate::algebra::exp::Exp;
use crate::algebra::term::{TupleExp, UfCall};
use crate::algebra::tuple_decl::TupleDecl;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::Set;
use crate::env::Environment;
use crate::utils::errors::{PolyError, PolyResult};
use log::trace;

/// Temp-variable allocator plus the bound constraints collected so far.
#[derive(Debug, Clone)]
pub struct UfMapAndBounds {
    initial_arity: usize,
    tuple_decl: TupleDecl,
    ufcall_for_pos: Vec<Option<UfCall>>,
    constraints: Set,
}

impl UfMapAndBounds {
    /// Start from the tuple declaration of the conjunction being
    /// normalized; the working set begins universal over it.
    pub fn new(tuple_decl: TupleDecl) -> Self {
        let initial_arity = tuple_decl.size();
        let constraints = Set::universe_over(tuple_decl.clone());
        Self {
            initial_arity,
            tuple_decl,
            ufcall_for_pos: vec![None; initial_arity],
            constraints,
        }
    }

    /// The original arity, before any temporaries.
    pub fn initial_arity(&self) -> usize {
        self.initial_arity
    }

    /// How many temporaries have been appended.
    pub fn num_temp_vars(&self) -> usize {
        self.tuple_decl.size() - self.initial_arity
    }

    /// The current (grown) tuple declaration.
    pub fn tuple_decl(&self) -> &TupleDecl {
        &self.tuple_decl
    }

    /// The call a temporary position stands for. Panics if the position
    /// is not a temporary.
    pub fn uf_call(&self, pos: usize) -> &UfCall {
        self.ufcall_for_pos[pos]
            .as_ref()
            .unwrap_or_else(|| panic!("tuple position {} is not a UF temporary", pos))
    }

    /// A snapshot of the accumulated working-set constraints.
    pub fn clone_constraints(&self) -> Set {
        self.constraints.clone()
    }

    /// Constrain a call's arguments by its declared domain: every point
    /// the call is evaluated at must lie in the domain set.
    pub fn bound_by_domain(&mut self, call: &UfCall, env: &Environment) -> PolyResult<()> {
        let domain = env.domain_of(&call.name)?;
        if domain.arity() != call.arity() {
            return Err(PolyError::ArityMismatch {
                operation: "bound_by_domain",
                lhs: domain.arity().to_string(),
                rhs: call.arity().to_string(),
            });
        }
        let args = TupleExp::new(call.args.clone());
        let bounds = self.bound_set(&domain, &args)?;
        trace!("domain bounds for {}: {}", call, bounds);
        self.constraints = self.constraints.intersect(&bounds)?;
        Ok(())
    }

    /// Append one temporary per range component of a call, bound them by
    /// the declared range, and return the tuple expression of the new
    /// temporaries (to substitute for the call in the caller's
    /// constraints).
    pub fn bound_by_range(&mut self, call: &UfCall, env: &Environment) -> PolyResult<TupleExp> {
        let range = env.range_of(&call.name)?;
        let k = range.arity();
        let start = self.tuple_decl.size();
        for i in 0..k {
            self.tuple_decl.append_var(format!("__tv{}", start + i));
            self.ufcall_for_pos.push(Some(if k == 1 {
                call.clone()
            } else {
                UfCall::indexed(call.name.clone(), call.args.clone(), i)
            }));
        }
        self.constraints = widen(&self.constraints, &self.tuple_decl);

        let temps = TupleExp::new((0..k).map(|i| Exp::tuple_var(start + i)).collect());
        let bounds = self.bound_set(&range, &temps)?;
        trace!("range bounds for {}: {}", call, bounds);
        self.constraints = self.constraints.intersect(&bounds)?;
        Ok(temps)
    }

    /// Instantiate a domain or range set at an expression tuple: each of
    /// its conjunctions is rewritten over the current declaration, and the
    /// parts stay unioned.
    fn bound_set(&self, set: &Set, at: &TupleExp) -> PolyResult<Set> {
        let mut out = Set::empty(self.tuple_decl.size());
        for c in set.conjunctions() {
            out.add_conjunction(c.bound_tuple_exp(at, &self.tuple_decl)?)?;
        }
        Ok(out)
    }
}

/// Rebuild a set's conjunctions over a wider tuple declaration. New
/// positions are unconstrained; existing constraints carry over verbatim.
fn widen(set: &Set, decl: &TupleDecl) -> Set {
    let mut out = Set::empty(decl.size());
    for c in set.conjunctions() {
        let mut wc = Conjunction::new(decl.clone());
        for e in c.equalities() {
            wc.add_equality(e.clone());
        }
        for e in c.inequalities() {
            wc.add_inequality(e.clone());
        }
        out.add_conjunction(wc).expect("widened conjunction arity");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::term::Term;
    use crate::env::{Monotonicity, UninterpFunc};

    fn interval(param: &str) -> Set {
        // { [x] : x >= 0 && param - x - 1 >= 0 }
        let mut c = Conjunction::new(TupleDecl::from_names(["x"]));
        c.add_inequality(Exp::tuple_var(0));
        c.add_inequality(Exp::from_terms(vec![
            Term::var(1, param),
            Term::tuple_var(-1, 0),
            Term::constant(-1),
        ]));
        Set::from_conjunction(c)
    }

    fn env_with_rowptr() -> Environment {
        let mut env = Environment::new();
        env.declare(UninterpFunc::new(
            "rowptr",
            interval("m"),
            interval("nnz"),
            false,
            Monotonicity::Nondecreasing,
        ))
        .unwrap();
        env
    }

    #[test]
    fn test_range_bounding_appends_temp() {
        let env = env_with_rowptr();
        let mut b = UfMapAndBounds::new(TupleDecl::from_names(["i"]));
        let call = UfCall::new("rowptr", vec![Exp::tuple_var(0)]);
        let temps = b.bound_by_range(&call, &env).unwrap();
        assert_eq!(b.num_temp_vars(), 1);
        assert_eq!(temps.size(), 1);
        assert_eq!(b.uf_call(1), &call);
        // working set now mentions the temp: __tv1 >= 0 && nnz - __tv1 - 1 >= 0
        let s = b.clone_constraints();
        assert_eq!(s.arity(), 2);
        assert_eq!(s.conjunctions().len(), 1);
        assert_eq!(s.conjunctions()[0].inequalities().len(), 2);
    }

    #[test]
    fn test_domain_bounding_constrains_arguments() {
        let env = env_with_rowptr();
        let mut b = UfMapAndBounds::new(TupleDecl::from_names(["i"]));
        // rowptr(i + 1): i + 1 must lie inside [0, m)
        let arg = Exp::from_terms(vec![Term::tuple_var(1, 0), Term::constant(1)]);
        let call = UfCall::new("rowptr", vec![arg]);
        b.bound_by_domain(&call, &env).unwrap();
        let s = b.clone_constraints();
        assert_eq!(s.arity(), 1);
        let ineqs = s.conjunctions()[0].inequalities();
        // i + 1 >= 0 && m - i - 2 >= 0
        assert_eq!(ineqs.len(), 2);
        assert!(ineqs.contains(&Exp::from_terms(vec![
            Term::tuple_var(1, 0),
            Term::constant(1)
        ])));
    }

    #[test]
    fn test_domain_arity_mismatch() {
        let env = env_with_rowptr();
        let mut b = UfMapAndBounds::new(TupleDecl::from_names(["i"]));
        let call = UfCall::new("rowptr", vec![Exp::tuple_var(0), Exp::constant(0)]);
        assert!(matches!(
            b.bound_by_domain(&call, &env),
            Err(PolyError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn test_unioned_range_stays_unioned() {
        // range with two conjunctions: { [x] : x = 0 } union { [x] : x - 1 = 0 }
        let mut c0 = Conjunction::new(TupleDecl::from_names(["x"]));
        c0.add_equality(Exp::tuple_var(0));
        let mut c1 = Conjunction::new(TupleDecl::from_names(["x"]));
        c1.add_equality(Exp::from_terms(vec![
            Term::tuple_var(1, 0),
            Term::constant(-1),
        ]));
        let range = Set::from_conjunction(c0).union(&Set::from_conjunction(c1)).unwrap();

        let mut env = Environment::new();
        env.declare(UninterpFunc::new(
            "flag",
            interval("n"),
            range,
            false,
            Monotonicity::None,
        ))
        .unwrap();

        let mut b = UfMapAndBounds::new(TupleDecl::from_names(["i"]));
        let call = UfCall::new("flag", vec![Exp::tuple_var(0)]);
        b.bound_by_range(&call, &env).unwrap();
        assert_eq!(b.clone_constraints().conjunctions().len(), 2);
    }

    #[test]
    fn test_multi_component_range() {
        // a 2-D range appends two temps, each tagged with an indexed call
        let mut c = Conjunction::new(TupleDecl::from_names(["x", "y"]));
        c.add_inequality(Exp::tuple_var(0));
        c.add_inequality(Exp::tuple_var(1));
        let range = Set::from_conjunction(c);

        let mut env = Environment::new();
        env.declare(UninterpFunc::new(
            "pair",
            interval("n"),
            range,
            false,
            Monotonicity::None,
        ))
        .unwrap();

        let mut b = UfMapAndBounds::new(TupleDecl::from_names(["i"]));
        let call = UfCall::new("pair", vec![Exp::tuple_var(0)]);
        let temps = b.bound_by_range(&call, &env).unwrap();
        assert_eq!(temps.size(), 2);
        assert_eq!(b.num_temp_vars(), 2);
        assert_eq!(b.uf_call(1).tuple_index, Some(0));
        assert_eq!(b.uf_call(2).tuple_index, Some(1));
    }
}
