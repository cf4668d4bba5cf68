//! Terms: the atomic building blocks of linear expressions.
//!
//! A term is a coefficient times a *factor*. The factor (the term with its
//! coefficient forced to 1) is the key used for merging, comparison, and
//! substitution. The factor variants form a closed sum type: constants,
//! named parameters, tuple variables, uninterpreted function calls, and
//! tuple expressions (multi-valued results before they are split).

use crate::algebra::exp::Exp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An uninterpreted function call: `name(arg0, arg1, ...)`, optionally
/// referencing one component of a multi-valued result via `tuple_index`.
///
/// Identity for mapping purposes is the full printed form, so `rowptr(i)`
/// and `rowptr(i+1)` are distinct while two occurrences of `rowptr(i)`
/// are the same call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UfCall {
    /// Function name
    pub name: String,
    /// Ordered argument expressions
    pub args: Vec<Exp>,
    /// Component index when the function returns a tuple
    pub tuple_index: Option<usize>,
}

impl UfCall {
    /// Create a scalar-result call.
    pub fn new(name: impl Into<String>, args: Vec<Exp>) -> Self {
        Self {
            name: name.into(),
            args,
            tuple_index: None,
        }
    }

    /// Create a call referencing component `index` of a tuple-valued result.
    pub fn indexed(name: impl Into<String>, args: Vec<Exp>, index: usize) -> Self {
        Self {
            name: name.into(),
            args,
            tuple_index: Some(index),
        }
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// The same call without any component index.
    pub fn without_index(&self) -> UfCall {
        UfCall {
            name: self.name.clone(),
            args: self.args.clone(),
            tuple_index: None,
        }
    }

    /// Printed form without the component index, used to group the
    /// components of one multi-valued invocation.
    pub fn base_key(&self) -> String {
        format!("{}", self.without_index())
    }
}

impl fmt::Display for UfCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")?;
        if let Some(idx) = self.tuple_index {
            write!(f, "[{}]", idx)?;
        }
        Ok(())
    }
}

/// An ordered tuple of sub-expressions, used for multi-valued UF results
/// and for handing argument tuples to domain/range bounding.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleExp {
    /// The component expressions, in order
    pub elems: Vec<Exp>,
}

impl TupleExp {
    /// Create a tuple expression from its components.
    pub fn new(elems: Vec<Exp>) -> Self {
        Self { elems }
    }

    /// Number of components.
    pub fn size(&self) -> usize {
        self.elems.len()
    }

    /// Component accessor.
    pub fn elem(&self, i: usize) -> &Exp {
        &self.elems[i]
    }
}

impl fmt::Display for TupleExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, e) in self.elems.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, ")")
    }
}

/// The factor of a term. Variant order defines the canonical term
/// precedence: constants < named parameters < tuple variables < UF calls
/// < tuple expressions, lexicographic within each kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermKind {
    /// The constant 1; the term's value is its coefficient.
    Const,
    /// A symbolic parameter such as `N` or `nnz`.
    Var(String),
    /// A positional tuple variable, with an optional component sub-index
    /// for references into a multi-valued UF result.
    TupleVar {
        /// Position in the enclosing tuple declaration
        loc: usize,
        /// Optional component sub-index
        sub: Option<usize>,
    },
    /// An uninterpreted function call.
    UfCall(UfCall),
    /// A tuple of sub-expressions.
    TupleExp(TupleExp),
}

impl TermKind {
    /// A plain tuple-variable factor.
    pub fn tuple_var(loc: usize) -> Self {
        TermKind::TupleVar { loc, sub: None }
    }
}

/// A coefficient-scaled factor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    /// Integer coefficient
    pub coeff: i64,
    /// The factor
    pub kind: TermKind,
}

impl Term {
    /// Create a term from a coefficient and factor.
    pub fn new(coeff: i64, kind: TermKind) -> Self {
        Self { coeff, kind }
    }

    /// A constant term.
    pub fn constant(value: i64) -> Self {
        Self::new(value, TermKind::Const)
    }

    /// A named-parameter term.
    pub fn var(coeff: i64, name: impl Into<String>) -> Self {
        Self::new(coeff, TermKind::Var(name.into()))
    }

    /// A tuple-variable term.
    pub fn tuple_var(coeff: i64, loc: usize) -> Self {
        Self::new(coeff, TermKind::tuple_var(loc))
    }

    /// A UF-call term.
    pub fn uf_call(coeff: i64, call: UfCall) -> Self {
        Self::new(coeff, TermKind::UfCall(call))
    }

    /// A tuple-expression term.
    pub fn tuple_exp(coeff: i64, te: TupleExp) -> Self {
        Self::new(coeff, TermKind::TupleExp(te))
    }

    /// This term with its coefficient forced to 1: the merge/substitution key.
    pub fn factor(&self) -> Term {
        Term::new(1, self.kind.clone())
    }

    /// Whether two terms share a factor (coefficients ignored).
    pub fn same_factor(&self, other: &Term) -> bool {
        self.kind == other.kind
    }

    /// Whether this is a constant term.
    pub fn is_const(&self) -> bool {
        matches!(self.kind, TermKind::Const)
    }

}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    /// Factors order first; coefficients only break exact-factor ties.
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.coeff.cmp(&other.coeff))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TermKind::Const => write!(f, "{}", self.coeff),
            _ => {
                match self.coeff {
                    1 => {}
                    -1 => write!(f, "-")?,
                    c => write!(f, "{} ", c)?,
                }
                match &self.kind {
                    TermKind::Const => unreachable!(),
                    TermKind::Var(name) => write!(f, "{}", name)?,
                    TermKind::TupleVar { loc, sub } => {
                        write!(f, "__tv{}", loc)?;
                        if let Some(s) = sub {
                            write!(f, "[{}]", s)?;
                        }
                    }
                    TermKind::UfCall(c) => write!(f, "{}", c)?,
                    TermKind::TupleExp(te) => write!(f, "{}", te)?,
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_ordering() {
        let c = Term::constant(5);
        let v = Term::var(1, "n");
        let tv = Term::tuple_var(1, 0);
        let uf = Term::uf_call(1, UfCall::new("f", vec![Exp::constant(1)]));
        assert!(c < v);
        assert!(v < tv);
        assert!(tv < uf);
    }

    #[test]
    fn test_tuple_var_ordering_by_position() {
        let a = Term::tuple_var(1, 0);
        let b = Term::tuple_var(1, 3);
        assert!(a < b);
    }

    #[test]
    fn test_factor_drops_coefficient() {
        let t = Term::var(-4, "n");
        assert_eq!(t.factor(), Term::var(1, "n"));
        assert!(t.same_factor(&Term::var(7, "n")));
        assert!(!t.same_factor(&Term::var(7, "m")));
    }

    #[test]
    fn test_uf_call_display() {
        let call = UfCall::new(
            "row",
            vec![
                Exp::from_terms(vec![Term::tuple_var(1, 0), Term::constant(1)]),
                Exp::from_terms(vec![Term::tuple_var(1, 2), Term::var(-1, "n")]),
            ],
        );
        assert_eq!(format!("{}", call), "row(__tv0 + 1, __tv2 - n)");
    }

    #[test]
    fn test_indexed_call_identity() {
        let a = UfCall::indexed("g", vec![Exp::constant(2)], 0);
        let b = UfCall::indexed("g", vec![Exp::constant(2)], 1);
        assert_ne!(a, b);
        assert_eq!(a.base_key(), b.base_key());
    }

    #[test]
    fn test_term_display_coefficients() {
        assert_eq!(format!("{}", Term::var(2, "n")), "2 n");
        assert_eq!(format!("{}", Term::var(-1, "n")), "-n");
        assert_eq!(format!("{}", Term::tuple_var(1, 1)), "__tv1");
        assert_eq!(format!("{}", Term::constant(-3)), "-3");
    }
}
