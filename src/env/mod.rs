//! The uninterpreted-function environment.
//!
//! An `Environment` registers each UF's declared domain set, range set,
//! bijectivity, and monotonicity class, and derives the companion
//! artifacts: an automatic inverse for bijective functions and ordering
//! inference rules for monotonic ones. It is an explicit value owned by
//! the analysis driver (construct, declare, query, drop); there is no
//! process-global state.

pub mod ufc_map;

pub use ufc_map::UfcMap;

use crate::algebra::exp::Exp;
use crate::algebra::term::TermKind;
use crate::constraints::conjunction::Conjunction;
use crate::constraints::set_relation::Set;
use crate::utils::errors::{PolyError, PolyResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared ordering-preservation behavior of a UF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Monotonicity {
    /// No ordering facts
    #[default]
    None,
    /// Strictly increasing
    Increasing,
    /// Non-decreasing
    Nondecreasing,
    /// Strictly decreasing
    Decreasing,
    /// Non-increasing
    Nonincreasing,
}

/// One registered uninterpreted function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninterpFunc {
    /// Function name
    pub name: String,
    /// Declared domain set; its arity is the function's argument arity
    pub domain: Set,
    /// Declared range set; its arity is the result arity
    pub range: Set,
    /// Whether the function is a bijection between domain and range
    pub bijective: bool,
    /// Declared monotonicity class (unary functions only)
    pub monotonicity: Monotonicity,
}

impl UninterpFunc {
    /// Create a declaration.
    pub fn new(
        name: impl Into<String>,
        domain: Set,
        range: Set,
        bijective: bool,
        monotonicity: Monotonicity,
    ) -> Self {
        Self {
            name: name.into(),
            domain,
            range,
            bijective,
            monotonicity,
        }
    }

    /// Argument arity, from the domain declaration.
    pub fn arity(&self) -> usize {
        self.domain.arity()
    }

    /// Result arity, from the range declaration.
    pub fn out_arity(&self) -> usize {
        self.range.arity()
    }
}

/// A derived ordering-implication rule for a monotonic function:
/// `f(e1) < f(e2)  =>  e1 REL e2` (with REL determined by the class).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonotonicityRule {
    /// The function the rule speaks about
    pub func: String,
    /// Its declared class
    pub class: Monotonicity,
}

impl fmt::Display for MonotonicityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let concl = match self.class {
            Monotonicity::Increasing | Monotonicity::Nondecreasing => "e1 < e2",
            Monotonicity::Decreasing | Monotonicity::Nonincreasing => "e1 > e2",
            Monotonicity::None => "true",
        };
        write!(
            f,
            "forall e1, e2: {}(e1) < {}(e2) => {}",
            self.func, self.func, concl
        )
    }
}

/// The registry of declared uninterpreted functions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    funcs: BTreeMap<String, UninterpFunc>,
    inverses: BTreeMap<String, String>,
    rules: Vec<MonotonicityRule>,
}

impl Environment {
    /// An empty environment. Each independent analysis session builds its
    /// own; nothing is shared between sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. Fails with `DuplicateDeclaration` if the name
    /// (or, for a bijective function, its synthesized `<name>_inv`) is
    /// already taken. Bijective declarations auto-register the inverse
    /// with swapped domain and range and no monotonicity.
    pub fn declare(&mut self, func: UninterpFunc) -> PolyResult<()> {
        if self.funcs.contains_key(&func.name) {
            return Err(PolyError::DuplicateDeclaration(func.name.clone()));
        }
        if func.bijective {
            let inv_name = format!("{}_inv", func.name);
            if self.funcs.contains_key(&inv_name) {
                return Err(PolyError::DuplicateDeclaration(inv_name));
            }
            let inverse = UninterpFunc {
                name: inv_name.clone(),
                domain: func.range.clone(),
                range: func.domain.clone(),
                bijective: true,
                monotonicity: Monotonicity::None,
            };
            self.inverses.insert(func.name.clone(), inv_name.clone());
            self.inverses.insert(inv_name.clone(), func.name.clone());
            self.funcs.insert(inv_name, inverse);
        }
        // Rules grow only after every duplicate check has passed; a failed
        // declare leaves no rule behind.
        if func.monotonicity != Monotonicity::None {
            self.rules.push(MonotonicityRule {
                func: func.name.clone(),
                class: func.monotonicity,
            });
        }
        self.funcs.insert(func.name.clone(), func);
        Ok(())
    }

    /// Whether a name is declared.
    pub fn is_declared(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Look up a declaration.
    pub fn lookup(&self, name: &str) -> PolyResult<&UninterpFunc> {
        self.funcs
            .get(name)
            .ok_or_else(|| PolyError::UndeclaredFunction(name.to_string()))
    }

    /// A clone of the declared domain set. The caller owns the clone.
    pub fn domain_of(&self, name: &str) -> PolyResult<Set> {
        Ok(self.lookup(name)?.domain.clone())
    }

    /// A clone of the declared range set. The caller owns the clone.
    pub fn range_of(&self, name: &str) -> PolyResult<Set> {
        Ok(self.lookup(name)?.range.clone())
    }

    /// The registered inverse of a function, if any.
    pub fn inverse_of(&self, name: &str) -> Option<String> {
        self.inverses.get(name).cloned()
    }

    /// The derived monotonicity rules, in declaration order.
    pub fn rules(&self) -> &[MonotonicityRule] {
        &self.rules
    }

    /// Apply the monotonicity rules to one conjunction, returning it with
    /// the derived ordering constraints added.
    ///
    /// Only the declared direction is applied: `f(e1) < f(e2)` yields the
    /// argument ordering, but an argument ordering never yields a
    /// constraint on `f`.
    pub fn apply_rules(&self, conj: &Conjunction) -> Conjunction {
        let mut out = conj.clone();
        for rule in &self.rules {
            for ineq in conj.inequalities() {
                if let Some(derived) = derive_ordering(ineq, rule) {
                    out.add_inequality(derived);
                }
            }
        }
        out
    }
}

/// Match `c + f(a) - f(b) >= 0` against a rule and produce the implied
/// argument ordering, if any.
fn derive_ordering(ineq: &Exp, rule: &MonotonicityRule) -> Option<Exp> {
    let mut constant = 0i64;
    let mut pos_arg: Option<&Exp> = None;
    let mut neg_arg: Option<&Exp> = None;
    for t in ineq.terms() {
        match &t.kind {
            TermKind::Const => constant = t.coeff,
            TermKind::UfCall(c) if c.name == rule.func && c.tuple_index.is_none() => {
                match t.coeff {
                    1 if pos_arg.is_none() && c.args.len() == 1 => pos_arg = Some(&c.args[0]),
                    -1 if neg_arg.is_none() && c.args.len() == 1 => neg_arg = Some(&c.args[0]),
                    _ => return None,
                }
            }
            _ => return None,
        }
    }
    let (a, b) = (pos_arg?, neg_arg?);
    // premise: f(a) >= f(b) - constant
    let strict = constant <= -1;
    let applies = match rule.class {
        Monotonicity::Increasing | Monotonicity::Decreasing => true,
        // non-strict classes only transfer strict premises
        Monotonicity::Nondecreasing | Monotonicity::Nonincreasing => strict,
        Monotonicity::None => false,
    };
    if !applies {
        return None;
    }
    // conclusion: a REL b, strict when the premise was strict
    let mut concl = match rule.class {
        Monotonicity::Increasing | Monotonicity::Nondecreasing => a.clone() - b.clone(),
        Monotonicity::Decreasing | Monotonicity::Nonincreasing => b.clone() - a.clone(),
        Monotonicity::None => unreachable!(),
    };
    if strict {
        concl.add_exp(&Exp::constant(-1));
    }
    Some(concl)
}
