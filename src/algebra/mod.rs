//! The symbolic expression/term model.
//!
//! Expressions are integer-linear combinations of terms; a term is a
//! constant, a symbolic parameter, a tuple variable, an uninterpreted
//! function call, or a tuple of sub-expressions. This is the algebraic
//! foundation everything else (conjunctions, sets, relations, the
//! normalize pipeline) is built on.

pub mod exp;
pub mod term;
pub mod tuple_decl;

pub use exp::{Exp, SubstitutionMap, TermEval};
pub use term::{Term, TermKind, TupleExp, UfCall};
pub use tuple_decl::{TupleDecl, TupleElem};
