//! # SparsePoly - Symbolic Polyhedral Algebra with Uninterpreted Functions
//!
//! An engine for dependence analysis of sparse-matrix loop nests. Integer
//! tuple Sets and Relations may contain uninterpreted function calls
//! (UFCs) such as `rowptr(i)` or `colidx(k)` modeling array indirection;
//! normalization promotes each call to a temporary tuple variable,
//! bounds it via declared domain/range facts, canonicalizes the affine
//! relaxation through a backend, and substitutes the calls back in.
//!
//! ## Architecture
//!
//! ```text
//! Text → Frontend → Set/Relation → Normalize (UFC promotion + backend) → Analysis
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sparsepoly::prelude::*;
//!
//! let mut env = Environment::new();
//! env.declare(UninterpFunc::new(
//!     "rowptr",
//!     Set::from_string("[m] -> { [x] : 0 <= x < m }")?,
//!     Set::from_string("[nnz] -> { [y] : 0 <= y < nnz }")?,
//!     false,
//!     Monotonicity::Nondecreasing,
//! ))?;
//!
//! let mut s = Set::from_string("{ [i, k] : rowptr(i) <= k < rowptr(i + 1) }")?;
//! s.normalize(&env, &NativeBackend::new())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algebra;
pub mod analysis;
pub mod backend;
pub mod constraints;
pub mod env;
pub mod frontend;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::algebra::{Exp, Term, TermKind, TupleDecl, TupleExp, UfCall};
    pub use crate::analysis::{
        complexity, data_dependence_relationship, set_equal, SetRelationship,
    };
    pub use crate::backend::{AffineBackend, IsccBackend, NativeBackend, OmegaRewriter};
    pub use crate::constraints::{Conjunction, Relation, Set, UfMapAndBounds};
    pub use crate::env::{Environment, Monotonicity, UfcMap, UninterpFunc};
    pub use crate::frontend::{parse_relation, parse_set, ParseError};
    pub use crate::utils::errors::{BackendError, PolyError, PolyResult};
}

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
