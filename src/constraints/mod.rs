//! Constraint containers: conjunctions, sets, relations, and the
//! UF-bounding and normalization passes that operate on them.

pub mod conjunction;
pub mod normalize;
pub mod set_relation;
pub mod ufc_bounds;

pub use conjunction::Conjunction;
pub use normalize::normalize_conjunction;
pub use set_relation::{Relation, Set, SparseConstraints};
pub use ufc_bounds::UfMapAndBounds;
