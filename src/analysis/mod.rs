//! Analysis passes built on normalized sets and relations.

pub mod complexity;
pub mod dependence;
pub mod sampling;

pub use complexity::complexity;
pub use dependence::{data_dependence_relationship, set_equal, SetRelationship};
pub use sampling::{check_superset, satisfies, set_contains};
