//! Shared utilities: error taxonomy and source locations.

pub mod errors;
pub mod location;

pub use errors::{BackendError, ParseError, PolyError, PolyResult};
pub use location::{SourceLocation, Span};
