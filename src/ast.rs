//! Abstract syntax tree of a document.
//!
//! Trees are owned top-down and never changed after lowering. Everything learned while resolving a
//! program lives in the [`Program`](crate::program::Program) tables instead.

/// Expression nodes.
mod expression;

/// Document locations.
mod location;

/// Lines, statements and arguments.
mod statement;

/// Lookups by position.
pub mod query;

pub use expression::*;
pub use location::Location;
pub use statement::*;
