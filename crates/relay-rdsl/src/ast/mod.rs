//! Syntax trees for Relay program units.
//!
//! The parser (a separate crate) produces these trees; the resolver core
//! consumes them. Every production carries a [`NodeId`] handle and a span;
//! the resolver never inspects source text, only tree structure.

pub mod declaration;
pub mod types;
pub mod visit;

pub use declaration::*;
pub use types::{TypeExpr, TypeExprKind};
pub use visit::{walk_program, Visit};
