//! Foundation types shared by the AST and the resolver.
//!
//! Nothing in this module knows about Relay semantics: spans locate syntax
//! in source text, and the arena provides typed handles for graph-shaped
//! data (scopes, declarations) without back-pointers.

pub mod arena;
pub mod span;

pub use arena::{Arena, Id};
pub use span::Span;
