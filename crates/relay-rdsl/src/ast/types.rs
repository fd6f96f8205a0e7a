//! Surface type syntax.
//!
//! A [`TypeExpr`] is the unresolved type subtree attached to payloads,
//! typedef right-hand sides, parameters, and variables. Resolution to a
//! semantic [`Type`](crate::resolve::types::Type) is the job of the
//! [`ResolveType`](crate::resolve::types::ResolveType) collaborator, which
//! receives the subtree together with the scope it appears in.

use serde::{Deserialize, Serialize};

use crate::ast::declaration::{Ident, NodeId};
use crate::foundation::Span;

/// An unresolved type subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeExprKind,
}

/// Type syntax variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeExprKind {
    /// `null`
    Null,
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `string`
    String,
    /// `event`
    Event,
    /// `machine`
    Machine,
    /// `any`
    Any,
    /// A named type: typedef or enum reference
    Name(Ident),
    /// `(T1, T2, …)`
    Tuple(Vec<TypeExpr>),
    /// `seq[T]`
    Seq(Box<TypeExpr>),
    /// `map[K, V]`
    Map(Box<TypeExpr>, Box<TypeExpr>),
}
