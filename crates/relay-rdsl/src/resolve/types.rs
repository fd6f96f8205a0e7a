//! Semantic types and the type-resolution collaborator.
//!
//! A [`Type`] is the resolved form of a surface
//! [`TypeExpr`](crate::ast::TypeExpr). Named types resolve to *nominal*
//! references ([`Type::Def`], [`Type::Enum`]) — a handle to the declaration,
//! not its expansion — so resolution never depends on declaration order and
//! mutually-referencing typedefs cost nothing extra.
//!
//! Type resolution is a collaborator, not part of the resolver core: the
//! binding pass hands the current scope plus the subtree to a
//! [`ResolveType`] implementation and stores whatever comes back. The crate
//! ships [`ScopedTypeResolver`], which is sufficient for the declaration
//! phase; later phases may substitute a richer resolver.

use crate::ast::{TypeExpr, TypeExprKind};
use crate::error::{AnalysisError, Result};
use crate::foundation::Id;
use crate::resolve::decl::{DeclId, DeclKind, Declarations, EnumDef, TypeDef};
use crate::resolve::scope::{ScopeId, ScopeTree};

/// A resolved Relay type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Type {
    /// The unit payload type; the default wherever no type is written
    #[default]
    Null,
    Bool,
    Int,
    Float,
    String,
    /// Any event value
    Event,
    /// Any machine reference
    Machine,
    /// The dynamic top type
    Any,
    /// Nominal reference to an enum declaration
    Enum(Id<EnumDef>),
    /// Nominal reference to a typedef declaration
    Def(Id<TypeDef>),
    Tuple(Vec<Type>),
    Seq(Box<Type>),
    Map(Box<Type>, Box<Type>),
}

/// Resolves a type subtree against a scope.
///
/// The core supplies the scope current at the subtree's position; the
/// resolver owns everything else about type semantics.
pub trait ResolveType {
    fn resolve_type(
        &self,
        scopes: &ScopeTree,
        decls: &Declarations,
        scope: ScopeId,
        expr: &TypeExpr,
    ) -> Result<Type>;
}

/// Default resolver: primitive heads structurally, names by chained scope
/// lookup (typedefs first, then enums).
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopedTypeResolver;

impl ResolveType for ScopedTypeResolver {
    fn resolve_type(
        &self,
        scopes: &ScopeTree,
        decls: &Declarations,
        scope: ScopeId,
        expr: &TypeExpr,
    ) -> Result<Type> {
        let ty = match &expr.kind {
            TypeExprKind::Null => Type::Null,
            TypeExprKind::Bool => Type::Bool,
            TypeExprKind::Int => Type::Int,
            TypeExprKind::Float => Type::Float,
            TypeExprKind::String => Type::String,
            TypeExprKind::Event => Type::Event,
            TypeExprKind::Machine => Type::Machine,
            TypeExprKind::Any => Type::Any,
            TypeExprKind::Name(name) => {
                if let Some(DeclId::TypeDef(id)) =
                    scopes.lookup(scope, DeclKind::TypeDef, &name.name)
                {
                    Type::Def(id)
                } else if let Some(DeclId::Enum(id)) =
                    scopes.lookup(scope, DeclKind::Enum, &name.name)
                {
                    Type::Enum(id)
                } else {
                    return Err(AnalysisError::MissingDeclaration {
                        kind: DeclKind::TypeDef,
                        name: name.name.clone(),
                        node: expr.id,
                    });
                }
            }
            TypeExprKind::Tuple(items) => {
                let mut fields = Vec::with_capacity(items.len());
                for item in items {
                    fields.push(self.resolve_type(scopes, decls, scope, item)?);
                }
                Type::Tuple(fields)
            }
            TypeExprKind::Seq(item) => {
                Type::Seq(Box::new(self.resolve_type(scopes, decls, scope, item)?))
            }
            TypeExprKind::Map(key, value) => Type::Map(
                Box::new(self.resolve_type(scopes, decls, scope, key)?),
                Box::new(self.resolve_type(scopes, decls, scope, value)?),
            ),
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ident, NodeId};
    use crate::foundation::Span;

    fn ty(id: u32, kind: TypeExprKind) -> TypeExpr {
        TypeExpr {
            id: NodeId(id),
            span: Span::zero(0),
            kind,
        }
    }

    #[test]
    fn test_primitives_resolve_structurally() {
        let mut scopes = ScopeTree::new();
        let root = scopes.add_scope(None);
        let decls = Declarations::new();
        let resolver = ScopedTypeResolver;

        let resolved = resolver
            .resolve_type(&scopes, &decls, root, &ty(0, TypeExprKind::Int))
            .unwrap();
        assert_eq!(resolved, Type::Int);
    }

    #[test]
    fn test_name_resolves_typedef_then_enum() {
        let mut scopes = ScopeTree::new();
        let root = scopes.add_scope(None);
        let mut decls = Declarations::new();
        let td = scopes
            .put_typedef(&mut decls, root, "T", NodeId(1))
            .unwrap();
        let en = scopes.put_enum(&mut decls, root, "Color", NodeId(2)).unwrap();
        let resolver = ScopedTypeResolver;

        let name = |n: &str, id: u32| {
            ty(
                id,
                TypeExprKind::Name(Ident {
                    name: n.to_string(),
                    span: Span::zero(0),
                }),
            )
        };

        assert_eq!(
            resolver
                .resolve_type(&scopes, &decls, root, &name("T", 3))
                .unwrap(),
            Type::Def(td)
        );
        assert_eq!(
            resolver
                .resolve_type(&scopes, &decls, root, &name("Color", 4))
                .unwrap(),
            Type::Enum(en)
        );
        let err = resolver
            .resolve_type(&scopes, &decls, root, &name("Missing", 5))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingDeclaration { .. }));
    }

    #[test]
    fn test_compound_types_recurse() {
        let mut scopes = ScopeTree::new();
        let root = scopes.add_scope(None);
        let decls = Declarations::new();
        let resolver = ScopedTypeResolver;

        let expr = ty(
            0,
            TypeExprKind::Map(
                Box::new(ty(1, TypeExprKind::Int)),
                Box::new(ty(2, TypeExprKind::Seq(Box::new(ty(3, TypeExprKind::Bool))))),
            ),
        );
        let resolved = resolver.resolve_type(&scopes, &decls, root, &expr).unwrap();
        assert_eq!(
            resolved,
            Type::Map(
                Box::new(Type::Int),
                Box::new(Type::Seq(Box::new(Type::Bool)))
            )
        );
    }
}
