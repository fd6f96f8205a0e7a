//! Declaration resolution for Relay compilation units.
//!
//! This module implements the resolver core: two traversals over parsed
//! program trees that produce a fully linked declaration graph.
//!
//! ```text
//! Parse → Stub Pass → Binding Pass → Validator (debug) → later phases
//!            ^^^^         ^^^^            ^^^^
//!         resolve/stub  resolve/bind  resolve/validation
//! ```
//!
//! # Stub pass (`stub`)
//!
//! Creates one empty declaration per declaration-producing node and enters
//! every name into its lexical scope, so declarations may refer to each
//! other regardless of textual order. Writes the node → declaration and
//! node → scope maps.
//!
//! # Binding pass (`bind`)
//!
//! Re-walks the trees with all names visible and fills every attribute:
//! payload and parameter types (through the [`ResolveType`](types::ResolveType)
//! collaborator), event-set members, interface lists, state handlers and
//! transitions, enum element values, machine start states.
//!
//! # Validator (`validation`)
//!
//! Debug-only assertion sweep over the finished graph; skipped in
//! production analyses.
//!
//! # Entry point
//!
//! [`analyze`] runs the passes over every program in order and returns the
//! [`Analysis`]: the scope tree rooted at the top-level scope, the
//! declaration store, and the node maps. The first error aborts the
//! analysis; downstream phases must not run on a failed one.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::{NodeId, Program};
use crate::error::Result;
use crate::foundation::Id;
use crate::resolve::decl::{DeclId, Declarations, Event};
use crate::resolve::scope::{ScopeId, ScopeTree};
use crate::resolve::types::ResolveType;

mod bind;
pub mod decl;
pub mod scope;
mod stub;
pub mod types;
pub mod validation;

use bind::BindPass;
use stub::StubPass;

/// Options for [`analyze_with`].
#[derive(Debug, Clone, Copy)]
pub struct AnalyzeOptions {
    /// Run the debug validator after a successful analysis.
    pub validate: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            validate: cfg!(debug_assertions),
        }
    }
}

/// The durable artifact of a successful analysis: the declaration graph
/// plus everything needed to navigate it.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Lexical scope tree, rooted at [`Analysis::top_scope`]
    pub scopes: ScopeTree,
    /// Every declaration of the compilation unit
    pub decls: Declarations,
    /// The top-level scope; holds the built-in events and all file-level
    /// declarations (files in one unit are mutually visible)
    pub top_scope: ScopeId,
    /// Declaration produced by each declaration-producing node
    pub node_to_decl: IndexMap<NodeId, DeclId>,
    /// Scope introduced by each scope-bearing node
    pub node_to_scope: HashMap<NodeId, ScopeId>,
    /// Declarations created by each program unit, in creation order
    pub program_decls: IndexMap<NodeId, Vec<DeclId>>,
}

impl Analysis {
    /// Fresh analysis: a lone top-level scope seeded with the built-in
    /// events `halt` and `null`.
    fn new() -> Self {
        let mut scopes = ScopeTree::new();
        let mut decls = Declarations::new();
        let top_scope = scopes.add_scope(None);
        scopes.insert_builtin_event(&mut decls, top_scope, "halt");
        scopes.insert_builtin_event(&mut decls, top_scope, "null");
        Self {
            scopes,
            decls,
            top_scope,
            node_to_decl: IndexMap::new(),
            node_to_scope: HashMap::new(),
            program_decls: IndexMap::new(),
        }
    }

    /// Declaration produced by `node`, if it produced one.
    pub fn decl_of(&self, node: NodeId) -> Option<DeclId> {
        self.node_to_decl.get(&node).copied()
    }

    /// Scope introduced by `node`, if it introduced one.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_to_scope.get(&node).copied()
    }

    /// One of the built-in events, by name.
    pub fn builtin_event(&self, name: &str) -> Option<Id<Event>> {
        match self
            .scopes
            .get(self.top_scope, decl::DeclKind::Event, name)
        {
            Some(DeclId::Event(id)) if self.decls.events[id].node.is_none() => Some(id),
            _ => None,
        }
    }
}

/// Analyze a compilation unit with default options.
///
/// Runs the stub pass over every program in the order given, then the
/// binding pass, then (in debug builds) the validator.
///
/// # Errors
/// The first [`AnalysisError`](crate::error::AnalysisError) encountered by
/// either pass aborts the analysis.
pub fn analyze<R: ResolveType + ?Sized>(programs: &[Program], resolver: &R) -> Result<Analysis> {
    analyze_with(programs, resolver, AnalyzeOptions::default())
}

/// Analyze a compilation unit with explicit options.
pub fn analyze_with<R: ResolveType + ?Sized>(
    programs: &[Program],
    resolver: &R,
    options: AnalyzeOptions,
) -> Result<Analysis> {
    let mut analysis = Analysis::new();
    for program in programs {
        StubPass::run(&mut analysis, program)?;
    }
    for program in programs {
        BindPass::run(&mut analysis, resolver, program)?;
    }
    bind::bind_machine_payloads(&mut analysis);
    if options.validate {
        validation::validate(&analysis);
    }
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::types::ScopedTypeResolver;

    #[test]
    fn test_empty_unit_has_only_builtins() {
        let analysis = analyze(&[], &ScopedTypeResolver).unwrap();

        let names: Vec<_> = analysis
            .scopes
            .all_decls(analysis.top_scope)
            .map(|d| analysis.decls.name_of(d).to_string())
            .collect();
        assert_eq!(names, vec!["halt", "null"]);

        let halt = analysis.builtin_event("halt").unwrap();
        assert!(analysis.decls.events[halt].node.is_none());
        assert!(analysis.builtin_event("missing").is_none());
        assert!(analysis.node_to_decl.is_empty());
    }
}
