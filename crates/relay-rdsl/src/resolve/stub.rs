//! Declaration stub pass (pass 1).
//!
//! Walks each program tree creating *empty* declarations and populating
//! scopes, so that the binding pass can resolve references regardless of
//! textual order.
//!
//! # What this pass does
//!
//! 1. **Creates declarations** — one per declaration-producing node, with
//!    identity only (name + originating node)
//! 2. **Populates scopes** — every name enters its enclosing scope under
//!    the collision matrix
//! 3. **Builds the node maps** — node → declaration for every created
//!    declaration, node → scope for every scope-bearing node (program
//!    root, machine, state group, named function, anonymous handler)
//! 4. **Links enum parentage** — each element attaches to the innermost
//!    enum
//!
//! # What this pass does NOT do
//!
//! - No attribute filling: payload types, parameter types, handlers,
//!   transitions, enum values all stay at their defaults
//! - No anonymous-handler Function objects (the binder creates those; the
//!   handler's *scope* is created here so its parameters and locals can be
//!   stub-created inside it)
//! - No formal parameters for function prototypes (they never enter any
//!   scope)

use tracing::{debug, trace};

use crate::ast::{self, walk_program, NodeId, Program, Visit};
use crate::error::{AnalysisError, Result};
use crate::foundation::Id;
use crate::resolve::decl::{DeclId, EnumDef};
use crate::resolve::scope::ScopeId;
use crate::resolve::Analysis;

pub(crate) struct StubPass<'a> {
    analysis: &'a mut Analysis,
    scope_stack: Vec<ScopeId>,
    current_enum: Option<Id<EnumDef>>,
    current_program: Option<NodeId>,
}

impl<'a> StubPass<'a> {
    /// Run the stub pass over one program tree.
    pub(crate) fn run(analysis: &'a mut Analysis, program: &Program) -> Result<()> {
        debug!(decls = program.decls.len(), "stub pass");
        let mut pass = Self {
            analysis,
            scope_stack: Vec::new(),
            current_enum: None,
            current_program: None,
        };
        walk_program(&mut pass, program)
    }

    fn scope(&self) -> ScopeId {
        *self
            .scope_stack
            .last()
            .expect("stub pass visited a node outside any scope")
    }

    /// Register a created declaration in the node map and the per-program
    /// declaration list.
    fn record(&mut self, node: NodeId, decl: DeclId) {
        trace!(decl_name = self.analysis.decls.name_of(decl), ?decl, "stub");
        let prev = self.analysis.node_to_decl.insert(node, decl);
        debug_assert!(prev.is_none(), "node {node} produced two declarations");
        if let Some(program) = self.current_program {
            self.analysis
                .program_decls
                .entry(program)
                .or_default()
                .push(decl);
        }
    }

    /// Create a child of the current scope for a scope-bearing node and
    /// make it current.
    fn open_scope(&mut self, node: NodeId) {
        let scope = self.analysis.scopes.add_scope(Some(self.scope()));
        self.analysis.node_to_scope.insert(node, scope);
        self.scope_stack.push(scope);
    }
}

impl Visit for StubPass<'_> {
    type Error = AnalysisError;

    fn enter_program(&mut self, node: &Program) -> Result<()> {
        // Program roots share the single top-level scope: declarations of
        // every file in the unit are mutually visible.
        self.analysis
            .node_to_scope
            .insert(node.id, self.analysis.top_scope);
        self.scope_stack.push(self.analysis.top_scope);
        self.current_program = Some(node.id);
        self.analysis.program_decls.entry(node.id).or_default();
        Ok(())
    }

    fn exit_program(&mut self, _node: &Program) -> Result<()> {
        self.scope_stack.pop();
        self.current_program = None;
        Ok(())
    }

    fn visit_event(&mut self, node: &ast::EventDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_event(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::Event(id));
        Ok(())
    }

    fn visit_event_set(&mut self, node: &ast::EventSetDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_event_set(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::EventSet(id));
        Ok(())
    }

    fn enter_enum(&mut self, node: &ast::EnumDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_enum(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::Enum(id));
        self.current_enum = Some(id);
        Ok(())
    }

    fn exit_enum(&mut self, _node: &ast::EnumDecl) -> Result<()> {
        self.current_enum = None;
        Ok(())
    }

    fn visit_enum_elem(&mut self, node: &ast::EnumElemDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_enum_elem(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::EnumElem(id));
        let parent = self
            .current_enum
            .expect("enum element outside an enum declaration");
        self.analysis.decls.attach_enum_elem(parent, id);
        Ok(())
    }

    fn visit_type_def(&mut self, node: &ast::TypeDefDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_typedef(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::TypeDef(id));
        Ok(())
    }

    fn visit_interface(&mut self, node: &ast::InterfaceDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_interface(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::Interface(id));
        Ok(())
    }

    fn enter_machine(&mut self, node: &ast::MachineDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_machine(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
            node.is_spec,
        )?;
        self.record(node.id, DeclId::Machine(id));
        self.open_scope(node.id);
        Ok(())
    }

    fn exit_machine(&mut self, _node: &ast::MachineDecl) -> Result<()> {
        self.scope_stack.pop();
        Ok(())
    }

    fn visit_machine_proto(&mut self, node: &ast::MachineProtoDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_machine_proto(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::MachineProto(id));
        Ok(())
    }

    fn enter_function(&mut self, node: &ast::FunctionDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_function(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::Function(id));
        self.open_scope(node.id);
        Ok(())
    }

    fn exit_function(&mut self, _node: &ast::FunctionDecl) -> Result<()> {
        self.scope_stack.pop();
        Ok(())
    }

    fn visit_function_proto(&mut self, node: &ast::FunctionProtoDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_function_proto(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::FunctionProto(id));
        Ok(())
    }

    fn visit_param(&mut self, node: &ast::ParamDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_variable(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
            true,
        )?;
        self.record(node.id, DeclId::Variable(id));
        Ok(())
    }

    fn visit_var(&mut self, node: &ast::VarDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_variable(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
            false,
        )?;
        self.record(node.id, DeclId::Variable(id));
        Ok(())
    }

    fn enter_anon_function(&mut self, node: &ast::AnonFunction) -> Result<()> {
        // Scope only: the binder creates the Function object.
        self.open_scope(node.id);
        Ok(())
    }

    fn exit_anon_function(&mut self, _node: &ast::AnonFunction) -> Result<()> {
        self.scope_stack.pop();
        Ok(())
    }

    fn enter_group(&mut self, node: &ast::StateGroupDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_group(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::StateGroup(id));
        self.open_scope(node.id);
        Ok(())
    }

    fn exit_group(&mut self, _node: &ast::StateGroupDecl) -> Result<()> {
        self.scope_stack.pop();
        Ok(())
    }

    fn enter_state(&mut self, node: &ast::StateDecl) -> Result<()> {
        let scope = self.scope();
        let id = self.analysis.scopes.put_state(
            &mut self.analysis.decls,
            scope,
            &node.name.name,
            node.id,
        )?;
        self.record(node.id, DeclId::State(id));
        Ok(())
    }
}
