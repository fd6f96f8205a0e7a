//! Declaration binding pass (pass 2).
//!
//! Second traversal over the same trees. The scope stack is reconstructed
//! from the node → scope map the stub pass wrote, through the visitor's
//! on-every-node hooks; all names are therefore visible before any of them
//! is used, regardless of textual order.
//!
//! # What this pass does
//!
//! - Resolves payload, parameter, return, and typedef types through the
//!   [`ResolveType`] collaborator, always passing the current scope
//! - Resolves every cross-declaration reference: event-set members,
//!   interface lists, creates lists, state handlers, transition targets
//! - Creates anonymous-handler Function objects and anonymous event sets
//! - Assigns enum element values and machine start states
//! - Rejects recognized-but-unimplemented constructs (annotation sets,
//!   foreign types, foreign functions, prototypes as state handlers)
//!
//! # Traversal state
//!
//! The binder keeps "current" slots — innermost enum, machine, state — a
//! stack of functions (anonymous handlers nest inside named functions) and
//! a stack of state groups, all private to the traversal. An anonymous
//! handler learns what it is attached to from the `pending` slot its
//! mentioning production filled just before the walker descends into it.

use tracing::{debug, warn};

use crate::ast::{
    self, walk_program, ActionDecl, EventSetRef, HandlerRef, Ident, NodeId, Program, StatePath,
    Visit,
};
use crate::error::{AnalysisError, Result};
use crate::foundation::Id;
use crate::resolve::decl::{
    DeclId, DeclKind, EnumDef, Event, EventSet, FormalParameter, Function, Machine, Signature,
    State, StateAction, StateGroup, StateParent,
};
use crate::resolve::scope::ScopeId;
use crate::resolve::types::{ResolveType, Type};
use crate::resolve::Analysis;

/// What the next anonymous handler is attached to.
enum Pending {
    Entry(Id<State>),
    Exit(Id<State>),
    /// `on e1, e2 do <anon>` — actions not yet inserted
    Do {
        state: Id<State>,
        events: Vec<Id<Event>>,
    },
    /// `on e1, e2 goto T with <anon>` — Goto actions already inserted,
    /// their transition slot gets patched
    Transition {
        state: Id<State>,
        events: Vec<Id<Event>>,
    },
    /// Receive case in a function body
    ReceiveCase,
}

/// Post-binding sweep: each machine's payload is what its start state's
/// entry handler returns, `Null` when there is no entry.
///
/// Runs after every program has been bound, so a named entry handler
/// declared anywhere in the machine body has its signature filled by the
/// time the payload is read; member order never matters.
pub(crate) fn bind_machine_payloads(analysis: &mut Analysis) {
    let machines: Vec<_> = analysis.decls.machines.keys().collect();
    for machine in machines {
        let payload = analysis.decls.machines[machine]
            .start_state
            .and_then(|state| analysis.decls.states[state].entry)
            .map(|entry| {
                analysis.decls.functions[entry]
                    .signature
                    .return_type
                    .clone()
            })
            .unwrap_or(Type::Null);
        analysis.decls.machines[machine].payload = payload;
    }
}

pub(crate) struct BindPass<'a, R: ?Sized> {
    analysis: &'a mut Analysis,
    resolver: &'a R,
    scope_stack: Vec<ScopeId>,
    current_enum: Option<Id<EnumDef>>,
    current_machine: Option<Id<Machine>>,
    /// The machine's own scope; group-qualified state paths resolve
    /// against it
    machine_scope: Option<ScopeId>,
    current_state: Option<Id<State>>,
    fn_stack: Vec<Id<Function>>,
    group_stack: Vec<Id<StateGroup>>,
    pending: Option<Pending>,
}

impl<'a, R: ResolveType + ?Sized> BindPass<'a, R> {
    /// Run the binding pass over one program tree.
    pub(crate) fn run(analysis: &'a mut Analysis, resolver: &'a R, program: &Program) -> Result<()> {
        debug!(decls = program.decls.len(), "binding pass");
        let mut pass = Self {
            analysis,
            resolver,
            scope_stack: Vec::new(),
            current_enum: None,
            current_machine: None,
            machine_scope: None,
            current_state: None,
            fn_stack: Vec::new(),
            group_stack: Vec::new(),
            pending: None,
        };
        walk_program(&mut pass, program)
    }

    fn scope(&self) -> ScopeId {
        *self
            .scope_stack
            .last()
            .expect("binding pass visited a node outside any scope")
    }

    /// Declaration the stub pass created for `node`.
    fn decl_of(&self, node: NodeId) -> DeclId {
        *self
            .analysis
            .node_to_decl
            .get(&node)
            .expect("binding pass reached a node the stub pass never declared")
    }

    /// Resolve a type subtree in the current scope.
    fn resolve_ty_expr(&self, expr: &ast::TypeExpr) -> Result<Type> {
        self.resolver.resolve_type(
            &self.analysis.scopes,
            &self.analysis.decls,
            self.scope(),
            expr,
        )
    }

    /// Resolve an optional type subtree; absent types are the null type.
    fn resolve_ty(&self, expr: &Option<ast::TypeExpr>) -> Result<Type> {
        match expr {
            Some(expr) => self.resolve_ty_expr(expr),
            None => Ok(Type::Null),
        }
    }

    fn reject_annotations(
        &self,
        annotations: &Option<ast::AnnotationSet>,
        node: NodeId,
    ) -> Result<()> {
        if annotations.is_some() {
            return Err(AnalysisError::NotImplemented {
                feature: "annotation sets",
                node,
            });
        }
        Ok(())
    }

    /// Lookup an event by name in the current scope.
    fn lookup_event(&self, name: &Ident, node: NodeId) -> Result<Id<Event>> {
        match self
            .analysis
            .scopes
            .lookup(self.scope(), DeclKind::Event, &name.name)
        {
            Some(DeclId::Event(id)) => Ok(id),
            _ => Err(AnalysisError::MissingDeclaration {
                kind: DeclKind::Event,
                name: name.name.clone(),
                node,
            }),
        }
    }

    /// Fill an event set from a literal list of event names.
    fn bind_event_list(
        &mut self,
        set: Id<EventSet>,
        events: &[Ident],
        node: NodeId,
    ) -> Result<()> {
        for ident in events {
            let Some(DeclId::Event(event)) =
                self.analysis
                    .scopes
                    .lookup(self.scope(), DeclKind::Event, &ident.name)
            else {
                return Err(AnalysisError::MissingEvent {
                    set: self.analysis.decls.event_sets[set].name.clone(),
                    name: ident.name.clone(),
                    node,
                });
            };
            self.analysis.decls.event_sets[set].insert(&ident.name, event);
        }
        Ok(())
    }

    /// Resolve a state-handler reference to a named function.
    ///
    /// A name that resolves to a function prototype is recognized but
    /// unimplemented; anything else unresolved is a missing declaration.
    fn resolve_handler_fn(&self, name: &Ident, node: NodeId) -> Result<Id<Function>> {
        let scope = self.scope();
        match self
            .analysis
            .scopes
            .lookup(scope, DeclKind::Function, &name.name)
        {
            Some(DeclId::Function(id)) => Ok(id),
            _ => {
                if self
                    .analysis
                    .scopes
                    .lookup(scope, DeclKind::FunctionProto, &name.name)
                    .is_some()
                {
                    Err(AnalysisError::NotImplemented {
                        feature: "function prototypes as state handlers",
                        node,
                    })
                } else {
                    Err(AnalysisError::MissingDeclaration {
                        kind: DeclKind::Function,
                        name: name.name.clone(),
                        node,
                    })
                }
            }
        }
    }

    /// Resolve a group-qualified state path against the machine's scope.
    ///
    /// Each step is strictly local — group paths are absolute within the
    /// machine, so no ancestor chain is consulted.
    fn resolve_state_path(&self, path: &StatePath, node: NodeId) -> Result<Id<State>> {
        let mut scope = self
            .machine_scope
            .expect("state transition outside a machine");
        for group in &path.groups {
            match self
                .analysis
                .scopes
                .get(scope, DeclKind::StateGroup, &group.name)
            {
                Some(DeclId::StateGroup(id)) => {
                    let group_node = self.analysis.decls.groups[id]
                        .node
                        .expect("source-declared group has a node");
                    scope = self.analysis.node_to_scope[&group_node];
                }
                _ => {
                    return Err(AnalysisError::MissingDeclaration {
                        kind: DeclKind::StateGroup,
                        name: group.name.clone(),
                        node,
                    })
                }
            }
        }
        match self
            .analysis
            .scopes
            .get(scope, DeclKind::State, &path.state.name)
        {
            Some(DeclId::State(id)) => Ok(id),
            _ => Err(AnalysisError::MissingDeclaration {
                kind: DeclKind::State,
                name: path.state.name.clone(),
                node,
            }),
        }
    }

    /// Resolve an on-handler's event list, rejecting events the state
    /// already handles (including duplicates within the list itself).
    fn resolve_trigger_events(
        &self,
        state: Id<State>,
        events: &[Ident],
        node: NodeId,
    ) -> Result<Vec<Id<Event>>> {
        let mut resolved: Vec<Id<Event>> = Vec::with_capacity(events.len());
        for ident in events {
            let event = self.lookup_event(ident, node)?;
            let already = self.analysis.decls.states[state].actions.contains_key(&event)
                || resolved.contains(&event);
            if already {
                return Err(AnalysisError::DuplicateHandler {
                    event: ident.name.clone(),
                    state: self.analysis.decls.states[state].name.clone(),
                    node,
                });
            }
            resolved.push(event);
        }
        Ok(resolved)
    }

    fn insert_actions(
        &mut self,
        state: Id<State>,
        events: &[Id<Event>],
        make: impl Fn(Id<Event>) -> StateAction,
    ) {
        for &event in events {
            self.analysis.decls.states[state].actions.insert(event, make(event));
        }
    }

    fn check_entry_free(&self, state: Id<State>, node: NodeId) -> Result<()> {
        if self.analysis.decls.states[state].entry.is_some() {
            return Err(AnalysisError::DuplicateEntry {
                state: self.analysis.decls.states[state].name.clone(),
                node,
            });
        }
        Ok(())
    }

    fn check_exit_free(&self, state: Id<State>, node: NodeId) -> Result<()> {
        if self.analysis.decls.states[state].exit.is_some() {
            return Err(AnalysisError::DuplicateExit {
                state: self.analysis.decls.states[state].name.clone(),
                node,
            });
        }
        Ok(())
    }
}

impl<R: ResolveType + ?Sized> Visit for BindPass<'_, R> {
    type Error = AnalysisError;

    fn enter_any(&mut self, node: NodeId) -> Result<()> {
        // The stub pass recorded a scope for every scope-bearing node;
        // entering one makes it current.
        if let Some(&scope) = self.analysis.node_to_scope.get(&node) {
            self.scope_stack.push(scope);
        }
        Ok(())
    }

    fn exit_any(&mut self, node: NodeId) -> Result<()> {
        if self.analysis.node_to_scope.contains_key(&node) {
            self.scope_stack.pop();
        }
        Ok(())
    }

    fn visit_event(&mut self, node: &ast::EventDecl) -> Result<()> {
        self.reject_annotations(&node.annotations, node.id)?;
        let DeclId::Event(id) = self.decl_of(node.id) else {
            unreachable!("event node bound to non-event declaration");
        };
        let payload = self.resolve_ty(&node.payload)?;
        let event = &mut self.analysis.decls.events[id];
        event.payload = payload;
        if let Some(bound) = &node.bound {
            match bound.kind {
                ast::BoundKind::Assume => event.card.assume = bound.value,
                ast::BoundKind::Assert => event.card.assert = bound.value,
            }
        }
        Ok(())
    }

    fn visit_event_set(&mut self, node: &ast::EventSetDecl) -> Result<()> {
        let DeclId::EventSet(id) = self.decl_of(node.id) else {
            unreachable!("event set node bound to non-event-set declaration");
        };
        self.bind_event_list(id, &node.events, node.id)
    }

    fn enter_enum(&mut self, node: &ast::EnumDecl) -> Result<()> {
        let DeclId::Enum(id) = self.decl_of(node.id) else {
            unreachable!("enum node bound to non-enum declaration");
        };
        self.current_enum = Some(id);
        Ok(())
    }

    fn exit_enum(&mut self, _node: &ast::EnumDecl) -> Result<()> {
        self.current_enum = None;
        Ok(())
    }

    fn visit_enum_elem(&mut self, node: &ast::EnumElemDecl) -> Result<()> {
        let DeclId::EnumElem(id) = self.decl_of(node.id) else {
            unreachable!("enum element node bound to non-element declaration");
        };
        let parent = self
            .current_enum
            .expect("enum element outside an enum declaration");
        let bound_before = self.analysis.decls.enums[parent].count as usize;
        let value = self.analysis.decls.assign_enum_value(id, node.value);

        // Interleaved plain and numbered elements can collide; the value
        // stands as written, never renumbered.
        let decls = &self.analysis.decls;
        let clash = decls.enums[parent].values[..bound_before]
            .iter()
            .any(|&sibling| decls.enum_elems[sibling].value == value);
        if clash {
            warn!(
                enum_name = %decls.enums[parent].name,
                elem = %node.name.name,
                value,
                "enum element value collides with an earlier element"
            );
        }
        Ok(())
    }

    fn visit_type_def(&mut self, node: &ast::TypeDefDecl) -> Result<()> {
        let DeclId::TypeDef(id) = self.decl_of(node.id) else {
            unreachable!("typedef node bound to non-typedef declaration");
        };
        let Some(alias) = &node.alias else {
            return Err(AnalysisError::NotImplemented {
                feature: "foreign types",
                node: node.id,
            });
        };
        let ty = self.resolve_ty_expr(alias)?;
        self.analysis.decls.typedefs[id].ty = Some(ty);
        Ok(())
    }

    fn visit_interface(&mut self, node: &ast::InterfaceDecl) -> Result<()> {
        let DeclId::Interface(id) = self.decl_of(node.id) else {
            unreachable!("interface node bound to non-interface declaration");
        };
        let payload = self.resolve_ty(&node.payload)?;
        self.analysis.decls.interfaces[id].payload = payload;

        let set = match &node.receives {
            EventSetRef::Named(name) => match self.analysis.scopes.lookup(
                self.scope(),
                DeclKind::EventSet,
                &name.name,
            ) {
                Some(DeclId::EventSet(set)) => set,
                _ => {
                    return Err(AnalysisError::MissingDeclaration {
                        kind: DeclKind::EventSet,
                        name: name.name.clone(),
                        node: node.id,
                    })
                }
            },
            EventSetRef::Literal(events) => {
                let set = self.analysis.decls.anonymous_event_set(&node.name.name);
                self.bind_event_list(set, events, node.id)?;
                set
            }
        };
        self.analysis.decls.interfaces[id].receives = Some(set);
        Ok(())
    }

    fn enter_machine(&mut self, node: &ast::MachineDecl) -> Result<()> {
        self.reject_annotations(&node.annotations, node.id)?;
        let DeclId::Machine(id) = self.decl_of(node.id) else {
            unreachable!("machine node bound to non-machine declaration");
        };
        self.current_machine = Some(id);
        self.machine_scope = Some(self.analysis.node_to_scope[&node.id]);

        if let Some(bound) = &node.bound {
            let machine = &mut self.analysis.decls.machines[id];
            match bound.kind {
                ast::BoundKind::Assume => machine.card.assume = bound.value,
                ast::BoundKind::Assert => machine.card.assert = bound.value,
            }
        }

        for name in &node.interfaces {
            match self
                .analysis
                .scopes
                .lookup(self.scope(), DeclKind::Interface, &name.name)
            {
                Some(DeclId::Interface(iface)) => {
                    self.analysis.decls.machines[id].interfaces.push(iface);
                }
                _ => {
                    return Err(AnalysisError::MissingDeclaration {
                        kind: DeclKind::Interface,
                        name: name.name.clone(),
                        node: node.id,
                    })
                }
            }
        }

        if node.is_spec {
            // The observe list is mandatory for spec machines; it becomes
            // an anonymous set named `<MachineName>$eventset`.
            let set = self.analysis.decls.anonymous_event_set(&node.name.name);
            self.bind_event_list(set, &node.observes, node.id)?;
            self.analysis.decls.machines[id].observes = Some(set);
        }
        Ok(())
    }

    fn exit_machine(&mut self, node: &ast::MachineDecl) -> Result<()> {
        let id = self.current_machine.take().expect("unbalanced machine exit");
        self.machine_scope = None;
        if self.analysis.decls.machines[id].start_state.is_none() {
            return Err(AnalysisError::MachineWithoutStartState {
                machine: node.name.name.clone(),
                node: node.id,
            });
        }
        Ok(())
    }

    fn visit_machine_proto(&mut self, node: &ast::MachineProtoDecl) -> Result<()> {
        let DeclId::MachineProto(id) = self.decl_of(node.id) else {
            unreachable!("machine prototype node bound to other declaration");
        };
        let payload = self.resolve_ty(&node.payload)?;
        self.analysis.decls.machine_protos[id].payload = payload;
        Ok(())
    }

    fn visit_receives(
        &mut self,
        machine: &ast::MachineDecl,
        node: &ast::EventListDecl,
    ) -> Result<()> {
        let id = self.current_machine.expect("receives outside a machine");
        let set = match self.analysis.decls.machines[id].receives {
            Some(set) => set,
            None => {
                let set = self.analysis.decls.anonymous_event_set(&machine.name.name);
                self.analysis.decls.machines[id].receives = Some(set);
                set
            }
        };
        self.bind_event_list(set, &node.events, node.id)
    }

    fn visit_sends(
        &mut self,
        machine: &ast::MachineDecl,
        node: &ast::EventListDecl,
    ) -> Result<()> {
        let id = self.current_machine.expect("sends outside a machine");
        let set = match self.analysis.decls.machines[id].sends {
            Some(set) => set,
            None => {
                let set = self.analysis.decls.anonymous_event_set(&machine.name.name);
                self.analysis.decls.machines[id].sends = Some(set);
                set
            }
        };
        self.bind_event_list(set, &node.events, node.id)
    }

    fn enter_function(&mut self, node: &ast::FunctionDecl) -> Result<()> {
        self.reject_annotations(&node.annotations, node.id)?;
        if node.body.is_none() {
            return Err(AnalysisError::NotImplemented {
                feature: "foreign functions",
                node: node.id,
            });
        }
        let DeclId::Function(id) = self.decl_of(node.id) else {
            unreachable!("function node bound to non-function declaration");
        };
        let ret = self.resolve_ty(&node.ret)?;
        let function = &mut self.analysis.decls.functions[id];
        function.owner = self.current_machine;
        function.signature.return_type = ret;
        if let Some(machine) = self.current_machine {
            self.analysis.decls.machines[machine].methods.push(id);
        }
        self.fn_stack.push(id);
        Ok(())
    }

    fn exit_function(&mut self, _node: &ast::FunctionDecl) -> Result<()> {
        self.fn_stack.pop();
        Ok(())
    }

    fn visit_function_proto(&mut self, node: &ast::FunctionProtoDecl) -> Result<()> {
        let DeclId::FunctionProto(id) = self.decl_of(node.id) else {
            unreachable!("function prototype node bound to other declaration");
        };
        let ret = self.resolve_ty(&node.ret)?;
        let mut signature = Signature {
            params: Vec::with_capacity(node.params.len()),
            return_type: ret,
        };
        // Formal parameters never enter a scope.
        for param in &node.params {
            let ty = self.resolve_ty_expr(&param.ty)?;
            signature.params.push(FormalParameter {
                name: param.name.name.clone(),
                ty,
            });
        }
        let mut creates = Vec::with_capacity(node.creates.len());
        for name in &node.creates {
            match self
                .analysis
                .scopes
                .lookup(self.scope(), DeclKind::Machine, &name.name)
            {
                Some(DeclId::Machine(machine)) => creates.push(machine),
                _ => {
                    return Err(AnalysisError::MissingDeclaration {
                        kind: DeclKind::Machine,
                        name: name.name.clone(),
                        node: node.id,
                    })
                }
            }
        }
        let proto = &mut self.analysis.decls.function_protos[id];
        proto.signature = signature;
        proto.creates = creates;
        Ok(())
    }

    fn visit_param(&mut self, node: &ast::ParamDecl) -> Result<()> {
        let DeclId::Variable(id) = self.decl_of(node.id) else {
            unreachable!("parameter node bound to non-variable declaration");
        };
        let ty = self.resolve_ty_expr(&node.ty)?;
        self.analysis.decls.variables[id].ty = ty;
        let function = *self
            .fn_stack
            .last()
            .expect("parameter outside a function");
        self.analysis.decls.functions[function].signature.params.push(id);
        Ok(())
    }

    fn visit_var(&mut self, node: &ast::VarDecl) -> Result<()> {
        let DeclId::Variable(id) = self.decl_of(node.id) else {
            unreachable!("variable node bound to non-variable declaration");
        };
        let ty = self.resolve_ty_expr(&node.ty)?;
        self.analysis.decls.variables[id].ty = ty;
        if let Some(&function) = self.fn_stack.last() {
            self.analysis.decls.functions[function].locals.push(id);
        } else if let Some(machine) = self.current_machine {
            // A var in a machine body outside any function is a field.
            self.analysis.decls.machines[machine].fields.push(id);
        }
        Ok(())
    }

    fn visit_receive_case(&mut self, node: &ast::ReceiveCase) -> Result<()> {
        for ident in &node.events {
            self.lookup_event(ident, node.id)?;
        }
        self.pending = Some(Pending::ReceiveCase);
        Ok(())
    }

    fn enter_anon_function(&mut self, node: &ast::AnonFunction) -> Result<()> {
        let ret = self.resolve_ty(&node.ret)?;
        let id = self.analysis.decls.functions.insert(Function {
            name: String::new(),
            node: Some(node.id),
            owner: self.current_machine,
            signature: Signature {
                params: Vec::new(),
                return_type: ret,
            },
            locals: Vec::new(),
        });
        self.analysis
            .node_to_decl
            .insert(node.id, DeclId::Function(id));
        // Owned functions, anonymous ones included, join the machine's
        // method list; the slot below additionally mentions the handler.
        if let Some(machine) = self.current_machine {
            self.analysis.decls.machines[machine].methods.push(id);
        }

        match self.pending.take() {
            Some(Pending::Entry(state)) => {
                self.analysis.decls.states[state].entry = Some(id);
            }
            Some(Pending::Exit(state)) => {
                self.analysis.decls.states[state].exit = Some(id);
            }
            Some(Pending::Do { state, events }) => {
                self.insert_actions(state, &events, |event| StateAction::Do {
                    event,
                    function: id,
                });
            }
            Some(Pending::Transition { state, events }) => {
                for event in events {
                    if let Some(StateAction::Goto { transition, .. }) =
                        self.analysis.decls.states[state].actions.get_mut(&event)
                    {
                        *transition = Some(id);
                    }
                }
            }
            // Receive-case handlers carry no slot to fill; the function
            // object itself is the binding.
            Some(Pending::ReceiveCase) | None => {}
        }

        self.fn_stack.push(id);
        Ok(())
    }

    fn exit_anon_function(&mut self, _node: &ast::AnonFunction) -> Result<()> {
        self.fn_stack.pop();
        Ok(())
    }

    fn enter_group(&mut self, node: &ast::StateGroupDecl) -> Result<()> {
        let DeclId::StateGroup(id) = self.decl_of(node.id) else {
            unreachable!("group node bound to non-group declaration");
        };
        if let Some(&parent) = self.group_stack.last() {
            self.analysis.decls.groups[id].parent = Some(StateParent::Group(parent));
            self.analysis.decls.groups[parent].groups.push(id);
        } else {
            let machine = self.current_machine.expect("group outside a machine");
            self.analysis.decls.groups[id].parent = Some(StateParent::Machine(machine));
            self.analysis.decls.machines[machine].groups.push(id);
        }
        self.group_stack.push(id);
        Ok(())
    }

    fn exit_group(&mut self, _node: &ast::StateGroupDecl) -> Result<()> {
        self.group_stack.pop();
        Ok(())
    }

    fn enter_state(&mut self, node: &ast::StateDecl) -> Result<()> {
        self.reject_annotations(&node.annotations, node.id)?;
        let DeclId::State(id) = self.decl_of(node.id) else {
            unreachable!("state node bound to non-state declaration");
        };
        self.current_state = Some(id);
        self.analysis.decls.states[id].temperature = node.temperature;

        let machine = self.current_machine.expect("state outside a machine");
        if node.is_start {
            if self.analysis.decls.machines[machine].start_state.is_some() {
                return Err(AnalysisError::DuplicateStartState {
                    machine: self.analysis.decls.machines[machine].name.clone(),
                    state: node.name.name.clone(),
                    node: node.id,
                });
            }
            self.analysis.decls.states[id].is_start = true;
            self.analysis.decls.machines[machine].start_state = Some(id);
        }

        if let Some(&group) = self.group_stack.last() {
            self.analysis.decls.states[id].parent = Some(StateParent::Group(group));
            self.analysis.decls.groups[group].states.push(id);
        } else {
            self.analysis.decls.states[id].parent = Some(StateParent::Machine(machine));
            self.analysis.decls.machines[machine].states.push(id);
        }
        Ok(())
    }

    fn exit_state(&mut self, _node: &ast::StateDecl) -> Result<()> {
        self.current_state
            .take()
            .expect("unbalanced state exit");
        Ok(())
    }

    fn visit_state_entry(
        &mut self,
        _state: &ast::StateDecl,
        slot: &ast::HandlerSlot,
    ) -> Result<()> {
        let state = self.current_state.expect("entry slot outside a state");
        match &slot.fun {
            HandlerRef::Named(name) => {
                let function = self.resolve_handler_fn(name, slot.id)?;
                self.check_entry_free(state, slot.id)?;
                self.analysis.decls.states[state].entry = Some(function);
            }
            HandlerRef::Anon(_) => {
                self.check_entry_free(state, slot.id)?;
                self.pending = Some(Pending::Entry(state));
            }
        }
        Ok(())
    }

    fn visit_state_exit(
        &mut self,
        _state: &ast::StateDecl,
        slot: &ast::HandlerSlot,
    ) -> Result<()> {
        let state = self.current_state.expect("exit slot outside a state");
        match &slot.fun {
            HandlerRef::Named(name) => {
                let function = self.resolve_handler_fn(name, slot.id)?;
                self.check_exit_free(state, slot.id)?;
                self.analysis.decls.states[state].exit = Some(function);
            }
            HandlerRef::Anon(_) => {
                self.check_exit_free(state, slot.id)?;
                self.pending = Some(Pending::Exit(state));
            }
        }
        Ok(())
    }

    fn visit_on_handler(&mut self, _state: &ast::StateDecl, node: &ast::OnHandler) -> Result<()> {
        let state = self.current_state.expect("on handler outside a state");
        let events = self.resolve_trigger_events(state, &node.events, node.id)?;

        match &node.action {
            ActionDecl::Defer => {
                self.insert_actions(state, &events, |event| StateAction::Defer { event });
            }
            ActionDecl::Ignore => {
                self.insert_actions(state, &events, |event| StateAction::Ignore { event });
            }
            ActionDecl::Do(HandlerRef::Named(name)) => {
                let function = self.resolve_handler_fn(name, node.id)?;
                self.insert_actions(state, &events, |event| StateAction::Do {
                    event,
                    function,
                });
            }
            ActionDecl::Do(HandlerRef::Anon(_)) => {
                self.pending = Some(Pending::Do { state, events });
            }
            ActionDecl::Goto { target, with } => {
                let target = self.resolve_state_path(target, node.id)?;
                self.insert_actions(state, &events, |event| StateAction::Goto {
                    event,
                    target,
                    transition: None,
                });
                match with {
                    None => {}
                    Some(HandlerRef::Named(name)) => {
                        let function = self.resolve_handler_fn(name, node.id)?;
                        for &event in &events {
                            if let Some(StateAction::Goto { transition, .. }) =
                                self.analysis.decls.states[state].actions.get_mut(&event)
                            {
                                *transition = Some(function);
                            }
                        }
                    }
                    Some(HandlerRef::Anon(_)) => {
                        self.pending = Some(Pending::Transition { state, events });
                    }
                }
            }
            ActionDecl::Push { target } => {
                let target = self.resolve_state_path(target, node.id)?;
                self.insert_actions(state, &events, |event| StateAction::Push {
                    event,
                    target,
                });
            }
        }
        Ok(())
    }
}
