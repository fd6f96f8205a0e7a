//! Lexical scopes and the declaration table.
//!
//! A [`Scope`] is a lexical container partitioned into one name map per
//! declaration kind, linked to an optional parent. Scopes form a tree
//! rooted at the top-level scope; because parent/child links make the
//! graph cyclic, scopes live in an arena inside [`ScopeTree`] and refer to
//! each other through [`ScopeId`] handles.
//!
//! # Operations
//!
//! - kind-typed `put_*` — create the declaration, check the collision
//!   matrix against the **local** scope only, insert, return the handle
//! - [`ScopeTree::get`] — local lookup by (kind, name)
//! - [`ScopeTree::lookup`] — ancestor-chained lookup by (kind, name);
//!   cross-scope shadowing is permitted
//! - [`ScopeTree::all_decls`] — deterministic iteration of local entries
//!
//! # Collision matrix
//!
//! Name conflicts are asymmetric: the rule set is indexed by the kind
//! being *inserted*, not the kind already present. An enum constant may
//! coexist with a variable but not with an event; a machine may share a
//! name with a machine prototype while a typedef may not. The matrix is
//! exactly the union of name-reference positions reachable by identifier.

use indexmap::IndexMap;

use crate::ast::NodeId;
use crate::error::{AnalysisError, Result};
use crate::foundation::{Arena, Id};
use crate::resolve::decl::{
    Cardinality, DeclId, DeclKind, Declarations, EnumDef, EnumElem, Event, EventSet, Function,
    FunctionProto, Interface, Machine, MachineProto, Signature, State, StateGroup, TypeDef,
    Variable,
};
use crate::resolve::types::Type;

/// Handle to a scope in the [`ScopeTree`].
pub type ScopeId = Id<Scope>;

/// One lexical scope: per-kind name maps plus tree links.
///
/// Insertion order is preserved per map, keeping [`ScopeTree::all_decls`]
/// deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    events: IndexMap<String, Id<Event>>,
    event_sets: IndexMap<String, Id<EventSet>>,
    enums: IndexMap<String, Id<EnumDef>>,
    enum_elems: IndexMap<String, Id<EnumElem>>,
    typedefs: IndexMap<String, Id<TypeDef>>,
    interfaces: IndexMap<String, Id<Interface>>,
    machines: IndexMap<String, Id<Machine>>,
    machine_protos: IndexMap<String, Id<MachineProto>>,
    functions: IndexMap<String, Id<Function>>,
    function_protos: IndexMap<String, Id<FunctionProto>>,
    groups: IndexMap<String, Id<StateGroup>>,
    states: IndexMap<String, Id<State>>,
    variables: IndexMap<String, Id<Variable>>,
}

impl Scope {
    /// Local entry for (kind, name), if any.
    ///
    /// `SpecMachine` reads the machine namespace: spec machines are stored
    /// there and differ only in their insertion rule.
    fn local(&self, kind: DeclKind, name: &str) -> Option<DeclId> {
        match kind {
            DeclKind::Event => self.events.get(name).map(|id| DeclId::Event(*id)),
            DeclKind::EventSet => self.event_sets.get(name).map(|id| DeclId::EventSet(*id)),
            DeclKind::Enum => self.enums.get(name).map(|id| DeclId::Enum(*id)),
            DeclKind::EnumElem => self.enum_elems.get(name).map(|id| DeclId::EnumElem(*id)),
            DeclKind::TypeDef => self.typedefs.get(name).map(|id| DeclId::TypeDef(*id)),
            DeclKind::Interface => self.interfaces.get(name).map(|id| DeclId::Interface(*id)),
            DeclKind::Machine | DeclKind::SpecMachine => {
                self.machines.get(name).map(|id| DeclId::Machine(*id))
            }
            DeclKind::MachineProto => self
                .machine_protos
                .get(name)
                .map(|id| DeclId::MachineProto(*id)),
            DeclKind::Function => self.functions.get(name).map(|id| DeclId::Function(*id)),
            DeclKind::FunctionProto => self
                .function_protos
                .get(name)
                .map(|id| DeclId::FunctionProto(*id)),
            DeclKind::StateGroup => self.groups.get(name).map(|id| DeclId::StateGroup(*id)),
            DeclKind::State => self.states.get(name).map(|id| DeclId::State(*id)),
            DeclKind::Variable => self.variables.get(name).map(|id| DeclId::Variable(*id)),
        }
    }
}

/// Kinds whose local presence blocks inserting `kind` under the same name.
fn conflict_kinds(kind: DeclKind) -> &'static [DeclKind] {
    use DeclKind::*;
    match kind {
        TypeDef => &[TypeDef, Enum, Interface, Machine, MachineProto],
        Enum => &[Enum, Interface, TypeDef, Machine, MachineProto],
        Event => &[Event, EnumElem],
        EventSet => &[EventSet],
        Interface => &[Interface, Enum, TypeDef, Machine, MachineProto],
        Machine => &[Machine, Interface, Enum, TypeDef],
        SpecMachine => &[Machine, Interface, Enum, TypeDef],
        MachineProto => &[MachineProto, Interface, Enum, TypeDef],
        Function => &[Function],
        FunctionProto => &[FunctionProto],
        StateGroup => &[StateGroup],
        EnumElem => &[EnumElem, Event],
        Variable => &[Variable],
        State => &[State],
    }
}

/// Arena of scopes forming the lexical tree of a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Arena<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope, linked under `parent` when given.
    pub fn add_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = self.scopes.insert(Scope {
            parent,
            ..Scope::default()
        });
        if let Some(parent) = parent {
            self.scopes[parent].children.push(id);
        }
        id
    }

    /// Re-parent a scope, keeping both sides of the link consistent: the
    /// scope is removed from its old parent's children and added to the
    /// new parent's.
    pub fn set_parent(&mut self, scope: ScopeId, parent: Option<ScopeId>) {
        if let Some(old) = self.scopes[scope].parent {
            self.scopes[old].children.retain(|c| *c != scope);
        }
        self.scopes[scope].parent = parent;
        if let Some(new) = parent {
            self.scopes[new].children.push(scope);
        }
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope].parent
    }

    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.scopes[scope].children
    }

    /// All scope handles, in creation order.
    pub fn scope_ids(&self) -> impl ExactSizeIterator<Item = ScopeId> {
        self.scopes.keys()
    }

    /// Local entry only.
    pub fn get(&self, scope: ScopeId, kind: DeclKind, name: &str) -> Option<DeclId> {
        self.scopes[scope].local(kind, name)
    }

    /// Walk parent links until the entry is found or the chain is
    /// exhausted.
    pub fn lookup(&self, scope: ScopeId, kind: DeclKind, name: &str) -> Option<DeclId> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(found) = self.scopes[s].local(kind, name) {
                return Some(found);
            }
            current = self.scopes[s].parent;
        }
        None
    }

    /// Every local declaration across all kinds, kind-by-kind in a fixed
    /// order, insertion order within a kind.
    pub fn all_decls(&self, scope: ScopeId) -> impl Iterator<Item = DeclId> + '_ {
        let s = &self.scopes[scope];
        let events = s.events.values().map(|id| DeclId::Event(*id));
        let event_sets = s.event_sets.values().map(|id| DeclId::EventSet(*id));
        let enums = s.enums.values().map(|id| DeclId::Enum(*id));
        let enum_elems = s.enum_elems.values().map(|id| DeclId::EnumElem(*id));
        let typedefs = s.typedefs.values().map(|id| DeclId::TypeDef(*id));
        let interfaces = s.interfaces.values().map(|id| DeclId::Interface(*id));
        let machines = s.machines.values().map(|id| DeclId::Machine(*id));
        let machine_protos = s.machine_protos.values().map(|id| DeclId::MachineProto(*id));
        let functions = s.functions.values().map(|id| DeclId::Function(*id));
        let function_protos = s
            .function_protos
            .values()
            .map(|id| DeclId::FunctionProto(*id));
        let groups = s.groups.values().map(|id| DeclId::StateGroup(*id));
        let states = s.states.values().map(|id| DeclId::State(*id));
        let variables = s.variables.values().map(|id| DeclId::Variable(*id));
        events
            .chain(event_sets)
            .chain(enums)
            .chain(enum_elems)
            .chain(typedefs)
            .chain(interfaces)
            .chain(machines)
            .chain(machine_protos)
            .chain(functions)
            .chain(function_protos)
            .chain(groups)
            .chain(states)
            .chain(variables)
    }

    /// Collision-matrix check for inserting (kind, name) into `scope`.
    ///
    /// `new` is the already-created declaration so the error can carry
    /// both parties; on conflict it stays in the arena, never enters a
    /// scope, and the analysis aborts.
    fn check_conflicts(
        &self,
        scope: ScopeId,
        kind: DeclKind,
        name: &str,
        new: DeclId,
        node: NodeId,
    ) -> Result<()> {
        for &against in conflict_kinds(kind) {
            if let Some(existing) = self.scopes[scope].local(against, name) {
                return Err(AnalysisError::DuplicateDeclaration {
                    name: name.to_string(),
                    kind,
                    new,
                    node,
                    existing,
                });
            }
        }
        Ok(())
    }

    pub fn put_event(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<Event>> {
        let id = decls.events.insert(Event {
            name: name.to_string(),
            node: Some(node),
            payload: Type::Null,
            card: Cardinality::default(),
        });
        self.check_conflicts(scope, DeclKind::Event, name, DeclId::Event(id), node)?;
        self.scopes[scope].events.insert(name.to_string(), id);
        Ok(id)
    }

    /// Insert one of the built-in events (`halt`, `null`): no originating
    /// node, no conflict check (the top-level scope is seeded first).
    pub(crate) fn insert_builtin_event(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
    ) -> Id<Event> {
        let id = decls.events.insert(Event {
            name: name.to_string(),
            node: None,
            payload: Type::Null,
            card: Cardinality::default(),
        });
        self.scopes[scope].events.insert(name.to_string(), id);
        id
    }

    pub fn put_event_set(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<EventSet>> {
        let mut set = EventSet::default();
        set.name = name.to_string();
        set.node = Some(node);
        let id = decls.event_sets.insert(set);
        self.check_conflicts(scope, DeclKind::EventSet, name, DeclId::EventSet(id), node)?;
        self.scopes[scope].event_sets.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_enum(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<EnumDef>> {
        let id = decls.enums.insert(EnumDef {
            name: name.to_string(),
            node: Some(node),
            values: Vec::new(),
            count: 0,
        });
        self.check_conflicts(scope, DeclKind::Enum, name, DeclId::Enum(id), node)?;
        self.scopes[scope].enums.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_enum_elem(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<EnumElem>> {
        let id = decls.enum_elems.insert(EnumElem {
            name: name.to_string(),
            node: Some(node),
            value: 0,
            parent: None,
        });
        self.check_conflicts(scope, DeclKind::EnumElem, name, DeclId::EnumElem(id), node)?;
        self.scopes[scope].enum_elems.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_typedef(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<TypeDef>> {
        let id = decls.typedefs.insert(TypeDef {
            name: name.to_string(),
            node: Some(node),
            ty: None,
        });
        self.check_conflicts(scope, DeclKind::TypeDef, name, DeclId::TypeDef(id), node)?;
        self.scopes[scope].typedefs.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_interface(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<Interface>> {
        let id = decls.interfaces.insert(Interface {
            name: name.to_string(),
            node: Some(node),
            payload: Type::Null,
            receives: None,
        });
        self.check_conflicts(scope, DeclKind::Interface, name, DeclId::Interface(id), node)?;
        self.scopes[scope].interfaces.insert(name.to_string(), id);
        Ok(id)
    }

    /// Insert a machine. `is_spec` selects the spec-machine collision row;
    /// both forms share the machine namespace.
    pub fn put_machine(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
        is_spec: bool,
    ) -> Result<Id<Machine>> {
        let kind = if is_spec {
            DeclKind::SpecMachine
        } else {
            DeclKind::Machine
        };
        let id = decls.machines.insert(Machine {
            name: name.to_string(),
            node: Some(node),
            is_spec,
            payload: Type::Null,
            card: Cardinality::default(),
            interfaces: Vec::new(),
            receives: None,
            sends: None,
            observes: None,
            fields: Vec::new(),
            methods: Vec::new(),
            states: Vec::new(),
            groups: Vec::new(),
            start_state: None,
        });
        self.check_conflicts(scope, kind, name, DeclId::Machine(id), node)?;
        self.scopes[scope].machines.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_machine_proto(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<MachineProto>> {
        let id = decls.machine_protos.insert(MachineProto {
            name: name.to_string(),
            node: Some(node),
            payload: Type::Null,
        });
        self.check_conflicts(
            scope,
            DeclKind::MachineProto,
            name,
            DeclId::MachineProto(id),
            node,
        )?;
        self.scopes[scope]
            .machine_protos
            .insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_function(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<Function>> {
        let id = decls.functions.insert(Function {
            name: name.to_string(),
            node: Some(node),
            owner: None,
            signature: Signature::default(),
            locals: Vec::new(),
        });
        self.check_conflicts(scope, DeclKind::Function, name, DeclId::Function(id), node)?;
        self.scopes[scope].functions.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_function_proto(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<FunctionProto>> {
        let id = decls.function_protos.insert(FunctionProto {
            name: name.to_string(),
            node: Some(node),
            signature: Signature::default(),
            creates: Vec::new(),
        });
        self.check_conflicts(
            scope,
            DeclKind::FunctionProto,
            name,
            DeclId::FunctionProto(id),
            node,
        )?;
        self.scopes[scope]
            .function_protos
            .insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_group(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<StateGroup>> {
        let id = decls.groups.insert(StateGroup {
            name: name.to_string(),
            node: Some(node),
            parent: None,
            states: Vec::new(),
            groups: Vec::new(),
        });
        self.check_conflicts(scope, DeclKind::StateGroup, name, DeclId::StateGroup(id), node)?;
        self.scopes[scope].groups.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_state(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
    ) -> Result<Id<State>> {
        let id = decls.states.insert(State {
            name: name.to_string(),
            node: Some(node),
            parent: None,
            temperature: Default::default(),
            is_start: false,
            entry: None,
            exit: None,
            actions: Default::default(),
        });
        self.check_conflicts(scope, DeclKind::State, name, DeclId::State(id), node)?;
        self.scopes[scope].states.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn put_variable(
        &mut self,
        decls: &mut Declarations,
        scope: ScopeId,
        name: &str,
        node: NodeId,
        is_param: bool,
    ) -> Result<Id<Variable>> {
        let id = decls.variables.insert(Variable {
            name: name.to_string(),
            node: Some(node),
            ty: Type::Null,
            is_param,
        });
        self.check_conflicts(scope, DeclKind::Variable, name, DeclId::Variable(id), node)?;
        self.scopes[scope].variables.insert(name.to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (ScopeTree, Declarations, ScopeId) {
        let mut scopes = ScopeTree::new();
        let root = scopes.add_scope(None);
        (scopes, Declarations::new(), root)
    }

    #[test]
    fn test_put_and_local_get() {
        let (mut scopes, mut decls, root) = fixture();
        let id = scopes.put_event(&mut decls, root, "ePing", NodeId(1)).unwrap();

        assert_eq!(
            scopes.get(root, DeclKind::Event, "ePing"),
            Some(DeclId::Event(id))
        );
        assert_eq!(scopes.get(root, DeclKind::Event, "ePong"), None);
        assert_eq!(scopes.get(root, DeclKind::EventSet, "ePing"), None);
    }

    #[test]
    fn test_lookup_walks_ancestors_and_allows_shadowing() {
        let (mut scopes, mut decls, root) = fixture();
        let inner = scopes.add_scope(Some(root));
        let outer_var = scopes
            .put_variable(&mut decls, root, "x", NodeId(1), false)
            .unwrap();

        // Visible from the child through the chain.
        assert_eq!(
            scopes.lookup(inner, DeclKind::Variable, "x"),
            Some(DeclId::Variable(outer_var))
        );
        // Not a *local* entry of the child.
        assert_eq!(scopes.get(inner, DeclKind::Variable, "x"), None);

        // Shadowing in the child scope is permitted.
        let inner_var = scopes
            .put_variable(&mut decls, inner, "x", NodeId(2), true)
            .unwrap();
        assert_eq!(
            scopes.lookup(inner, DeclKind::Variable, "x"),
            Some(DeclId::Variable(inner_var))
        );
        assert_eq!(
            scopes.lookup(root, DeclKind::Variable, "x"),
            Some(DeclId::Variable(outer_var))
        );
    }

    #[test]
    fn test_collision_same_kind() {
        let (mut scopes, mut decls, root) = fixture();
        scopes.put_event(&mut decls, root, "e", NodeId(1)).unwrap();
        let err = scopes.put_event(&mut decls, root, "e", NodeId(2)).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DuplicateDeclaration {
                kind: DeclKind::Event,
                ..
            }
        ));
    }

    #[test]
    fn test_collision_matrix_is_asymmetric() {
        // A machine prototype may take a name a machine already holds…
        let (mut scopes, mut decls, root) = fixture();
        scopes
            .put_machine(&mut decls, root, "M", NodeId(1), false)
            .unwrap();
        assert!(scopes.put_machine_proto(&mut decls, root, "M", NodeId(2)).is_ok());

        // …but a typedef may not take a name a machine prototype holds.
        scopes
            .put_machine_proto(&mut decls, root, "P", NodeId(3))
            .unwrap();
        assert!(scopes.put_typedef(&mut decls, root, "P", NodeId(4)).is_err());
    }

    #[test]
    fn test_event_conflicts_with_enum_elem() {
        let (mut scopes, mut decls, root) = fixture();
        scopes.put_enum_elem(&mut decls, root, "A", NodeId(1)).unwrap();
        let err = scopes.put_event(&mut decls, root, "A", NodeId(2)).unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateDeclaration { .. }));

        // And the reverse direction.
        scopes.put_event(&mut decls, root, "B", NodeId(3)).unwrap();
        assert!(scopes.put_enum_elem(&mut decls, root, "B", NodeId(4)).is_err());
    }

    #[test]
    fn test_enum_elem_coexists_with_variable() {
        let (mut scopes, mut decls, root) = fixture();
        scopes
            .put_variable(&mut decls, root, "v", NodeId(1), false)
            .unwrap();
        assert!(scopes.put_enum_elem(&mut decls, root, "v", NodeId(2)).is_ok());
    }

    #[test]
    fn test_set_parent_keeps_links_consistent() {
        let mut scopes = ScopeTree::new();
        let a = scopes.add_scope(None);
        let b = scopes.add_scope(None);
        let child = scopes.add_scope(Some(a));

        assert_eq!(scopes.children(a), &[child]);
        scopes.set_parent(child, Some(b));
        assert!(scopes.children(a).is_empty());
        assert_eq!(scopes.children(b), &[child]);
        assert_eq!(scopes.parent(child), Some(b));
    }

    #[test]
    fn test_all_decls_is_deterministic() {
        let (mut scopes, mut decls, root) = fixture();
        scopes.put_event(&mut decls, root, "e2", NodeId(1)).unwrap();
        scopes.put_event(&mut decls, root, "e1", NodeId(2)).unwrap();
        scopes.put_typedef(&mut decls, root, "T", NodeId(3)).unwrap();

        let names: Vec<_> = scopes
            .all_decls(root)
            .map(|d| decls.name_of(d).to_string())
            .collect();
        // Kind order first (events before typedefs), insertion order within.
        assert_eq!(names, vec!["e2", "e1", "T"]);
    }

    #[test]
    fn test_spec_machine_shares_machine_namespace() {
        let (mut scopes, mut decls, root) = fixture();
        scopes
            .put_machine(&mut decls, root, "Watcher", NodeId(1), true)
            .unwrap();
        // A second machine of either form under the same name conflicts.
        assert!(scopes
            .put_machine(&mut decls, root, "Watcher", NodeId(2), false)
            .is_err());
        assert_eq!(
            scopes
                .get(root, DeclKind::Machine, "Watcher")
                .map(|d| matches!(d, DeclId::Machine(_))),
            Some(true)
        );
    }
}
