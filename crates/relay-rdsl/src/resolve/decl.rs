//! Declaration object model.
//!
//! One struct per declaration kind, stored in per-kind arenas inside
//! [`Declarations`] and cross-linked with typed [`Id`] handles. The stub
//! pass creates declarations with identity only (name + originating node);
//! the binding pass fills every other attribute. Field docs note which pass
//! owns them.
//!
//! [`DeclId`] is the kind-tagged union of the per-kind handles, used
//! wherever a reference must range over every kind (scope entries, the
//! node → declaration map, the validator dispatch).

use std::collections::BTreeMap;
use std::fmt;

use crate::ast::{NodeId, Temperature};
use crate::foundation::{Arena, Id};
use crate::resolve::types::Type;

/// Cardinality attached to events and machines.
///
/// `-1` encodes an absent bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub assume: i64,
    pub assert: i64,
}

impl Default for Cardinality {
    fn default() -> Self {
        Self {
            assume: -1,
            assert: -1,
        }
    }
}

/// An event declaration.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    /// Absent only for the built-ins `halt` and `null`
    pub node: Option<NodeId>,
    /// Payload type; bound in pass 2, `Null` when unwritten
    pub payload: Type,
    pub card: Cardinality,
}

/// A set of events, declared (`eventset S = {…}`) or anonymous (owned by a
/// machine or interface, with a synthetic `$eventset` name).
///
/// Membership is keyed by event name so iteration is sorted and
/// deterministic for diagnostics and downstream code generation.
#[derive(Debug, Clone, Default)]
pub struct EventSet {
    pub name: String,
    /// Absent for anonymous sets synthesized by the binder
    pub node: Option<NodeId>,
    events: BTreeMap<String, Id<Event>>,
}

impl EventSet {
    /// Add an event; idempotent for an already-present name.
    pub fn insert(&mut self, name: &str, event: Id<Event>) {
        self.events.insert(name.to_string(), event);
    }

    /// Membership by event name.
    pub fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    /// Events sorted by name.
    pub fn events(&self) -> impl ExactSizeIterator<Item = Id<Event>> + '_ {
        self.events.values().copied()
    }

    /// Event names in sorted order.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// An enum declaration.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub node: Option<NodeId>,
    /// Elements in declaration order; membership set by the stub pass
    pub values: Vec<Id<EnumElem>>,
    /// Running count of elements whose value has been assigned (pass 2)
    pub count: i64,
}

/// One enum constant.
#[derive(Debug, Clone)]
pub struct EnumElem {
    pub name: String,
    pub node: Option<NodeId>,
    /// Assigned in pass 2: the literal, or the parent's running count
    pub value: i64,
    /// Exclusive back-reference; attaching to a new parent detaches
    pub parent: Option<Id<EnumDef>>,
}

/// A typedef declaration.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub node: Option<NodeId>,
    /// Resolved right-hand side; `None` until pass 2
    pub ty: Option<Type>,
}

/// An interface declaration.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub node: Option<NodeId>,
    pub payload: Type,
    /// Receivable events: a declared set or an anonymous owned one
    pub receives: Option<Id<EventSet>>,
}

/// A machine declaration, implementation or spec.
#[derive(Debug, Clone)]
pub struct Machine {
    pub name: String,
    pub node: Option<NodeId>,
    pub is_spec: bool,
    /// What the start state's entry handler returns; set by a sweep after
    /// all signatures are bound
    pub payload: Type,
    pub card: Cardinality,
    pub interfaces: Vec<Id<Interface>>,
    pub receives: Option<Id<EventSet>>,
    pub sends: Option<Id<EventSet>>,
    /// Spec machines only
    pub observes: Option<Id<EventSet>>,
    /// Declaration order
    pub fields: Vec<Id<Variable>>,
    /// Named methods, plus receive-case handlers reached through them
    pub methods: Vec<Id<Function>>,
    /// Top-level states (not those inside groups)
    pub states: Vec<Id<State>>,
    /// Top-level state groups
    pub groups: Vec<Id<StateGroup>>,
    pub start_state: Option<Id<State>>,
}

/// A machine prototype (`extern machine`).
#[derive(Debug, Clone)]
pub struct MachineProto {
    pub name: String,
    pub node: Option<NodeId>,
    pub payload: Type,
}

/// Parent of a state or state group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateParent {
    Machine(Id<Machine>),
    Group(Id<StateGroup>),
}

/// A state group; nests arbitrarily deep.
#[derive(Debug, Clone)]
pub struct StateGroup {
    pub name: String,
    pub node: Option<NodeId>,
    pub parent: Option<StateParent>,
    pub states: Vec<Id<State>>,
    pub groups: Vec<Id<StateGroup>>,
}

/// A state.
#[derive(Debug, Clone)]
pub struct State {
    pub name: String,
    pub node: Option<NodeId>,
    pub parent: Option<StateParent>,
    pub temperature: Temperature,
    pub is_start: bool,
    pub entry: Option<Id<Function>>,
    pub exit: Option<Id<Function>>,
    /// One action per triggering event
    pub actions: BTreeMap<Id<Event>, StateAction>,
}

/// Action bound to a (state, event) pair. Every variant carries its
/// triggering event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateAction {
    Defer {
        event: Id<Event>,
    },
    Ignore {
        event: Id<Event>,
    },
    Do {
        event: Id<Event>,
        function: Id<Function>,
    },
    Goto {
        event: Id<Event>,
        target: Id<State>,
        transition: Option<Id<Function>>,
    },
    Push {
        event: Id<Event>,
        target: Id<State>,
    },
}

impl StateAction {
    /// The triggering event.
    pub fn event(&self) -> Id<Event> {
        match self {
            Self::Defer { event }
            | Self::Ignore { event }
            | Self::Do { event, .. }
            | Self::Goto { event, .. }
            | Self::Push { event, .. } => *event,
        }
    }
}

/// Signature shared by functions and prototypes, generic over the
/// parameter representation (scoped variables vs. formal parameters).
#[derive(Debug, Clone)]
pub struct Signature<P> {
    /// Declaration order
    pub params: Vec<P>,
    /// Defaults to `Null` when unwritten
    pub return_type: Type,
}

impl<P> Default for Signature<P> {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            return_type: Type::Null,
        }
    }
}

/// A function: named method, top-level function, or anonymous handler.
#[derive(Debug, Clone)]
pub struct Function {
    /// Empty for anonymous handlers
    pub name: String,
    pub node: Option<NodeId>,
    /// Machine the function belongs to; `None` for top-level functions
    pub owner: Option<Id<Machine>>,
    pub signature: Signature<Id<Variable>>,
    pub locals: Vec<Id<Variable>>,
}

impl Function {
    pub fn is_anon(&self) -> bool {
        self.name.is_empty()
    }
}

/// A parameter of a function prototype; never entered into any scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormalParameter {
    pub name: String,
    pub ty: Type,
}

/// A function prototype (`extern fun`).
#[derive(Debug, Clone)]
pub struct FunctionProto {
    pub name: String,
    pub node: Option<NodeId>,
    pub signature: Signature<FormalParameter>,
    /// Machines the prototype may construct
    pub creates: Vec<Id<Machine>>,
}

/// A variable: machine field, function local, or formal parameter.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub node: Option<NodeId>,
    /// Bound in pass 2
    pub ty: Type,
    pub is_param: bool,
}

/// Declaration kind, as used by scope insertion and lookup.
///
/// `SpecMachine` exists only as an insertion kind: spec machines live in
/// the machine namespace but follow their own collision rule row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    TypeDef,
    Enum,
    Event,
    EventSet,
    Interface,
    Machine,
    SpecMachine,
    MachineProto,
    Function,
    FunctionProto,
    StateGroup,
    EnumElem,
    Variable,
    State,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TypeDef => "type",
            Self::Enum => "enum",
            Self::Event => "event",
            Self::EventSet => "event set",
            Self::Interface => "interface",
            Self::Machine => "machine",
            Self::SpecMachine => "spec machine",
            Self::MachineProto => "machine prototype",
            Self::Function => "function",
            Self::FunctionProto => "function prototype",
            Self::StateGroup => "state group",
            Self::EnumElem => "enum element",
            Self::Variable => "variable",
            Self::State => "state",
        };
        f.write_str(name)
    }
}

/// Kind-tagged reference to any declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclId {
    Event(Id<Event>),
    EventSet(Id<EventSet>),
    Enum(Id<EnumDef>),
    EnumElem(Id<EnumElem>),
    TypeDef(Id<TypeDef>),
    Interface(Id<Interface>),
    Machine(Id<Machine>),
    MachineProto(Id<MachineProto>),
    Function(Id<Function>),
    FunctionProto(Id<FunctionProto>),
    StateGroup(Id<StateGroup>),
    State(Id<State>),
    Variable(Id<Variable>),
}

/// Per-kind arenas holding every declaration of a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub events: Arena<Event>,
    pub event_sets: Arena<EventSet>,
    pub enums: Arena<EnumDef>,
    pub enum_elems: Arena<EnumElem>,
    pub typedefs: Arena<TypeDef>,
    pub interfaces: Arena<Interface>,
    pub machines: Arena<Machine>,
    pub machine_protos: Arena<MachineProto>,
    pub functions: Arena<Function>,
    pub function_protos: Arena<FunctionProto>,
    pub groups: Arena<StateGroup>,
    pub states: Arena<State>,
    pub variables: Arena<Variable>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of any declaration.
    pub fn name_of(&self, id: DeclId) -> &str {
        match id {
            DeclId::Event(id) => &self.events[id].name,
            DeclId::EventSet(id) => &self.event_sets[id].name,
            DeclId::Enum(id) => &self.enums[id].name,
            DeclId::EnumElem(id) => &self.enum_elems[id].name,
            DeclId::TypeDef(id) => &self.typedefs[id].name,
            DeclId::Interface(id) => &self.interfaces[id].name,
            DeclId::Machine(id) => &self.machines[id].name,
            DeclId::MachineProto(id) => &self.machine_protos[id].name,
            DeclId::Function(id) => &self.functions[id].name,
            DeclId::FunctionProto(id) => &self.function_protos[id].name,
            DeclId::StateGroup(id) => &self.groups[id].name,
            DeclId::State(id) => &self.states[id].name,
            DeclId::Variable(id) => &self.variables[id].name,
        }
    }

    /// Originating syntax node of any declaration.
    pub fn node_of(&self, id: DeclId) -> Option<NodeId> {
        match id {
            DeclId::Event(id) => self.events[id].node,
            DeclId::EventSet(id) => self.event_sets[id].node,
            DeclId::Enum(id) => self.enums[id].node,
            DeclId::EnumElem(id) => self.enum_elems[id].node,
            DeclId::TypeDef(id) => self.typedefs[id].node,
            DeclId::Interface(id) => self.interfaces[id].node,
            DeclId::Machine(id) => self.machines[id].node,
            DeclId::MachineProto(id) => self.machine_protos[id].node,
            DeclId::Function(id) => self.functions[id].node,
            DeclId::FunctionProto(id) => self.function_protos[id].node,
            DeclId::StateGroup(id) => self.groups[id].node,
            DeclId::State(id) => self.states[id].node,
            DeclId::Variable(id) => self.variables[id].node,
        }
    }

    /// Attach an enum element to a parent enum.
    ///
    /// Parentage is exclusive: an element already attached elsewhere is
    /// detached from its previous parent's value list first.
    pub fn attach_enum_elem(&mut self, parent: Id<EnumDef>, elem: Id<EnumElem>) {
        if let Some(old) = self.enum_elems[elem].parent {
            if old == parent {
                return;
            }
            self.enums[old].values.retain(|e| *e != elem);
        }
        self.enum_elems[elem].parent = Some(parent);
        self.enums[parent].values.push(elem);
    }

    /// Assign an enum element's value and bump the parent's running count.
    ///
    /// `literal` is `Some` for a numbered element; a plain element takes
    /// the parent's current count. Returns the assigned value.
    ///
    /// # Panics
    /// Panics if the element was never attached to a parent.
    pub fn assign_enum_value(&mut self, elem: Id<EnumElem>, literal: Option<i64>) -> i64 {
        let parent = self.enum_elems[elem]
            .parent
            .expect("enum element bound before being attached");
        let value = literal.unwrap_or(self.enums[parent].count);
        self.enum_elems[elem].value = value;
        self.enums[parent].count += 1;
        value
    }

    /// Synthesize an anonymous event set owned by a machine or interface.
    ///
    /// Anonymous sets carry no originating node and never enter a scope;
    /// their synthetic name is `<owner>$eventset`.
    pub fn anonymous_event_set(&mut self, owner: &str) -> Id<EventSet> {
        self.event_sets.insert(EventSet {
            name: format!("{owner}$eventset"),
            node: None,
            events: BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(decls: &mut Declarations, name: &str) -> Id<EnumElem> {
        decls.enum_elems.insert(EnumElem {
            name: name.to_string(),
            node: None,
            value: 0,
            parent: None,
        })
    }

    fn enum_def(decls: &mut Declarations, name: &str) -> Id<EnumDef> {
        decls.enums.insert(EnumDef {
            name: name.to_string(),
            node: None,
            values: vec![],
            count: 0,
        })
    }

    #[test]
    fn test_attach_is_exclusive() {
        let mut decls = Declarations::new();
        let a = enum_def(&mut decls, "A");
        let b = enum_def(&mut decls, "B");
        let x = elem(&mut decls, "X");

        decls.attach_enum_elem(a, x);
        assert_eq!(decls.enum_elems[x].parent, Some(a));
        assert_eq!(decls.enums[a].values, vec![x]);

        decls.attach_enum_elem(b, x);
        assert_eq!(decls.enum_elems[x].parent, Some(b));
        assert!(decls.enums[a].values.is_empty());
        assert_eq!(decls.enums[b].values, vec![x]);
    }

    #[test]
    fn test_attach_same_parent_is_idempotent() {
        let mut decls = Declarations::new();
        let a = enum_def(&mut decls, "A");
        let x = elem(&mut decls, "X");

        decls.attach_enum_elem(a, x);
        decls.attach_enum_elem(a, x);
        assert_eq!(decls.enums[a].values, vec![x]);
    }

    #[test]
    fn test_enum_values_interleaved() {
        // enum E { X = 3, Y, Z = 10 } assigns X=3, Y=1, Z=10: a plain
        // element takes the running count of elements bound so far.
        let mut decls = Declarations::new();
        let e = enum_def(&mut decls, "E");
        let x = elem(&mut decls, "X");
        let y = elem(&mut decls, "Y");
        let z = elem(&mut decls, "Z");
        for id in [x, y, z] {
            decls.attach_enum_elem(e, id);
        }

        assert_eq!(decls.assign_enum_value(x, Some(3)), 3);
        assert_eq!(decls.assign_enum_value(y, None), 1);
        assert_eq!(decls.assign_enum_value(z, Some(10)), 10);
        assert_eq!(decls.enums[e].count, 3);
    }

    #[test]
    fn test_event_set_iterates_sorted_by_name() {
        let mut decls = Declarations::new();
        let zulu = decls.events.insert(Event {
            name: "zulu".to_string(),
            node: None,
            payload: Type::Null,
            card: Cardinality::default(),
        });
        let alpha = decls.events.insert(Event {
            name: "alpha".to_string(),
            node: None,
            payload: Type::Null,
            card: Cardinality::default(),
        });

        let set = decls.anonymous_event_set("M");
        decls.event_sets[set].insert("zulu", zulu);
        decls.event_sets[set].insert("alpha", alpha);

        let names: Vec<_> = decls.event_sets[set].names().collect();
        assert_eq!(names, vec!["alpha", "zulu"]);
        let ids: Vec<_> = decls.event_sets[set].events().collect();
        assert_eq!(ids, vec![alpha, zulu]);
        assert_eq!(decls.event_sets[set].name, "M$eventset");
    }
}
