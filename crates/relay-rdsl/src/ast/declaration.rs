//! Declaration AST for Relay program units.
//!
//! These types are the contract between the parser and the resolver: the
//! parser builds one [`Program`] per source file, assigning every production
//! a fresh [`NodeId`]; the resolver walks the trees through the visitor in
//! [`crate::ast::visit`] and never mutates them.
//!
//! # Design
//!
//! - **Program** — one parsed compilation-unit member (a source file)
//! - **TopDecl** — thin wrapper enum for all top-level declaration forms
//! - Machine bodies, state groups, and states nest through their own
//!   member enums
//! - Anonymous handlers ([`AnonFunction`]) appear at state slots, at
//!   transitions, and in receive cases inside function bodies
//!
//! Multi-name variable declarations (`var a, b: T;`) are split by the
//! parser into one [`VarDecl`] node per name, so every declaration-producing
//! node yields exactly one declaration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::types::TypeExpr;
use crate::foundation::Span;

/// Opaque handle to a parse-tree position, assigned by the parser.
///
/// Node ids are unique within a compilation unit and are the key of the
/// resolver's node ↔ declaration and node → scope maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An identifier occurrence in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    /// Identifier text
    pub name: String,
    /// Source location
    pub span: Span,
}

/// One parsed program unit (source file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: NodeId,
    pub span: Span,
    /// Top-level declarations in source order
    pub decls: Vec<TopDecl>,
}

/// Top-level declaration variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TopDecl {
    Event(EventDecl),
    EventSet(EventSetDecl),
    Enum(EnumDecl),
    TypeDef(TypeDefDecl),
    Interface(InterfaceDecl),
    Machine(MachineDecl),
    MachineProto(MachineProtoDecl),
    Function(FunctionDecl),
    FunctionProto(FunctionProtoDecl),
}

/// Cardinality marker on events and machines: `assume N` or `assert N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundKind {
    Assume,
    Assert,
}

/// A parsed cardinality bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub kind: BoundKind,
    /// Integer literal from source
    pub value: i64,
    pub span: Span,
}

/// Annotation block attached to a declaration.
///
/// Annotations are parsed but not implemented by this front-end; the binder
/// rejects any declaration that carries one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub span: Span,
    pub entries: Vec<Annotation>,
}

/// A single `key = value` annotation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub key: Ident,
    pub value: String,
}

/// `event Name [assume N | assert N] [: PayloadType];`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    /// Payload type; absent means the null payload
    pub payload: Option<TypeExpr>,
    pub bound: Option<Bound>,
    pub annotations: Option<AnnotationSet>,
}

/// `eventset Name = { e1, e2, … };`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSetDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    /// Member event names, in source order
    pub events: Vec<Ident>,
}

/// `enum Name { Elem [= N], … }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub elems: Vec<EnumElemDecl>,
}

/// One enum element, plain or numbered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumElemDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    /// `Some` for `Elem = N`, `None` for a plain element
    pub value: Option<i64>,
}

/// `type Name = T;` — a bodyless `type Name;` is a foreign type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    /// Right-hand side; `None` marks a foreign type declaration
    pub alias: Option<TypeExpr>,
}

/// `interface Name(Payload) receives …;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub payload: Option<TypeExpr>,
    pub receives: EventSetRef,
}

/// Receivable-event source: a named event set or an inline literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventSetRef {
    /// `= SetName`
    Named(Ident),
    /// `= { e1, e2, … }`
    Literal(Vec<Ident>),
}

/// `machine Name …` or `spec Name observes e1, e2 …`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    /// Spec (observer) machine rather than an implementation machine
    pub is_spec: bool,
    pub bound: Option<Bound>,
    /// Implemented interface names (`machine M : I1, I2`)
    pub interfaces: Vec<Ident>,
    /// Observed event names; meaningful only when `is_spec`
    pub observes: Vec<Ident>,
    pub members: Vec<MachineMember>,
    pub annotations: Option<AnnotationSet>,
}

/// Body items of a machine, in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MachineMember {
    Field(VarDecl),
    Function(FunctionDecl),
    Group(StateGroupDecl),
    State(StateDecl),
    Receives(EventListDecl),
    Sends(EventListDecl),
}

/// `receives e1, e2;` / `sends e1, e2;` inside a machine body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListDecl {
    pub id: NodeId,
    pub span: Span,
    pub events: Vec<Ident>,
}

/// `extern machine Name(Payload);`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineProtoDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub payload: Option<TypeExpr>,
}

/// `extern fun Name(params) [: Ret] [creates M1, M2];`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionProtoDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub ret: Option<TypeExpr>,
    /// Machines this prototype may construct
    pub creates: Vec<Ident>,
}

/// `fun Name(params) [: Ret] { … }` — a bodyless function is foreign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub ret: Option<TypeExpr>,
    /// `None` marks a foreign (bodyless) function declaration
    pub body: Option<FunctionBody>,
    pub annotations: Option<AnnotationSet>,
}

/// Declaration-relevant content of a function body.
///
/// Statements and expressions are opaque to this front-end; the body
/// exposes only what the resolver binds: local variable declarations and
/// receive cases whose handlers are anonymous functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionBody {
    pub span: Span,
    pub locals: Vec<VarDecl>,
    pub receives: Vec<ReceiveCase>,
}

/// `receive { case e1, e2: handler }` arm inside a function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveCase {
    pub id: NodeId,
    pub span: Span,
    pub events: Vec<Ident>,
    pub handler: AnonFunction,
}

/// An anonymous handler: inline function at a state slot, a transition, or
/// a receive case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonFunction {
    pub id: NodeId,
    pub span: Span,
    pub params: Vec<ParamDecl>,
    pub ret: Option<TypeExpr>,
    pub body: FunctionBody,
}

/// A formal parameter occurrence: `name: T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
}

/// A variable declaration: machine field or function local.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub ty: TypeExpr,
}

/// `group Name { … }` — groups nest arbitrarily deep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateGroupDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub members: Vec<GroupMember>,
}

/// Body items of a state group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GroupMember {
    State(StateDecl),
    Group(StateGroupDecl),
}

/// State temperature marker. Defaults to `Warm` when no marker is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Temperature {
    #[default]
    Warm,
    Hot,
    Cold,
}

/// `[start] [hot|cold] state Name { … }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub is_start: bool,
    pub temperature: Temperature,
    pub items: Vec<StateItem>,
    pub annotations: Option<AnnotationSet>,
}

/// Body items of a state, in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateItem {
    Entry(HandlerSlot),
    Exit(HandlerSlot),
    On(OnHandler),
}

/// An entry/exit slot naming a function or carrying an inline handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerSlot {
    pub id: NodeId,
    pub span: Span,
    pub fun: HandlerRef,
}

/// Reference to a handler implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HandlerRef {
    /// A function named in scope
    Named(Ident),
    /// An inline anonymous handler
    Anon(AnonFunction),
}

/// `on e1, e2 <action>;` inside a state body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnHandler {
    pub id: NodeId,
    pub span: Span,
    /// Triggering event names; every listed event receives the same action
    pub events: Vec<Ident>,
    pub action: ActionDecl,
}

/// The action half of an `on` handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionDecl {
    Defer,
    Ignore,
    Do(HandlerRef),
    Goto {
        target: StatePath,
        /// Optional transition function run during the transition
        with: Option<HandlerRef>,
    },
    Push {
        target: StatePath,
    },
}

/// A group-qualified state name: `g1.g2.state`, groups possibly empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatePath {
    pub span: Span,
    pub groups: Vec<Ident>,
    pub state: Ident,
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for g in &self.groups {
            write!(f, "{}.", g.name)?;
        }
        write!(f, "{}", self.state.name)
    }
}
