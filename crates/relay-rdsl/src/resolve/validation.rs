//! Declaration-graph validator.
//!
//! Debug-only traversal asserting every structural invariant of a
//! successful analysis, one predicate set per declaration kind, dispatched
//! by a match over [`DeclId`]. A violated predicate is an implementation
//! error in the resolver, not a user error, so failures panic rather than
//! return.
//!
//! # What this pass checks
//!
//! 1. **Node map bidirectionality** — `node_to_decl(d.node) == d` both
//!    ways; declarations without a node are exactly the built-in events
//!    and the binder's anonymous event sets
//! 2. **Scope membership** — every named declaration sits in exactly one
//!    scope's local table
//! 3. **Link coherence** — enum parentage, machine method ownership,
//!    start-state uniqueness and reachability, field/parameter flags
//!
//! Production analyses may skip this pass entirely
//! ([`AnalyzeOptions::validate`](crate::resolve::AnalyzeOptions)).

use std::collections::HashMap;

use crate::foundation::Id;
use crate::resolve::decl::{DeclId, Declarations, Function, Machine, State};
use crate::resolve::Analysis;

/// Assert every invariant of a completed analysis.
///
/// # Panics
/// Panics on the first violated predicate, naming the declaration.
pub fn validate(analysis: &Analysis) {
    let decls = &analysis.decls;

    // Node → declaration map agrees with each declaration's back-reference.
    for (node, decl) in &analysis.node_to_decl {
        assert_eq!(
            decls.node_of(*decl),
            Some(*node),
            "node map entry for {node} disagrees with declaration '{}'",
            decls.name_of(*decl)
        );
    }

    // How often each declaration appears across all scope tables.
    let mut scoped: HashMap<DeclId, usize> = HashMap::new();
    for scope in analysis.scopes.scope_ids() {
        for decl in analysis.scopes.all_decls(scope) {
            *scoped.entry(decl).or_default() += 1;
        }
    }

    for decl in all_decl_ids(decls) {
        check_node_link(analysis, decl);
        check_scope_membership(decls, &scoped, decl);

        match decl {
            DeclId::Event(id) => {
                let event = &decls.events[id];
                assert!(
                    event.node.is_some() || matches!(event.name.as_str(), "halt" | "null"),
                    "event '{}' has no originating node and is not a built-in",
                    event.name
                );
            }
            DeclId::EventSet(id) => {
                let set = &decls.event_sets[id];
                assert!(
                    set.node.is_some() || set.name.contains('$'),
                    "event set '{}' has no originating node and is not anonymous",
                    set.name
                );
            }
            DeclId::EnumElem(id) => {
                let elem = &decls.enum_elems[id];
                let parent = elem
                    .parent
                    .unwrap_or_else(|| panic!("enum element '{}' has no parent", elem.name));
                assert!(
                    decls.enums[parent].values.contains(&id),
                    "enum '{}' does not list element '{}'",
                    decls.enums[parent].name,
                    elem.name
                );
            }
            DeclId::Function(id) => check_function(decls, id),
            DeclId::FunctionProto(id) => {
                let proto = &decls.function_protos[id];
                assert!(
                    !proto.name.is_empty(),
                    "function prototype without a name"
                );
            }
            DeclId::Interface(id) => {
                assert!(
                    decls.interfaces[id].receives.is_some(),
                    "interface '{}' has no receivable event set",
                    decls.interfaces[id].name
                );
            }
            DeclId::Machine(id) => check_machine(decls, id),
            DeclId::Enum(_)
            | DeclId::TypeDef(_)
            | DeclId::MachineProto(_)
            | DeclId::StateGroup(_)
            | DeclId::State(_)
            | DeclId::Variable(_) => {}
        }
    }
}

/// Every declaration id across all per-kind arenas.
fn all_decl_ids(decls: &Declarations) -> impl Iterator<Item = DeclId> + '_ {
    decls
        .events
        .keys()
        .map(DeclId::Event)
        .chain(decls.event_sets.keys().map(DeclId::EventSet))
        .chain(decls.enums.keys().map(DeclId::Enum))
        .chain(decls.enum_elems.keys().map(DeclId::EnumElem))
        .chain(decls.typedefs.keys().map(DeclId::TypeDef))
        .chain(decls.interfaces.keys().map(DeclId::Interface))
        .chain(decls.machines.keys().map(DeclId::Machine))
        .chain(decls.machine_protos.keys().map(DeclId::MachineProto))
        .chain(decls.functions.keys().map(DeclId::Function))
        .chain(decls.function_protos.keys().map(DeclId::FunctionProto))
        .chain(decls.groups.keys().map(DeclId::StateGroup))
        .chain(decls.states.keys().map(DeclId::State))
        .chain(decls.variables.keys().map(DeclId::Variable))
}

fn check_node_link(analysis: &Analysis, decl: DeclId) {
    if let Some(node) = analysis.decls.node_of(decl) {
        assert_eq!(
            analysis.node_to_decl.get(&node),
            Some(&decl),
            "declaration '{}' is not the node map entry for its node {node}",
            analysis.decls.name_of(decl)
        );
    }
}

fn check_scope_membership(decls: &Declarations, scoped: &HashMap<DeclId, usize>, decl: DeclId) {
    // Anonymous handlers and anonymous event sets are reachable only
    // through their owners and never enter a scope.
    let anonymous = match decl {
        DeclId::Function(id) => decls.functions[id].is_anon(),
        DeclId::EventSet(id) => decls.event_sets[id].node.is_none(),
        _ => false,
    };
    let count = scoped.get(&decl).copied().unwrap_or(0);
    if anonymous {
        assert_eq!(
            count,
            0,
            "anonymous declaration '{}' leaked into a scope",
            decls.name_of(decl)
        );
    } else {
        assert_eq!(
            count,
            1,
            "declaration '{}' appears in {count} scopes",
            decls.name_of(decl)
        );
    }
}

fn check_function(decls: &Declarations, id: Id<Function>) {
    let function = &decls.functions[id];
    if let Some(owner) = function.owner {
        assert!(
            decls.machines[owner].methods.contains(&id),
            "machine '{}' does not list function '{}' as a method",
            decls.machines[owner].name,
            if function.name.is_empty() {
                "<anonymous>"
            } else {
                &function.name
            }
        );
    }
    for &param in &function.signature.params {
        assert!(
            decls.variables[param].is_param,
            "signature parameter '{}' is not flagged as a parameter",
            decls.variables[param].name
        );
    }
}

fn check_machine(decls: &Declarations, id: Id<Machine>) {
    let machine = &decls.machines[id];
    let start = machine
        .start_state
        .unwrap_or_else(|| panic!("machine '{}' has no start state", machine.name));

    let all_states = flatten_states(decls, machine);
    assert!(
        all_states.contains(&start),
        "machine '{}' start state is not among its states",
        machine.name
    );
    for &state in &all_states {
        assert_eq!(
            decls.states[state].is_start,
            state == start,
            "machine '{}' has a stray start marker on state '{}'",
            machine.name,
            decls.states[state].name
        );
    }
    for &field in &machine.fields {
        assert!(
            !decls.variables[field].is_param,
            "machine '{}' field '{}' is flagged as a parameter",
            machine.name,
            decls.variables[field].name
        );
    }
}

/// All states of a machine: top-level plus those in nested groups.
fn flatten_states(decls: &Declarations, machine: &Machine) -> Vec<Id<State>> {
    let mut states = machine.states.clone();
    let mut stack = machine.groups.clone();
    while let Some(group) = stack.pop() {
        states.extend(&decls.groups[group].states);
        stack.extend(&decls.groups[group].groups);
    }
    states
}
