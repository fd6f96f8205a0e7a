//! Visitor contract for declaration passes.
//!
//! The resolver's two passes subscribe to enter/exit events per declaration
//! production; [`walk_program`] drives them in document order. Every
//! id-carrying production is additionally bracketed by the on-every-node
//! hooks [`Visit::enter_any`] / [`Visit::exit_any`], which the binding pass
//! uses to maintain its scope stack without caring which production it is
//! looking at.
//!
//! # Ordering
//!
//! For a node `n` the walker emits:
//!
//! ```text
//! enter_any(n.id)
//!   enter_n(n) / visit_n(n)
//!     …children, in source order…
//!   exit_n(n)
//! exit_any(n.id)
//! ```
//!
//! so by the time a production-specific `enter_` method runs, any scope the
//! node introduces is already current. All methods return `Result`; the
//! walk short-circuits on the first error.

use crate::ast::declaration::*;

/// Enter/exit listener over a [`Program`] tree.
///
/// Every method has a default empty implementation; passes override only
/// the productions they care about. Leaf productions get a single
/// `visit_*` method; bracketing `enter_*`/`exit_*` pairs exist where a pass
/// needs to track nesting.
pub trait Visit {
    type Error;

    /// Called before any production-specific method, for every id-carrying
    /// node.
    fn enter_any(&mut self, _node: NodeId) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called after the production-specific method, for every id-carrying
    /// node.
    fn exit_any(&mut self, _node: NodeId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_program(&mut self, _node: &Program) -> Result<(), Self::Error> {
        Ok(())
    }
    fn exit_program(&mut self, _node: &Program) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_event(&mut self, _node: &EventDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_event_set(&mut self, _node: &EventSetDecl) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_enum(&mut self, _node: &EnumDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn exit_enum(&mut self, _node: &EnumDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_enum_elem(&mut self, _node: &EnumElemDecl) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_type_def(&mut self, _node: &TypeDefDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_interface(&mut self, _node: &InterfaceDecl) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_machine(&mut self, _node: &MachineDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn exit_machine(&mut self, _node: &MachineDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_machine_proto(&mut self, _node: &MachineProtoDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_receives(
        &mut self,
        _machine: &MachineDecl,
        _node: &EventListDecl,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_sends(
        &mut self,
        _machine: &MachineDecl,
        _node: &EventListDecl,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_function(&mut self, _node: &FunctionDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn exit_function(&mut self, _node: &FunctionDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_function_proto(&mut self, _node: &FunctionProtoDecl) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_param(&mut self, _node: &ParamDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_var(&mut self, _node: &VarDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_receive_case(&mut self, _node: &ReceiveCase) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_anon_function(&mut self, _node: &AnonFunction) -> Result<(), Self::Error> {
        Ok(())
    }
    fn exit_anon_function(&mut self, _node: &AnonFunction) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_group(&mut self, _node: &StateGroupDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn exit_group(&mut self, _node: &StateGroupDecl) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter_state(&mut self, _node: &StateDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn exit_state(&mut self, _node: &StateDecl) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_state_entry(
        &mut self,
        _state: &StateDecl,
        _slot: &HandlerSlot,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_state_exit(
        &mut self,
        _state: &StateDecl,
        _slot: &HandlerSlot,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_on_handler(
        &mut self,
        _state: &StateDecl,
        _node: &OnHandler,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walk one program tree in document order.
pub fn walk_program<V: Visit>(v: &mut V, program: &Program) -> Result<(), V::Error> {
    v.enter_any(program.id)?;
    v.enter_program(program)?;
    for decl in &program.decls {
        walk_top_decl(v, decl)?;
    }
    v.exit_program(program)?;
    v.exit_any(program.id)
}

fn walk_top_decl<V: Visit>(v: &mut V, decl: &TopDecl) -> Result<(), V::Error> {
    match decl {
        TopDecl::Event(node) => {
            v.enter_any(node.id)?;
            v.visit_event(node)?;
            v.exit_any(node.id)
        }
        TopDecl::EventSet(node) => {
            v.enter_any(node.id)?;
            v.visit_event_set(node)?;
            v.exit_any(node.id)
        }
        TopDecl::Enum(node) => walk_enum(v, node),
        TopDecl::TypeDef(node) => {
            v.enter_any(node.id)?;
            v.visit_type_def(node)?;
            v.exit_any(node.id)
        }
        TopDecl::Interface(node) => {
            v.enter_any(node.id)?;
            v.visit_interface(node)?;
            v.exit_any(node.id)
        }
        TopDecl::Machine(node) => walk_machine(v, node),
        TopDecl::MachineProto(node) => {
            v.enter_any(node.id)?;
            v.visit_machine_proto(node)?;
            v.exit_any(node.id)
        }
        TopDecl::Function(node) => walk_function(v, node),
        TopDecl::FunctionProto(node) => {
            v.enter_any(node.id)?;
            v.visit_function_proto(node)?;
            v.exit_any(node.id)
        }
    }
}

fn walk_enum<V: Visit>(v: &mut V, node: &EnumDecl) -> Result<(), V::Error> {
    v.enter_any(node.id)?;
    v.enter_enum(node)?;
    for elem in &node.elems {
        v.enter_any(elem.id)?;
        v.visit_enum_elem(elem)?;
        v.exit_any(elem.id)?;
    }
    v.exit_enum(node)?;
    v.exit_any(node.id)
}

fn walk_machine<V: Visit>(v: &mut V, node: &MachineDecl) -> Result<(), V::Error> {
    v.enter_any(node.id)?;
    v.enter_machine(node)?;
    for member in &node.members {
        match member {
            MachineMember::Field(var) => walk_var(v, var)?,
            MachineMember::Function(fun) => walk_function(v, fun)?,
            MachineMember::Group(group) => walk_group(v, group)?,
            MachineMember::State(state) => walk_state(v, state)?,
            MachineMember::Receives(list) => {
                v.enter_any(list.id)?;
                v.visit_receives(node, list)?;
                v.exit_any(list.id)?;
            }
            MachineMember::Sends(list) => {
                v.enter_any(list.id)?;
                v.visit_sends(node, list)?;
                v.exit_any(list.id)?;
            }
        }
    }
    v.exit_machine(node)?;
    v.exit_any(node.id)
}

fn walk_var<V: Visit>(v: &mut V, node: &VarDecl) -> Result<(), V::Error> {
    v.enter_any(node.id)?;
    v.visit_var(node)?;
    v.exit_any(node.id)
}

fn walk_function<V: Visit>(v: &mut V, node: &FunctionDecl) -> Result<(), V::Error> {
    v.enter_any(node.id)?;
    v.enter_function(node)?;
    for param in &node.params {
        v.enter_any(param.id)?;
        v.visit_param(param)?;
        v.exit_any(param.id)?;
    }
    if let Some(body) = &node.body {
        walk_function_body(v, body)?;
    }
    v.exit_function(node)?;
    v.exit_any(node.id)
}

fn walk_function_body<V: Visit>(v: &mut V, body: &FunctionBody) -> Result<(), V::Error> {
    for local in &body.locals {
        walk_var(v, local)?;
    }
    for case in &body.receives {
        v.enter_any(case.id)?;
        v.visit_receive_case(case)?;
        walk_anon_function(v, &case.handler)?;
        v.exit_any(case.id)?;
    }
    Ok(())
}

fn walk_anon_function<V: Visit>(v: &mut V, node: &AnonFunction) -> Result<(), V::Error> {
    v.enter_any(node.id)?;
    v.enter_anon_function(node)?;
    for param in &node.params {
        v.enter_any(param.id)?;
        v.visit_param(param)?;
        v.exit_any(param.id)?;
    }
    walk_function_body(v, &node.body)?;
    v.exit_anon_function(node)?;
    v.exit_any(node.id)
}

fn walk_group<V: Visit>(v: &mut V, node: &StateGroupDecl) -> Result<(), V::Error> {
    v.enter_any(node.id)?;
    v.enter_group(node)?;
    for member in &node.members {
        match member {
            GroupMember::State(state) => walk_state(v, state)?,
            GroupMember::Group(group) => walk_group(v, group)?,
        }
    }
    v.exit_group(node)?;
    v.exit_any(node.id)
}

fn walk_state<V: Visit>(v: &mut V, node: &StateDecl) -> Result<(), V::Error> {
    v.enter_any(node.id)?;
    v.enter_state(node)?;
    for item in &node.items {
        match item {
            StateItem::Entry(slot) => {
                v.enter_any(slot.id)?;
                v.visit_state_entry(node, slot)?;
                walk_handler_ref(v, &slot.fun)?;
                v.exit_any(slot.id)?;
            }
            StateItem::Exit(slot) => {
                v.enter_any(slot.id)?;
                v.visit_state_exit(node, slot)?;
                walk_handler_ref(v, &slot.fun)?;
                v.exit_any(slot.id)?;
            }
            StateItem::On(on) => {
                v.enter_any(on.id)?;
                v.visit_on_handler(node, on)?;
                match &on.action {
                    ActionDecl::Do(fun) => walk_handler_ref(v, fun)?,
                    ActionDecl::Goto {
                        with: Some(fun), ..
                    } => walk_handler_ref(v, fun)?,
                    _ => {}
                }
                v.exit_any(on.id)?;
            }
        }
    }
    v.exit_state(node)?;
    v.exit_any(node.id)
}

fn walk_handler_ref<V: Visit>(v: &mut V, fun: &HandlerRef) -> Result<(), V::Error> {
    match fun {
        HandlerRef::Named(_) => Ok(()),
        HandlerRef::Anon(anon) => walk_anon_function(v, anon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Span;

    /// Records the order of every callback it sees.
    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    impl Visit for Recorder {
        type Error = std::convert::Infallible;

        fn enter_any(&mut self, node: NodeId) -> Result<(), Self::Error> {
            self.log.push(format!(">any {node}"));
            Ok(())
        }
        fn exit_any(&mut self, node: NodeId) -> Result<(), Self::Error> {
            self.log.push(format!("<any {node}"));
            Ok(())
        }
        fn enter_machine(&mut self, node: &MachineDecl) -> Result<(), Self::Error> {
            self.log.push(format!(">machine {}", node.name.name));
            Ok(())
        }
        fn exit_machine(&mut self, node: &MachineDecl) -> Result<(), Self::Error> {
            self.log.push(format!("<machine {}", node.name.name));
            Ok(())
        }
        fn enter_state(&mut self, node: &StateDecl) -> Result<(), Self::Error> {
            self.log.push(format!(">state {}", node.name.name));
            Ok(())
        }
    }

    fn ident(name: &str) -> Ident {
        Ident {
            name: name.to_string(),
            span: Span::zero(0),
        }
    }

    #[test]
    fn test_walk_order_brackets_every_node() {
        let program = Program {
            id: NodeId(0),
            span: Span::zero(0),
            decls: vec![TopDecl::Machine(MachineDecl {
                id: NodeId(1),
                span: Span::zero(0),
                name: ident("M"),
                is_spec: false,
                bound: None,
                interfaces: vec![],
                observes: vec![],
                members: vec![MachineMember::State(StateDecl {
                    id: NodeId(2),
                    span: Span::zero(0),
                    name: ident("S"),
                    is_start: true,
                    temperature: Temperature::Warm,
                    items: vec![],
                    annotations: None,
                })],
                annotations: None,
            })],
        };

        let mut rec = Recorder::default();
        walk_program(&mut rec, &program).unwrap();

        assert_eq!(
            rec.log,
            vec![
                ">any #0",
                ">any #1",
                ">machine M",
                ">any #2",
                ">state S",
                "<any #2",
                "<machine M",
                "<any #1",
                "<any #0",
            ]
        );
    }
}
