//! Analysis errors.
//!
//! One variant per failure mode of the resolver. Every variant carries the
//! names involved and the [`NodeId`] of the offending syntax node so a
//! driver can map the error back to source. Errors are surfaced, never
//! caught, by the passes: the first error aborts the analysis, and
//! downstream phases must not run on a failed analysis.

use thiserror::Error;

use crate::ast::NodeId;
use crate::resolve::decl::{DeclId, DeclKind};

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failure modes of the declaration resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A name already exists in the local scope in a conflicting kind.
    #[error("duplicate declaration of '{name}' ({kind})")]
    DuplicateDeclaration {
        name: String,
        /// Kind of the declaration being inserted
        kind: DeclKind,
        /// The declaration that could not be inserted
        new: DeclId,
        /// Node of the new declaration
        node: NodeId,
        /// The declaration already occupying the name
        existing: DeclId,
    },

    /// A referenced identifier did not resolve.
    #[error("missing {kind} declaration '{name}'")]
    MissingDeclaration {
        kind: DeclKind,
        name: String,
        node: NodeId,
    },

    /// An event name in an event-set literal did not resolve.
    #[error("event set '{set}' names unknown event '{name}'")]
    MissingEvent {
        set: String,
        name: String,
        node: NodeId,
    },

    /// A second state was marked START in one machine.
    #[error("machine '{machine}' declares a second start state '{state}'")]
    DuplicateStartState {
        machine: String,
        state: String,
        node: NodeId,
    },

    /// A second entry handler was declared on one state.
    #[error("state '{state}' declares a second entry handler")]
    DuplicateEntry { state: String, node: NodeId },

    /// A second exit handler was declared on one state.
    #[error("state '{state}' declares a second exit handler")]
    DuplicateExit { state: String, node: NodeId },

    /// A second action for the same event was declared in one state.
    #[error("state '{state}' already handles event '{event}'")]
    DuplicateHandler {
        event: String,
        state: String,
        node: NodeId,
    },

    /// A machine body closed with no state marked START.
    #[error("machine '{machine}' has no start state")]
    MachineWithoutStartState { machine: String, node: NodeId },

    /// A recognized but unimplemented construct was used.
    #[error("not implemented: {feature}")]
    NotImplemented {
        feature: &'static str,
        node: NodeId,
    },
}

impl AnalysisError {
    /// Syntax node the error points at.
    pub fn node(&self) -> NodeId {
        match self {
            Self::DuplicateDeclaration { node, .. }
            | Self::MissingDeclaration { node, .. }
            | Self::MissingEvent { node, .. }
            | Self::DuplicateStartState { node, .. }
            | Self::DuplicateEntry { node, .. }
            | Self::DuplicateExit { node, .. }
            | Self::DuplicateHandler { node, .. }
            | Self::MachineWithoutStartState { node, .. }
            | Self::NotImplemented { node, .. } => *node,
        }
    }
}
