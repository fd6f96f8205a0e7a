//! # Relay front-end
//!
//! Declaration resolver and scope binder for Relay, a state-machine
//! modeling language in which machines exchange events, implement
//! interfaces, and spec machines observe event traffic.
//!
//! This crate is the front-end CORE: it consumes already-parsed program
//! trees and produces a fully linked, name-resolved, type-annotated
//! declaration graph for later semantic phases (reachability, event-set
//! conformance, code generation). Parsing, expression type checking, code
//! generation, and the CLI driver live elsewhere.
//!
//! ## Architecture
//!
//! ```text
//! foundation/  - spans, typed arenas
//! ast/         - syntax trees + the visitor contract (parser's output)
//! resolve/     - scopes, the two passes, type resolution, the validator
//! error        - typed analysis errors
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_rdsl::resolve::{analyze, types::ScopedTypeResolver};
//!
//! let analysis = analyze(&programs, &ScopedTypeResolver)?;
//! for (node, decl) in &analysis.node_to_decl {
//!     println!("{node} → {}", analysis.decls.name_of(*decl));
//! }
//! ```

pub mod ast;
pub mod error;
pub mod foundation;
pub mod resolve;

pub use error::AnalysisError;
pub use resolve::{analyze, analyze_with, Analysis, AnalyzeOptions};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
