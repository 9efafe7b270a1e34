//! Script AST for the lowjs compiler.
//!
//! This crate provides the tree the lowering pass rewrites:
//! - `NodeArena` storage with functional `with_*` updates (`arena`, `node`)
//! - Static termination predicates (`terminal`)
//! - The lexical-context frame stack (`lexical_context`)
//! - Unique names and compiler constants (`namespace`)
//! - Subtree duplication with fresh jump labels (`duplicate`)
//! - ESTree JSON import and a JavaScript-like printer

pub mod node;
pub use node::*;

pub mod arena;
pub use arena::NodeArena;

pub mod builder;
pub use builder::AstBuilder;

// Terminal predicates and label duplication are `NodeArena` methods.
mod duplicate;
mod terminal;

pub mod lexical_context;
pub use lexical_context::{BreakableKind, Frame, FrameKind, LexicalContext, LexicalContextError};

pub mod namespace;
pub use namespace::{CompilerConstant, Namespace};

pub mod estree;
pub mod printer;

#[cfg(test)]
#[path = "../tests/arena_tests.rs"]
mod arena_tests;

#[cfg(test)]
#[path = "../tests/terminal_tests.rs"]
mod terminal_tests;

#[cfg(test)]
#[path = "../tests/lexical_context_tests.rs"]
mod lexical_context_tests;

#[cfg(test)]
#[path = "../tests/duplicate_tests.rs"]
mod duplicate_tests;

#[cfg(test)]
#[path = "../tests/printer_tests.rs"]
mod printer_tests;
