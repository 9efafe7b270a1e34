//! Control-flow lowering for script ASTs.
//!
//! The pass runs after parsing and before code generation. It makes the
//! control flow of a function explicit:
//!
//! - statements are classified as terminal and dead code after them is
//!   dropped;
//! - `try`/`finally` becomes `try`/catch-all/rethrow with a copy of the
//!   finally code in front of every exit;
//! - loops are normalized and tagged when control escapes their body;
//! - `eval` call sites and `delete` of non-references are rewritten;
//! - the program's completion value is stored in `:return`.
//!
//! ```ignore
//! let (mut arena, root) = import_program(json, &ImportOptions::default())?;
//! let lowered = lower_program(&mut arena, root, &LoweringOptions::default())?;
//! ```

mod error;
mod escape;
mod lower;
mod options;
mod splice;

pub use error::{JumpKind, LoweringError};
pub use lower::LoweringPass;
pub use options::LoweringOptions;

use lowjs_ast::{NodeArena, NodeIndex};

/// Lower the function (normally the program) rooted at `root`.
///
/// Returns the index of the rewritten root, which carries
/// [`CompilationStates::LOWERED`](lowjs_ast::CompilationStates::LOWERED).
pub fn lower_program(
    arena: &mut NodeArena,
    root: NodeIndex,
    options: &LoweringOptions,
) -> Result<NodeIndex, LoweringError> {
    LoweringPass::new(arena, options.clone()).run(root)
}

#[cfg(test)]
#[path = "../tests/lower_tests.rs"]
mod lower_tests;

#[cfg(test)]
#[path = "../tests/splice_tests.rs"]
mod splice_tests;

#[cfg(test)]
#[path = "../tests/escape_tests.rs"]
mod escape_tests;
