//! Lowering errors.
//!
//! Every variant is fatal for the invocation that produced it: the pass does
//! no local recovery and the partially rewritten arena should be discarded.

use lowjs_ast::LexicalContextError;
use lowjs_common::Span;
use std::fmt;
use thiserror::Error;

/// Which jump statement failed to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

impl fmt::Display for JumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Break => "break",
            Self::Continue => "continue",
        })
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LoweringError {
    /// Internal compiler error: the tree or the pass state is not in the
    /// shape the pass relies on.
    #[error("lowering invariant violated: {detail}")]
    InvariantViolation { detail: String },

    #[error("{span}: `{kind}{}` has no target", label.as_deref().map(|l| format!(" {l}")).unwrap_or_default())]
    UnresolvedJumpTarget {
        kind: JumpKind,
        label: Option<String>,
        span: Span,
    },

    #[error("tree nested deeper than {depth} levels")]
    RecursionLimit { depth: u32 },
}

impl LoweringError {
    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
        }
    }
}

impl From<LexicalContextError> for LoweringError {
    fn from(err: LexicalContextError) -> Self {
        Self::invariant(err.to_string())
    }
}
