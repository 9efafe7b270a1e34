//! Lexical context: the stack of scopes open during a tree walk.
//!
//! The lowering pass pushes a frame whenever it enters a function, a block
//! or a breakable statement and pops it on the way out. Block frames own the
//! statement buffer that becomes the block's new statement list; function
//! frames own the function's unique-name allocator.

use crate::namespace::Namespace;
use crate::node::{FunctionFlags, NodeData, NodeIndex};
use thiserror::Error;

/// What a breakable frame can be the target of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BreakableKind {
    Loop,
    Switch,
    /// Labelled statement with its source label.
    Label(String),
}

impl BreakableKind {
    /// The kind a node opens as a jump target, if it is one.
    #[must_use]
    pub fn of(data: &NodeData) -> Option<Self> {
        match data {
            NodeData::For(_) | NodeData::While(_) => Some(Self::Loop),
            NodeData::Switch(_) => Some(Self::Switch),
            NodeData::Labelled(labelled) => Some(Self::Label(labelled.name.clone())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum FrameKind {
    Function {
        flags: FunctionFlags,
        name: Option<String>,
        namespace: Namespace,
    },
    Block {
        function_body: bool,
        statements: Vec<NodeIndex>,
    },
    Breakable(BreakableKind),
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub node: NodeIndex,
    pub kind: FrameKind,
}

impl Frame {
    #[must_use]
    pub fn function(node: NodeIndex, flags: FunctionFlags, name: Option<String>) -> Self {
        Self {
            node,
            kind: FrameKind::Function {
                flags,
                name,
                namespace: Namespace::new(),
            },
        }
    }

    #[must_use]
    pub const fn block(node: NodeIndex, function_body: bool) -> Self {
        Self {
            node,
            kind: FrameKind::Block {
                function_body,
                statements: Vec::new(),
            },
        }
    }

    #[must_use]
    pub const fn breakable(node: NodeIndex, kind: BreakableKind) -> Self {
        Self {
            node,
            kind: FrameKind::Breakable(kind),
        }
    }

    /// Statements accumulated by a block frame.
    #[must_use]
    pub fn into_statements(self) -> Vec<NodeIndex> {
        match self.kind {
            FrameKind::Block { statements, .. } => statements,
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LexicalContextError {
    #[error("no enclosing block to append statement {0:?} to")]
    NoEnclosingBlock(NodeIndex),
    #[error("no enclosing function")]
    NoEnclosingFunction,
    #[error("unbalanced lexical context: expected depth {expected}, found {found}")]
    Unbalanced { expected: usize, found: usize },
}

#[derive(Clone, Debug, Default)]
pub struct LexicalContext {
    frames: Vec<Frame>,
}

impl LexicalContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop the innermost frame, which must sit at `depth` (the stack depth
    /// before it was pushed).
    pub fn pop(&mut self, depth: usize) -> Result<Frame, LexicalContextError> {
        if self.frames.len() != depth + 1 {
            return Err(LexicalContextError::Unbalanced {
                expected: depth + 1,
                found: self.frames.len(),
            });
        }
        self.frames
            .pop()
            .ok_or(LexicalContextError::Unbalanced { expected: 1, found: 0 })
    }

    /// Drop every frame above `depth`. Used on error paths.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    #[must_use]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.frames.iter().any(|frame| frame.node == node)
    }

    /// Swap the node a frame refers to.
    pub fn replace(&mut self, old: NodeIndex, new: NodeIndex) -> bool {
        match self.frames.iter_mut().rev().find(|frame| frame.node == old) {
            Some(frame) => {
                frame.node = new;
                true
            }
            None => false,
        }
    }

    /// Node of the innermost function frame.
    #[must_use]
    pub fn current_function(&self) -> Option<NodeIndex> {
        self.function_frame().map(|frame| frame.node)
    }

    #[must_use]
    pub fn current_function_flags(&self) -> FunctionFlags {
        match self.function_frame().map(|frame| &frame.kind) {
            Some(FrameKind::Function { flags, .. }) => *flags,
            _ => FunctionFlags::empty(),
        }
    }

    #[must_use]
    pub fn current_function_name(&self) -> Option<&str> {
        match self.function_frame().map(|frame| &frame.kind) {
            Some(FrameKind::Function { name, .. }) => name.as_deref(),
            _ => None,
        }
    }

    /// Mint a name unique within the innermost function.
    pub fn unique_name(&mut self, base: &str) -> Result<String, LexicalContextError> {
        let frame = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| matches!(frame.kind, FrameKind::Function { .. }))
            .ok_or(LexicalContextError::NoEnclosingFunction)?;
        match &mut frame.kind {
            FrameKind::Function { namespace, .. } => Ok(namespace.unique_name(base)),
            _ => Err(LexicalContextError::NoEnclosingFunction),
        }
    }

    /// Is the innermost block the body of the innermost function?
    #[must_use]
    pub fn is_function_body(&self) -> bool {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| match frame.kind {
                FrameKind::Block { function_body, .. } => Some(function_body),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Append to the statement buffer of the innermost block.
    pub fn append_statement(&mut self, statement: NodeIndex) -> Result<(), LexicalContextError> {
        let statements = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| match &mut frame.kind {
                FrameKind::Block { statements, .. } => Some(statements),
                _ => None,
            })
            .ok_or(LexicalContextError::NoEnclosingBlock(statement))?;
        statements.push(statement);
        Ok(())
    }

    /// Last statement appended to the innermost block.
    #[must_use]
    pub fn last_statement(&self) -> Option<NodeIndex> {
        self.frames.iter().rev().find_map(|frame| match &frame.kind {
            FrameKind::Block { statements, .. } => Some(statements.last().copied()),
            _ => None,
        })?
    }

    /// Target of `break` / `break label`, searched innermost-first within the
    /// current function.
    #[must_use]
    pub fn break_target(&self, label: Option<&str>) -> Option<NodeIndex> {
        resolve_break(self.breakables(), label)
    }

    /// Target of `continue` / `continue label`, searched innermost-first
    /// within the current function.
    #[must_use]
    pub fn continue_target(&self, label: Option<&str>) -> Option<NodeIndex> {
        resolve_continue(self.breakables(), label)
    }

    /// Breakable frames of the current function, innermost first.
    pub fn breakables(&self) -> impl Iterator<Item = (NodeIndex, &BreakableKind)> {
        self.frames
            .iter()
            .rev()
            .take_while(|frame| !matches!(frame.kind, FrameKind::Function { .. }))
            .filter_map(|frame| match &frame.kind {
                FrameKind::Breakable(kind) => Some((frame.node, kind)),
                _ => None,
            })
    }

    fn function_frame(&self) -> Option<&Frame> {
        self.frames
            .iter()
            .rev()
            .find(|frame| matches!(frame.kind, FrameKind::Function { .. }))
    }
}

/// Resolve a `break` against breakable scopes listed innermost first.
///
/// Unlabelled breaks target the innermost loop or switch; labelled breaks
/// target the labelled statement itself.
pub fn resolve_break<'a>(
    scopes: impl IntoIterator<Item = (NodeIndex, &'a BreakableKind)>,
    label: Option<&str>,
) -> Option<NodeIndex> {
    scopes.into_iter().find_map(|(node, kind)| match (label, kind) {
        (None, BreakableKind::Loop | BreakableKind::Switch) => Some(node),
        (Some(wanted), BreakableKind::Label(name)) if name == wanted => Some(node),
        _ => None,
    })
}

/// Resolve a `continue` against breakable scopes listed innermost first.
///
/// Unlabelled continues target the innermost loop; `continue L` targets the
/// loop that is the body of the statement labelled `L`, i.e. the outermost
/// loop seen before reaching that label.
pub fn resolve_continue<'a>(
    scopes: impl IntoIterator<Item = (NodeIndex, &'a BreakableKind)>,
    label: Option<&str>,
) -> Option<NodeIndex> {
    let Some(wanted) = label else {
        return scopes
            .into_iter()
            .find_map(|(node, kind)| (*kind == BreakableKind::Loop).then_some(node));
    };
    let mut outermost_loop = None;
    for (node, kind) in scopes {
        match kind {
            BreakableKind::Loop => outermost_loop = Some(node),
            BreakableKind::Label(name) if name == wanted => return outermost_loop,
            _ => {}
        }
    }
    None
}
