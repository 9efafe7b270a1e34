//! `try`/`finally` desugaring.
//!
//! ```text
//! try { x } catch (e) { y } finally { z }
//!
//! try {
//!     try { x } catch (e) { y }
//! } catch (:catch_all$1) {
//!     throw :catch_all$1;
//! }
//! z
//! ```
//!
//! after which a copy of `z` is spliced in front of every exit of the new
//! `try`: the synthetic rethrow, every `return`, and every `break` or
//! `continue` whose target lies outside the `try`. Without catch clauses
//! the catch-all is attached to the original `try` directly.

use crate::error::{JumpKind, LoweringError};
use crate::lower::LoweringPass;
use lowjs_ast::lexical_context::{resolve_break, resolve_continue};
use lowjs_ast::{
    BreakableKind, CompilerConstant, JumpData, LexicalContext, NodeArena, NodeData, NodeFlags, NodeIndex,
    ReturnData, TryData,
};
use lowjs_common::Span;
use rustc_hash::FxHashSet;
use tracing::debug;

impl LoweringPass<'_> {
    /// Desugar `try_node` (already lowered, finally stripped) with the
    /// lowered `finally_body` and append the result to the current block.
    pub(crate) fn lower_finally(&mut self, try_node: NodeIndex, finally_body: NodeIndex) -> Result<(), LoweringError> {
        let span = self.arena.span(try_node);
        let catch_all = self.catch_all_block(span)?;

        let mut rethrows = FxHashSet::default();
        collect_throws(self.arena, catch_all, &mut rethrows);
        if rethrows.len() != 1 {
            return Err(LoweringError::invariant(format!(
                "catch-all block holds {} rethrows, expected 1",
                rethrows.len()
            )));
        }

        let Some(NodeData::Try(try_data)) = self.arena.data(try_node).cloned() else {
            return Err(LoweringError::invariant(format!("{try_node:?} is not a try statement")));
        };
        let restructured = if try_data.catch_blocks.is_empty() {
            self.arena.rebuild(
                try_node,
                NodeData::Try(TryData {
                    catch_blocks: vec![catch_all],
                    ..try_data
                }),
            )
        } else {
            let outer_body = self.arena.block(span, vec![try_node]);
            self.arena.try_statement(span, outer_body, vec![catch_all], None)
        };

        let finally_statements = self.arena.statements(finally_body).to_vec();
        let mut splicer = FinallySplicer {
            arena: &mut *self.arena,
            outer: &self.lc,
            rethrows: &rethrows,
            finally_statements: &finally_statements,
            inside_try: FxHashSet::default(),
            scopes: Vec::new(),
            depth: 0,
            max_depth: self.options.max_depth,
            sites: 0,
        };
        let spliced = splicer.splice(restructured)?;
        debug!(
            "[lowering] try {} -> {}: finally spliced at {} exits",
            try_node.0, spliced.0, splicer.sites
        );

        self.add_statement(spliced)?;
        for statement in finally_statements {
            self.add_statement(statement)?;
        }
        Ok(())
    }

    /// `catch (:catch_all$n) { throw :catch_all$n; }`, lowered.
    fn catch_all_block(&mut self, span: Span) -> Result<NodeIndex, LoweringError> {
        let name = self
            .lc
            .unique_name(CompilerConstant::CatchAll.symbol_name())?;
        let exception = self.arena.internal_ident(span, name.clone());
        let thrown = self.arena.internal_ident(span, name);
        let rethrow = self.arena.throw(span, thrown);
        let rethrow = self
            .arena
            .with_flag(rethrow, NodeFlags::SYNTHETIC_RETHROW, true);
        let body = self.arena.block(span, vec![rethrow]);
        let catch_block = self.arena.catch_block(span, exception, None, body);
        self.lower_block(catch_block, false)
    }
}

/// Every `throw` under `idx`, not looking into nested functions.
fn collect_throws(arena: &NodeArena, idx: NodeIndex, out: &mut FxHashSet<NodeIndex>) {
    let Some(data) = arena.data(idx) else {
        return;
    };
    match data {
        NodeData::Function(_) => return,
        NodeData::Throw(_) => {
            out.insert(idx);
        }
        _ => {}
    }
    for child in data.children() {
        collect_throws(arena, child, out);
    }
}

/// State of one finally-splicing traversal.
struct FinallySplicer<'a> {
    arena: &'a mut NodeArena,
    /// Lexical context around the `try`, for jumps that leave it.
    outer: &'a LexicalContext,
    rethrows: &'a FxHashSet<NodeIndex>,
    finally_statements: &'a [NodeIndex],
    /// Every node visited so far; jump targets in here stay inside the try.
    inside_try: FxHashSet<NodeIndex>,
    /// Breakable nodes between the try and the current node, outermost first.
    scopes: Vec<(NodeIndex, BreakableKind)>,
    depth: u32,
    max_depth: u32,
    sites: usize,
}

impl FinallySplicer<'_> {
    fn splice(&mut self, idx: NodeIndex) -> Result<NodeIndex, LoweringError> {
        let Some(node) = self.arena.get(idx) else {
            return Ok(idx);
        };
        // Finally code is never inlined into nested functions.
        if matches!(node.data, NodeData::Function(_)) {
            return Ok(idx);
        }
        if self.depth >= self.max_depth {
            return Err(LoweringError::RecursionLimit {
                depth: self.max_depth,
            });
        }
        let flags = node.flags;
        let data = node.data.clone();
        self.inside_try.insert(idx);

        let scope = BreakableKind::of(&data);
        let pushed = scope.is_some();
        if let Some(kind) = scope {
            self.scopes.push((idx, kind));
        }
        self.depth += 1;
        let mapped = data.try_map_children(|child| self.splice(child));
        self.depth -= 1;
        if pushed {
            self.scopes.pop();
        }

        match mapped? {
            NodeData::Block(block) => Ok(self.arena.with_statements(idx, block.statements)),
            NodeData::Return(ret) => Ok(self.splice_return(idx, flags, ret)),
            NodeData::Break(jump) => self.splice_jump(idx, JumpKind::Break, jump),
            NodeData::Continue(jump) => self.splice_jump(idx, JumpKind::Continue, jump),
            data => {
                let rebuilt = self.arena.replace(idx, flags, data);
                if self.rethrows.contains(&idx) {
                    let span = self.arena.span(idx);
                    Ok(self.exit_block(span, Vec::new(), rebuilt))
                } else {
                    Ok(rebuilt)
                }
            }
        }
    }

    /// `return e` becomes `{ :return = e; <finally>; return :return; }` so
    /// that `e` is evaluated before the finally code runs.
    fn splice_return(&mut self, idx: NodeIndex, flags: NodeFlags, ret: ReturnData) -> NodeIndex {
        let span = self.arena.span(idx);
        let Some(expression) = ret.expression else {
            let ret = self.arena.replace(idx, flags, NodeData::Return(ret));
            return self.exit_block(span, Vec::new(), ret);
        };
        let result = CompilerConstant::Return.symbol_name();
        let target = self.arena.internal_ident(span, result);
        let assignment = self.arena.assign(span, target, expression);
        let store = self.arena.expression_statement(span, assignment);
        let value = self.arena.internal_ident(span, result);
        let ret = self.arena.replace(
            idx,
            flags,
            NodeData::Return(ReturnData {
                expression: Some(value),
            }),
        );
        self.exit_block(span, vec![store], ret)
    }

    fn splice_jump(&mut self, idx: NodeIndex, kind: JumpKind, jump: JumpData) -> Result<NodeIndex, LoweringError> {
        let label = jump.label.as_deref();
        let scopes = self
            .scopes
            .iter()
            .rev()
            .map(|(node, scope)| (*node, scope))
            .chain(self.outer.breakables());
        let target = match kind {
            JumpKind::Break => resolve_break(scopes, label),
            JumpKind::Continue => resolve_continue(scopes, label),
        };
        let span = self.arena.span(idx);
        let Some(target) = target else {
            return Err(LoweringError::UnresolvedJumpTarget {
                kind,
                label: jump.label,
                span,
            });
        };
        if self.inside_try.contains(&target) {
            return Ok(idx);
        }
        Ok(self.exit_block(span, Vec::new(), idx))
    }

    /// `prefix`, a fresh copy of the finally code, then `exit` unless the
    /// copy already leaves.
    fn exit_block(&mut self, span: Span, mut statements: Vec<NodeIndex>, exit: NodeIndex) -> NodeIndex {
        statements.extend(self.copy_finally());
        let terminated = statements
            .last()
            .is_some_and(|&last| self.arena.has_terminal_flags(last));
        if !terminated {
            statements.push(exit);
        }
        self.sites += 1;
        self.arena.block(span, statements)
    }

    /// Copy the finally statements up to and including the first one with
    /// terminal flags. Each copy gets its own jump labels.
    fn copy_finally(&mut self) -> Vec<NodeIndex> {
        let mut copy = Vec::with_capacity(self.finally_statements.len());
        for &statement in self.finally_statements {
            copy.push(self.arena.duplicate_with_unique_labels(statement));
            if self.arena.has_terminal_flags(statement) {
                break;
            }
        }
        copy
    }
}
