//! Append-only node storage.
//!
//! `NodeArena` owns every node of a script. Nodes are never changed after
//! allocation: the `with_*` operations allocate a new node holding the
//! replaced field and return its index, or hand back the original index when
//! nothing changed. Parents refer to children by index; there are no
//! back-pointers.

use crate::node::*;
use lowjs_common::Span;
use lowjs_common::limits::MAX_ARENA_NODES;
use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeArena {
    nodes: Vec<Node>,
    next_label: u32,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            next_label: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        if idx.is_none() {
            return None;
        }
        self.nodes.get(idx.0 as usize)
    }

    #[inline]
    #[must_use]
    pub fn data(&self, idx: NodeIndex) -> Option<&NodeData> {
        self.get(idx).map(|node| &node.data)
    }

    /// Span of a node, [`Span::SYNTHETIC`] for an unknown index.
    #[must_use]
    pub fn span(&self, idx: NodeIndex) -> Span {
        self.get(idx).map_or(Span::SYNTHETIC, |node| node.span)
    }

    #[must_use]
    pub fn flags(&self, idx: NodeIndex) -> NodeFlags {
        self.get(idx).map_or(NodeFlags::empty(), |node| node.flags)
    }

    #[inline]
    #[must_use]
    pub fn has_flag(&self, idx: NodeIndex, flag: NodeFlags) -> bool {
        self.flags(idx).contains(flag)
    }

    /// Name of an `Ident` node.
    #[must_use]
    pub fn ident_name(&self, idx: NodeIndex) -> Option<&str> {
        match self.data(idx)? {
            NodeData::Ident(ident) => Some(&ident.name),
            _ => None,
        }
    }

    #[must_use]
    pub fn function(&self, idx: NodeIndex) -> Option<&FunctionData> {
        match self.data(idx)? {
            NodeData::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Statements of a `Block` node; empty for anything else.
    #[must_use]
    pub fn statements(&self, idx: NodeIndex) -> &[NodeIndex] {
        match self.data(idx) {
            Some(NodeData::Block(block)) => &block.statements,
            _ => &[],
        }
    }

    /// Mint a jump label that no other node of this arena carries.
    pub fn fresh_label(&mut self) -> JumpLabel {
        let label = JumpLabel(self.next_label);
        self.next_label += 1;
        label
    }

    /// Allocate a node as given. Blocks should go through [`Self::block`] so
    /// their `TERMINAL` flag is derived from their contents.
    ///
    /// # Panics
    ///
    /// Panics when the arena already holds [`MAX_ARENA_NODES`] nodes.
    pub fn add_node(&mut self, span: Span, flags: NodeFlags, data: NodeData) -> NodeIndex {
        let Some(idx) = NodeIndex::from_position(self.nodes.len()) else {
            panic!("node arena is full ({MAX_ARENA_NODES} nodes)");
        };
        self.nodes.push(Node { span, flags, data });
        idx
    }

    // =========================================================================
    // Expression constructors
    // =========================================================================

    pub fn ident(&mut self, span: Span, name: impl Into<String>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Ident(IdentData { name: name.into() }),
        )
    }

    /// Identifier for a compiler-synthesized symbol.
    pub fn internal_ident(&mut self, span: Span, name: impl Into<String>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::INTERNAL,
            NodeData::Ident(IdentData { name: name.into() }),
        )
    }

    pub fn literal(&mut self, span: Span, value: Literal) -> NodeIndex {
        self.add_node(span, NodeFlags::empty(), NodeData::Literal(value))
    }

    pub fn undefined(&mut self, span: Span) -> NodeIndex {
        self.literal(span, Literal::Undefined)
    }

    pub fn boolean(&mut self, span: Span, value: bool) -> NodeIndex {
        self.literal(span, Literal::Boolean(value))
    }

    pub fn number(&mut self, span: Span, value: f64) -> NodeIndex {
        self.literal(span, Literal::Number(value))
    }

    pub fn string(&mut self, span: Span, value: impl Into<String>) -> NodeIndex {
        self.literal(span, Literal::String(value.into()))
    }

    pub fn unary(&mut self, span: Span, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Unary(UnaryData { op, operand }),
        )
    }

    pub fn binary(&mut self, span: Span, op: BinaryOp, lhs: NodeIndex, rhs: NodeIndex) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Binary(BinaryData { op, lhs, rhs }),
        )
    }

    pub fn assign(&mut self, span: Span, lhs: NodeIndex, rhs: NodeIndex) -> NodeIndex {
        self.binary(span, BinaryOp::Assign, lhs, rhs)
    }

    pub fn ternary(
        &mut self,
        span: Span,
        test: NodeIndex,
        pass: NodeIndex,
        fail: NodeIndex,
    ) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Ternary(TernaryData { test, pass, fail }),
        )
    }

    pub fn call(&mut self, span: Span, callee: NodeIndex, args: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Call(CallData {
                callee,
                args,
                is_new: false,
                eval_args: None,
            }),
        )
    }

    pub fn new_call(&mut self, span: Span, callee: NodeIndex, args: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Call(CallData {
                callee,
                args,
                is_new: true,
                eval_args: None,
            }),
        )
    }

    pub fn access(&mut self, span: Span, base: NodeIndex, property: impl Into<String>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Access(AccessData {
                base,
                property: property.into(),
            }),
        )
    }

    pub fn index(&mut self, span: Span, base: NodeIndex, index: NodeIndex) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Index(IndexData { base, index }),
        )
    }

    pub fn array(&mut self, span: Span, elements: Vec<Option<NodeIndex>>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Array(ArrayData { elements }),
        )
    }

    pub fn object(&mut self, span: Span, properties: Vec<PropertyData>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Object(ObjectData { properties }),
        )
    }

    pub fn function_node(
        &mut self,
        span: Span,
        name: Option<String>,
        params: Vec<NodeIndex>,
        body: NodeIndex,
        flags: FunctionFlags,
    ) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Function(FunctionData {
                name,
                params,
                body,
                flags,
                state: CompilationStates::INITIALIZED | CompilationStates::PARSED,
            }),
        )
    }

    // =========================================================================
    // Statement constructors
    // =========================================================================

    /// A block with a fresh jump label, tagged `TERMINAL` when its last
    /// statement is terminal.
    pub fn block(&mut self, span: Span, statements: Vec<NodeIndex>) -> NodeIndex {
        let label = self.fresh_label();
        let flags = self.block_flags(&statements, NodeFlags::empty());
        self.add_node(span, flags, NodeData::Block(BlockData { statements, label }))
    }

    pub fn expression_statement(&mut self, span: Span, expression: NodeIndex) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::ExpressionStatement(ExpressionStatementData { expression }),
        )
    }

    pub fn var(&mut self, span: Span, name: NodeIndex, init: Option<NodeIndex>) -> NodeIndex {
        self.add_node(span, NodeFlags::empty(), NodeData::Var(VarData { name, init }))
    }

    pub fn if_statement(
        &mut self,
        span: Span,
        test: NodeIndex,
        pass: NodeIndex,
        fail: Option<NodeIndex>,
    ) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::If(IfData { test, pass, fail }),
        )
    }

    pub fn for_loop(
        &mut self,
        span: Span,
        init: Option<NodeIndex>,
        test: Option<NodeIndex>,
        modify: Option<NodeIndex>,
        body: NodeIndex,
    ) -> NodeIndex {
        let label = self.fresh_label();
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::For(ForData {
                kind: ForKind::For,
                init,
                test,
                modify,
                body,
                label,
            }),
        )
    }

    /// `for (target in object) body`
    pub fn for_in(
        &mut self,
        span: Span,
        target: NodeIndex,
        object: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        let label = self.fresh_label();
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::For(ForData {
                kind: ForKind::ForIn,
                init: Some(target),
                test: None,
                modify: Some(object),
                body,
                label,
            }),
        )
    }

    pub fn while_loop(&mut self, span: Span, test: Option<NodeIndex>, body: NodeIndex) -> NodeIndex {
        let label = self.fresh_label();
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::While(WhileData {
                test,
                body,
                is_do_while: false,
                label,
            }),
        )
    }

    pub fn do_while(&mut self, span: Span, body: NodeIndex, test: Option<NodeIndex>) -> NodeIndex {
        let label = self.fresh_label();
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::While(WhileData {
                test,
                body,
                is_do_while: true,
                label,
            }),
        )
    }

    pub fn try_statement(
        &mut self,
        span: Span,
        body: NodeIndex,
        catch_blocks: Vec<NodeIndex>,
        finally_body: Option<NodeIndex>,
    ) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Try(TryData {
                body,
                catch_blocks,
                finally_body,
            }),
        )
    }

    pub fn catch_clause(
        &mut self,
        span: Span,
        exception: NodeIndex,
        condition: Option<NodeIndex>,
        body: NodeIndex,
    ) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Catch(CatchData {
                exception,
                condition,
                body,
            }),
        )
    }

    /// A catch clause wrapped in its own block, the shape a `Try` expects.
    pub fn catch_block(
        &mut self,
        span: Span,
        exception: NodeIndex,
        condition: Option<NodeIndex>,
        body: NodeIndex,
    ) -> NodeIndex {
        let catch = self.catch_clause(span, exception, condition, body);
        self.block(span, vec![catch])
    }

    pub fn throw(&mut self, span: Span, expression: NodeIndex) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Throw(ThrowData { expression }),
        )
    }

    pub fn return_statement(&mut self, span: Span, expression: Option<NodeIndex>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Return(ReturnData { expression }),
        )
    }

    pub fn break_statement(&mut self, span: Span, label: Option<String>) -> NodeIndex {
        self.add_node(span, NodeFlags::empty(), NodeData::Break(JumpData { label }))
    }

    pub fn continue_statement(&mut self, span: Span, label: Option<String>) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Continue(JumpData { label }),
        )
    }

    pub fn labelled(&mut self, span: Span, name: impl Into<String>, body: NodeIndex) -> NodeIndex {
        let label = self.fresh_label();
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Labelled(LabelledData {
                name: name.into(),
                body,
                label,
            }),
        )
    }

    pub fn switch(&mut self, span: Span, discriminant: NodeIndex, cases: Vec<NodeIndex>) -> NodeIndex {
        let label = self.fresh_label();
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::Switch(SwitchData {
                discriminant,
                cases,
                label,
            }),
        )
    }

    pub fn case(&mut self, span: Span, test: Option<NodeIndex>, body: NodeIndex) -> NodeIndex {
        self.add_node(span, NodeFlags::empty(), NodeData::Case(CaseData { test, body }))
    }

    pub fn with(&mut self, span: Span, object: NodeIndex, body: NodeIndex) -> NodeIndex {
        self.add_node(
            span,
            NodeFlags::empty(),
            NodeData::With(WithData { object, body }),
        )
    }

    pub fn empty(&mut self, span: Span) -> NodeIndex {
        self.add_node(span, NodeFlags::empty(), NodeData::Empty)
    }

    // =========================================================================
    // Functional updates
    // =========================================================================

    /// Replace the flags and payload of `idx`.
    ///
    /// Allocates a new node with the same span and returns its index; returns
    /// `idx` itself when both flags and payload are unchanged.
    pub fn replace(&mut self, idx: NodeIndex, flags: NodeFlags, data: NodeData) -> NodeIndex {
        let Some(node) = self.get(idx) else {
            return idx;
        };
        if node.flags == flags && node.data == data {
            return idx;
        }
        let span = node.span;
        self.add_node(span, flags, data)
    }

    /// Replace the payload of `idx`, keeping its flags.
    pub fn rebuild(&mut self, idx: NodeIndex, data: NodeData) -> NodeIndex {
        let flags = self.flags(idx);
        self.replace(idx, flags, data)
    }

    /// Apply `f` to a copy of the node's flags and payload and store the
    /// result as a new node (or keep `idx` if nothing changed).
    pub fn update(
        &mut self,
        idx: NodeIndex,
        f: impl FnOnce(&mut NodeFlags, &mut NodeData),
    ) -> NodeIndex {
        let Some(node) = self.get(idx) else {
            return idx;
        };
        let mut flags = node.flags;
        let mut data = node.data.clone();
        f(&mut flags, &mut data);
        self.replace(idx, flags, data)
    }

    pub fn with_flag(&mut self, idx: NodeIndex, flag: NodeFlags, value: bool) -> NodeIndex {
        self.update(idx, |flags, _| flags.set(flag, value))
    }

    /// Block with its statement list replaced. `TERMINAL` is recomputed from
    /// the new last statement.
    pub fn with_statements(&mut self, block: NodeIndex, statements: Vec<NodeIndex>) -> NodeIndex {
        let base = self.flags(block);
        let flags = self.block_flags(&statements, base);
        self.update(block, |node_flags, data| {
            if let NodeData::Block(block) = data {
                block.statements = statements;
                *node_flags = flags;
            }
        })
    }

    pub fn with_var_init(&mut self, var: NodeIndex, init: Option<NodeIndex>) -> NodeIndex {
        self.update(var, |_, data| {
            if let NodeData::Var(var) = data {
                var.init = init;
            }
        })
    }

    pub fn with_expression(&mut self, statement: NodeIndex, expression: NodeIndex) -> NodeIndex {
        self.update(statement, |_, data| match data {
            NodeData::ExpressionStatement(stmt) => stmt.expression = expression,
            NodeData::Throw(throw) => throw.expression = expression,
            NodeData::Return(ret) => ret.expression = Some(expression),
            _ => {}
        })
    }

    pub fn with_eval_args(&mut self, call: NodeIndex, eval_args: EvalArgs) -> NodeIndex {
        self.update(call, |_, data| {
            if let NodeData::Call(call) = data {
                call.eval_args = Some(eval_args);
            }
        })
    }

    pub fn with_for_test(&mut self, for_node: NodeIndex, test: Option<NodeIndex>) -> NodeIndex {
        self.update(for_node, |_, data| {
            if let NodeData::For(for_data) = data {
                for_data.test = test;
            }
        })
    }

    /// Tag a loop as having escaping control flow. The body loses its
    /// `TERMINAL` flag: falling off its end is no longer the only way out.
    pub fn with_control_flow_escapes(&mut self, loop_node: NodeIndex) -> NodeIndex {
        let Some(body) = self.data(loop_node).and_then(NodeData::loop_body) else {
            return loop_node;
        };
        let body = self.with_flag(body, NodeFlags::TERMINAL, false);
        self.update(loop_node, |flags, data| {
            flags.insert(NodeFlags::CONTROL_FLOW_ESCAPES);
            match data {
                NodeData::For(for_data) => for_data.body = body,
                NodeData::While(while_data) => while_data.body = body,
                _ => {}
            }
        })
    }

    pub fn with_state(&mut self, function: NodeIndex, state: CompilationStates) -> NodeIndex {
        self.update(function, |_, data| {
            if let NodeData::Function(func) = data {
                func.state |= state;
            }
        })
    }

    fn block_flags(&self, statements: &[NodeIndex], base: NodeFlags) -> NodeFlags {
        let mut flags = base;
        let terminal = statements.last().is_some_and(|&last| self.is_terminal(last));
        flags.set(NodeFlags::TERMINAL, terminal);
        flags
    }
}
