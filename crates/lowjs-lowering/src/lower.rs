//! The lowering pass.
//!
//! `LoweringPass` walks one function (normally the top-level program) and
//! rebuilds it bottom-up through the arena's functional updates:
//!
//! - statements are lowered children-first and appended to the statement
//!   buffer of the innermost block frame; leaving a block turns the buffer
//!   into the block's statement list, dropping everything after the first
//!   statement that transfers control away;
//! - function bodies get a synthetic trailing `return`, and in the program
//!   every expression statement stores its value in `:return`;
//! - loops are normalized (`while (true)` becomes `for (;;)`) and tagged
//!   when a jump leaves their body;
//! - `try` statements with a `finally` body are desugared by
//!   [`lower_finally`](LoweringPass::lower_finally) (see `splice.rs`).
//!
//! All per-invocation state (the lexical context and the recursion depth)
//! lives in the pass value, which `run` consumes.

use crate::error::LoweringError;
use crate::escape::control_flow_escapes;
use crate::options::LoweringOptions;
use lowjs_ast::{
    BreakableKind, CaseData, CompilationStates, CompilerConstant, EvalArgs, ForData, ForKind, Frame,
    FunctionFlags, IfData, LabelledData, LexicalContext, NodeArena, NodeData, NodeFlags, NodeIndex,
    ReturnData, SwitchData, ThrowData, TryData, UnaryData, UnaryOp, WithData,
};
use lowjs_common::Span;
use tracing::{debug, trace};

pub struct LoweringPass<'a> {
    pub(crate) arena: &'a mut NodeArena,
    pub(crate) lc: LexicalContext,
    pub(crate) options: LoweringOptions,
    /// Current statement/expression nesting depth.
    depth: u32,
}

impl<'a> LoweringPass<'a> {
    pub fn new(arena: &'a mut NodeArena, options: LoweringOptions) -> Self {
        LoweringPass {
            arena,
            lc: LexicalContext::new(),
            options,
            depth: 0,
        }
    }

    /// Lower the function rooted at `root` and return its new index.
    #[tracing::instrument(level = "debug", skip_all, fields(root = root.0))]
    pub fn run(mut self, root: NodeIndex) -> Result<NodeIndex, LoweringError> {
        if self.arena.function(root).is_none() {
            return Err(LoweringError::invariant(format!(
                "lowering root {root:?} is not a function"
            )));
        }
        let lowered = self.lower_function(root)?;
        if !self.lc.is_empty() {
            return Err(LoweringError::invariant(format!(
                "{} lexical frames left open",
                self.lc.depth()
            )));
        }
        debug!(
            "[lowering] source={} root {} -> {} ({} nodes)",
            self.options.source_name,
            root.0,
            lowered.0,
            self.arena.len()
        );
        Ok(lowered)
    }

    // =========================================================================
    // Frames and depth
    // =========================================================================

    /// Run `f` with `frame` pushed, returning its result and the popped frame.
    ///
    /// The frame is popped on every path; on error everything `f` left on
    /// the stack is discarded too.
    pub(crate) fn with_frame<T>(
        &mut self,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> Result<T, LoweringError>,
    ) -> Result<(T, Frame), LoweringError> {
        let depth = self.lc.depth();
        self.lc.push(frame);
        let result = f(self).and_then(|value| Ok((value, self.lc.pop(depth)?)));
        if result.is_err() {
            self.lc.truncate(depth);
        }
        result
    }

    fn guard<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, LoweringError>,
    ) -> Result<T, LoweringError> {
        if self.depth >= self.options.max_depth {
            return Err(LoweringError::RecursionLimit {
                depth: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn add_statement(&mut self, statement: NodeIndex) -> Result<(), LoweringError> {
        self.lc.append_statement(statement)?;
        Ok(())
    }

    fn in_program(&self) -> bool {
        self.lc
            .current_function_flags()
            .contains(FunctionFlags::IS_PROGRAM)
    }

    // =========================================================================
    // Functions and blocks
    // =========================================================================

    fn lower_function(&mut self, idx: NodeIndex) -> Result<NodeIndex, LoweringError> {
        let Some(func) = self.arena.function(idx) else {
            return Err(LoweringError::invariant(format!("{idx:?} is not a function")));
        };
        if func.is_lazy() || func.state.contains(CompilationStates::LOWERED) {
            trace!("[lowering] not entering function {}", func.display_name());
            return Ok(idx);
        }
        let name = func.display_name().to_string();
        let body = func.body;
        let frame = Frame::function(idx, func.flags, func.name.clone());

        let (body, _) = self.with_frame(frame, |this| this.lower_block(body, true))?;
        let lowered = self.arena.update(idx, |_, data| {
            if let NodeData::Function(func) = data {
                func.body = body;
                func.state |= CompilationStates::LOWERED;
            }
        });
        debug!("[lowering] END FunctionNode: {name}");
        Ok(lowered)
    }

    pub(crate) fn lower_block(&mut self, idx: NodeIndex, function_body: bool) -> Result<NodeIndex, LoweringError> {
        if !matches!(self.arena.data(idx), Some(NodeData::Block(_))) {
            return Err(LoweringError::invariant(format!("{idx:?} is not a block")));
        }
        let statements = self.arena.statements(idx).to_vec();
        let span = self.arena.span(idx);

        let ((), frame) = self.with_frame(Frame::block(idx, function_body), |this| {
            // A program without function declarations completes with
            // `undefined` unless a statement says otherwise.
            if function_body && this.in_program() {
                let flags = this.lc.current_function_flags();
                if !flags.contains(FunctionFlags::HAS_DECLARED_FUNCTIONS) {
                    let undefined = this.arena.undefined(span.at_start());
                    let stmt = this.arena.expression_statement(span.at_start(), undefined);
                    this.lower_statement(stmt)?;
                }
            }
            for statement in statements {
                this.lower_statement(statement)?;
            }
            if function_body {
                let ret = this.synthetic_return(span);
                this.lower_statement(ret)?;
            }
            Ok(())
        })?;

        let statements = self.drop_unreachable(frame.into_statements());
        Ok(self.arena.with_statements(idx, statements))
    }

    /// `return :return` in the program, `return undefined` elsewhere.
    fn synthetic_return(&mut self, span: Span) -> NodeIndex {
        let value = if self.in_program() {
            self.arena
                .internal_ident(span, CompilerConstant::Return.symbol_name())
        } else {
            self.arena.undefined(span)
        };
        self.arena.return_statement(span, Some(value))
    }

    /// Keep statements up to and including the first one with terminal
    /// flags. Later `var` statements survive without their initializer.
    fn drop_unreachable(&mut self, statements: Vec<NodeIndex>) -> Vec<NodeIndex> {
        let mut retained = Vec::with_capacity(statements.len());
        let mut terminated = false;
        for statement in statements {
            if !terminated {
                terminated = self.arena.has_terminal_flags(statement);
                retained.push(statement);
            } else if matches!(self.arena.data(statement), Some(NodeData::Var(_))) {
                retained.push(self.arena.with_var_init(statement, None));
            } else {
                trace!(
                    "[lowering] dropping unreachable {}",
                    self.arena.get(statement).map_or("?", |node| node.kind_name())
                );
            }
        }
        retained
    }

    fn lower_opt_block(&mut self, idx: Option<NodeIndex>) -> Result<Option<NodeIndex>, LoweringError> {
        idx.map(|idx| self.lower_block(idx, false)).transpose()
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub(crate) fn lower_statement(&mut self, idx: NodeIndex) -> Result<(), LoweringError> {
        self.guard(|this| this.lower_statement_inner(idx))
    }

    fn lower_statement_inner(&mut self, idx: NodeIndex) -> Result<(), LoweringError> {
        let Some(node) = self.arena.get(idx) else {
            return Err(LoweringError::invariant(format!("missing statement {idx:?}")));
        };
        match node.data.clone() {
            NodeData::Block(_) => {
                let block = self.lower_block(idx, false)?;
                self.add_statement(block)
            }
            NodeData::Empty => Ok(()),
            NodeData::ExpressionStatement(stmt) => self.lower_expression_statement(idx, stmt.expression),
            NodeData::Var(var) => {
                let init = self.lower_opt_expression(var.init)?;
                let lowered = self.arena.with_var_init(idx, init);
                self.add_statement(lowered)?;
                if self.in_program() && self.arena.has_flag(idx, NodeFlags::IS_LAST_FUNCTION_DECLARATION) {
                    // The program's completion value is the last declared function.
                    let Some(name) = self.arena.ident_name(var.name).map(str::to_string) else {
                        return Err(LoweringError::invariant("function declaration without a name"));
                    };
                    let span = self.arena.span(idx);
                    let reference = self.arena.ident(span, name);
                    let stmt = self.arena.expression_statement(span, reference);
                    self.lower_statement(stmt)?;
                }
                Ok(())
            }
            NodeData::If(if_data) => {
                let test = self.lower_expression(if_data.test)?;
                let pass = self.lower_block(if_data.pass, false)?;
                let fail = self.lower_opt_block(if_data.fail)?;
                let lowered = self.arena.rebuild(idx, NodeData::If(IfData { test, pass, fail }));
                self.add_statement(lowered)
            }
            NodeData::For(_) | NodeData::While(_) => self.lower_loop(idx),
            NodeData::Labelled(labelled) => {
                let body = labelled.body;
                let frame = Frame::breakable(idx, BreakableKind::Label(labelled.name.clone()));
                let (body, _) = self.with_frame(frame, |this| this.lower_block(body, false))?;
                let lowered = self
                    .arena
                    .rebuild(idx, NodeData::Labelled(LabelledData { body, ..labelled }));
                self.add_statement(lowered)
            }
            NodeData::Switch(switch) => {
                let frame = Frame::breakable(idx, BreakableKind::Switch);
                let (data, _) = self.with_frame(frame, |this| {
                    let discriminant = this.lower_expression(switch.discriminant)?;
                    let cases = switch
                        .cases
                        .iter()
                        .map(|&case| this.lower_case(case))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(SwitchData {
                        discriminant,
                        cases,
                        label: switch.label,
                    })
                })?;
                let lowered = self.arena.rebuild(idx, NodeData::Switch(data));
                self.add_statement(lowered)
            }
            NodeData::With(with) => {
                let object = self.lower_expression(with.object)?;
                let body = self.lower_block(with.body, false)?;
                let lowered = self.arena.rebuild(idx, NodeData::With(WithData { object, body }));
                self.add_statement(lowered)
            }
            NodeData::Return(ret) => {
                let expression = self.lower_opt_expression(ret.expression)?;
                let lowered = self
                    .arena
                    .rebuild(idx, NodeData::Return(ReturnData { expression }));
                self.add_statement(lowered)
            }
            NodeData::Throw(throw) => {
                let expression = self.lower_expression(throw.expression)?;
                let lowered = self
                    .arena
                    .rebuild(idx, NodeData::Throw(ThrowData { expression }));
                self.add_statement(lowered)
            }
            NodeData::Break(_) | NodeData::Continue(_) => self.add_statement(idx),
            NodeData::Try(try_data) => {
                let body = self.lower_block(try_data.body, false)?;
                let catch_blocks = try_data
                    .catch_blocks
                    .iter()
                    .map(|&catch_block| self.lower_block(catch_block, false))
                    .collect::<Result<Vec<_>, _>>()?;
                let finally_body = self.lower_opt_block(try_data.finally_body)?;
                let lowered = self.arena.rebuild(
                    idx,
                    NodeData::Try(TryData {
                        body,
                        catch_blocks,
                        finally_body: None,
                    }),
                );
                match finally_body {
                    Some(finally_body) => self.lower_finally(lowered, finally_body),
                    None => self.add_statement(lowered),
                }
            }
            NodeData::Catch(catch) => {
                let exception = self.lower_expression(catch.exception)?;
                let condition = self.lower_opt_expression(catch.condition)?;
                let body = self.lower_block(catch.body, false)?;
                let lowered = self.arena.update(idx, |_, data| {
                    if let NodeData::Catch(catch) = data {
                        catch.exception = exception;
                        catch.condition = condition;
                        catch.body = body;
                    }
                });
                self.add_statement(lowered)
            }
            other => Err(LoweringError::invariant(format!(
                "{} in statement position",
                other.kind_name()
            ))),
        }
    }

    fn lower_expression_statement(&mut self, idx: NodeIndex, expression: NodeIndex) -> Result<(), LoweringError> {
        let expression = self.lower_expression(expression)?;
        let mut lowered = self.arena.with_expression(idx, expression);
        if self.in_program()
            && !self.arena.has_flag(expression, NodeFlags::INTERNAL)
            && !self.is_result_assignment(expression)
        {
            let span = self.arena.span(idx);
            let result = self
                .arena
                .internal_ident(span, CompilerConstant::Return.symbol_name());
            let assignment = self.arena.assign(span, result, expression);
            lowered = self.arena.with_expression(lowered, assignment);
        }
        self.add_statement(lowered)
    }

    /// `:return = ...` (or a compound assignment to it).
    fn is_result_assignment(&self, expression: NodeIndex) -> bool {
        match self.arena.data(expression) {
            Some(NodeData::Binary(binary)) if binary.op.is_assignment() => {
                self.arena.ident_name(binary.lhs) == Some(CompilerConstant::Return.symbol_name())
            }
            _ => false,
        }
    }

    fn lower_case(&mut self, idx: NodeIndex) -> Result<NodeIndex, LoweringError> {
        let Some(NodeData::Case(case)) = self.arena.data(idx).cloned() else {
            return Err(LoweringError::invariant(format!("{idx:?} is not a case clause")));
        };
        let test = self.lower_opt_expression(case.test)?;
        let body = self.lower_block(case.body, false)?;
        Ok(self.arena.rebuild(idx, NodeData::Case(CaseData { test, body })))
    }

    // =========================================================================
    // Loops
    // =========================================================================

    fn lower_loop(&mut self, idx: NodeIndex) -> Result<(), LoweringError> {
        let (lowered, _) = self.with_frame(Frame::breakable(idx, BreakableKind::Loop), |this| {
            let lowered = this.lower_loop_children(idx)?;
            Ok(this.leave_loop(idx, lowered))
        })?;
        self.add_statement(lowered)
    }

    fn lower_loop_children(&mut self, idx: NodeIndex) -> Result<NodeIndex, LoweringError> {
        let data = match self.arena.data(idx).cloned() {
            Some(NodeData::For(for_data)) => {
                let init = self.lower_opt_expression(for_data.init)?;
                let test = self.lower_opt_expression(for_data.test)?;
                let modify = self.lower_opt_expression(for_data.modify)?;
                let body = self.lower_block(for_data.body, false)?;
                NodeData::For(ForData {
                    init,
                    test,
                    modify,
                    body,
                    ..for_data
                })
            }
            Some(NodeData::While(mut while_data)) => {
                if while_data.is_do_while {
                    while_data.body = self.lower_block(while_data.body, false)?;
                    while_data.test = self.lower_opt_expression(while_data.test)?;
                } else {
                    while_data.test = self.lower_opt_expression(while_data.test)?;
                    while_data.body = self.lower_block(while_data.body, false)?;
                }
                NodeData::While(while_data)
            }
            _ => return Err(LoweringError::invariant(format!("{idx:?} is not a loop"))),
        };
        Ok(self.arena.rebuild(idx, data))
    }

    /// Normalize a lowered loop and run escape analysis on it. `original` is
    /// the node the loop frame was pushed for.
    fn leave_loop(&mut self, original: NodeIndex, lowered: NodeIndex) -> NodeIndex {
        let mut lowered = lowered;
        match self.arena.data(lowered).cloned() {
            Some(NodeData::While(while_data)) if self.arena.is_always_true(while_data.test) => {
                let data = NodeData::For(ForData {
                    kind: ForKind::For,
                    init: None,
                    test: None,
                    modify: None,
                    body: while_data.body,
                    label: while_data.label,
                });
                let span = self.arena.span(lowered);
                let flags = self.arena.flags(lowered);
                let for_node = self.arena.add_node(span, flags, data);
                self.lc.replace(original, for_node);
                trace!("[lowering] while {} -> for {}", lowered.0, for_node.0);
                lowered = for_node;
            }
            Some(NodeData::For(for_data))
                if for_data.kind == ForKind::For
                    && for_data.test.is_some()
                    && self.arena.is_always_true(for_data.test) =>
            {
                lowered = self.arena.with_for_test(lowered, None);
            }
            _ => {}
        }
        self.check_escape(lowered)
    }

    fn check_escape(&mut self, loop_node: NodeIndex) -> NodeIndex {
        let Some(body) = self.arena.data(loop_node).and_then(NodeData::loop_body) else {
            return loop_node;
        };
        if control_flow_escapes(self.arena, body) {
            trace!("[lowering] control flow escapes loop {}", loop_node.0);
            self.arena.with_control_flow_escapes(loop_node)
        } else {
            loop_node
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn lower_opt_expression(&mut self, idx: Option<NodeIndex>) -> Result<Option<NodeIndex>, LoweringError> {
        idx.map(|idx| self.lower_expression(idx)).transpose()
    }

    pub(crate) fn lower_expression(&mut self, idx: NodeIndex) -> Result<NodeIndex, LoweringError> {
        self.guard(|this| this.lower_expression_inner(idx))
    }

    fn lower_expression_inner(&mut self, idx: NodeIndex) -> Result<NodeIndex, LoweringError> {
        let Some(node) = self.arena.get(idx) else {
            return Err(LoweringError::invariant(format!("missing expression {idx:?}")));
        };
        match node.data.clone() {
            NodeData::Function(_) => self.lower_function(idx),
            NodeData::Call(_) => self.lower_call(idx),
            NodeData::Unary(unary) if unary.op == UnaryOp::Delete => self.lower_delete(idx, unary),
            data if data.is_statement() => Err(LoweringError::invariant(format!(
                "{} in expression position",
                data.kind_name()
            ))),
            data => {
                let data = data.try_map_children(|child| self.lower_expression(child))?;
                Ok(self.arena.rebuild(idx, data))
            }
        }
    }

    fn lower_call(&mut self, idx: NodeIndex) -> Result<NodeIndex, LoweringError> {
        let Some(data) = self.arena.data(idx).cloned() else {
            return Err(LoweringError::invariant(format!("missing call {idx:?}")));
        };
        let NodeData::Call(mut call) = data.try_map_children(|child| self.lower_expression(child))? else {
            return Err(LoweringError::invariant(format!("{idx:?} is not a call")));
        };
        call.callee = self.mark_function(call.callee);
        let lowered = self.arena.rebuild(idx, NodeData::Call(call));
        self.check_eval(lowered)
    }

    /// Tag a call target so code generation can use a fast scope call.
    fn mark_function(&mut self, callee: NodeIndex) -> NodeIndex {
        match self.arena.data(callee) {
            Some(NodeData::Ident(_) | NodeData::Access(_) | NodeData::Index(_)) => {
                self.arena.with_flag(callee, NodeFlags::IS_FUNCTION, true)
            }
            _ => callee,
        }
    }

    /// Attach [`EvalArgs`] to a direct `eval(code, ...)` call.
    fn check_eval(&mut self, call: NodeIndex) -> Result<NodeIndex, LoweringError> {
        let (callee, first) = match self.arena.data(call) {
            Some(NodeData::Call(data)) if data.eval_args.is_none() => match data.args.first() {
                Some(&first) => (data.callee, first),
                None => return Ok(call),
            },
            _ => return Ok(call),
        };
        if self.arena.ident_name(callee) != Some(CompilerConstant::Eval.symbol_name()) {
            return Ok(call);
        }

        let code = self.arena.duplicate_with_unique_labels(first);
        let code = self.lower_expression(code)?;
        let span = self.arena.span(call);
        let this = self.arena.ident(span, CompilerConstant::This.symbol_name());
        let line = self.arena.span(callee).line;
        let location = format!("{}#{}<eval>", self.options.source_name, line);
        let strict = self
            .lc
            .current_function_flags()
            .contains(FunctionFlags::IS_STRICT);
        debug!("[lowering] eval call at {location}");
        Ok(self.arena.with_eval_args(
            call,
            EvalArgs {
                code,
                this,
                location,
                strict,
            },
        ))
    }

    /// `delete` of anything but a reference evaluates its operand for side
    /// effects and yields `true`.
    fn lower_delete(&mut self, idx: NodeIndex, unary: UnaryData) -> Result<NodeIndex, LoweringError> {
        let operand = self.lower_expression(unary.operand)?;
        match self.arena.data(operand) {
            Some(NodeData::Ident(_) | NodeData::Access(_) | NodeData::Index(_)) => Ok(self
                .arena
                .rebuild(idx, NodeData::Unary(UnaryData { operand, ..unary }))),
            _ => {
                let span = self.arena.span(idx);
                let stmt = self.arena.expression_statement(span, operand);
                self.add_statement(stmt)?;
                Ok(self.arena.boolean(span, true))
            }
        }
    }
}
