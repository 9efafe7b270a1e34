//! Span-free tree construction.
//!
//! `AstBuilder` wraps a [`NodeArena`] and stamps every node with the current
//! line, which makes hand-written trees (tests, benchmarks, synthesized
//! code) short to write.

use crate::arena::NodeArena;
use crate::node::*;
use lowjs_common::Span;

pub struct AstBuilder<'a> {
    arena: &'a mut NodeArena,
    span: Span,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a mut NodeArena) -> Self {
        Self {
            arena,
            span: Span::new(0, 0, 1),
        }
    }

    /// Stamp subsequently built nodes with `line`.
    pub fn at_line(&mut self, line: u32) -> &mut Self {
        self.span = Span::new(self.span.start, self.span.end, line);
        self
    }

    pub fn arena(&mut self) -> &mut NodeArena {
        &mut *self.arena
    }

    // Expressions

    pub fn ident(&mut self, name: &str) -> NodeIndex {
        self.arena.ident(self.span, name)
    }

    pub fn num(&mut self, value: f64) -> NodeIndex {
        self.arena.number(self.span, value)
    }

    pub fn string(&mut self, value: &str) -> NodeIndex {
        self.arena.string(self.span, value)
    }

    pub fn boolean(&mut self, value: bool) -> NodeIndex {
        self.arena.boolean(self.span, value)
    }

    pub fn undefined(&mut self) -> NodeIndex {
        self.arena.undefined(self.span)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.arena.unary(self.span, op, operand)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeIndex, rhs: NodeIndex) -> NodeIndex {
        self.arena.binary(self.span, op, lhs, rhs)
    }

    /// `name = value`
    pub fn assign(&mut self, name: &str, value: NodeIndex) -> NodeIndex {
        let target = self.ident(name);
        self.arena.assign(self.span, target, value)
    }

    pub fn call(&mut self, callee: NodeIndex, args: Vec<NodeIndex>) -> NodeIndex {
        self.arena.call(self.span, callee, args)
    }

    /// `name(args...)`
    pub fn call_named(&mut self, name: &str, args: Vec<NodeIndex>) -> NodeIndex {
        let callee = self.ident(name);
        self.call(callee, args)
    }

    pub fn access(&mut self, base: NodeIndex, property: &str) -> NodeIndex {
        self.arena.access(self.span, base, property)
    }

    pub fn function(&mut self, name: Option<&str>, params: &[&str], body: Vec<NodeIndex>) -> NodeIndex {
        let params = params.iter().map(|param| self.ident(param)).collect();
        let (body, has_declared_functions) = self.function_body(body);
        let mut flags = FunctionFlags::empty();
        flags.set(FunctionFlags::HAS_DECLARED_FUNCTIONS, has_declared_functions);
        self.arena
            .function_node(self.span, name.map(str::to_string), params, body, flags)
    }

    /// The top-level script.
    pub fn program(&mut self, body: Vec<NodeIndex>) -> NodeIndex {
        self.program_with_flags(body, FunctionFlags::empty())
    }

    pub fn program_with_flags(&mut self, body: Vec<NodeIndex>, flags: FunctionFlags) -> NodeIndex {
        let (body, has_declared_functions) = self.function_body(body);
        let mut flags = flags | FunctionFlags::IS_PROGRAM;
        flags.set(FunctionFlags::HAS_DECLARED_FUNCTIONS, has_declared_functions);
        self.arena
            .function_node(self.span, Some(":program".to_string()), Vec::new(), body, flags)
    }

    // Statements

    pub fn expr(&mut self, expression: NodeIndex) -> NodeIndex {
        self.arena.expression_statement(self.span, expression)
    }

    pub fn var(&mut self, name: &str, init: Option<NodeIndex>) -> NodeIndex {
        let name = self.ident(name);
        self.arena.var(self.span, name, init)
    }

    /// `function name(params) { body }` as a declaration.
    pub fn function_declaration(&mut self, name: &str, params: &[&str], body: Vec<NodeIndex>) -> NodeIndex {
        let func = self.function(Some(name), params, body);
        let name = self.ident(name);
        self.arena.add_node(
            self.span,
            NodeFlags::IS_FUNCTION_DECLARATION,
            NodeData::Var(VarData {
                name,
                init: Some(func),
            }),
        )
    }

    pub fn block(&mut self, statements: Vec<NodeIndex>) -> NodeIndex {
        self.arena.block(self.span, statements)
    }

    pub fn if_else(&mut self, test: NodeIndex, pass: Vec<NodeIndex>, fail: Option<Vec<NodeIndex>>) -> NodeIndex {
        let pass = self.block(pass);
        let fail = fail.map(|fail| self.block(fail));
        self.arena.if_statement(self.span, test, pass, fail)
    }

    pub fn while_loop(&mut self, test: Option<NodeIndex>, body: Vec<NodeIndex>) -> NodeIndex {
        let body = self.block(body);
        self.arena.while_loop(self.span, test, body)
    }

    pub fn do_while(&mut self, body: Vec<NodeIndex>, test: Option<NodeIndex>) -> NodeIndex {
        let body = self.block(body);
        self.arena.do_while(self.span, body, test)
    }

    pub fn for_loop(
        &mut self,
        init: Option<NodeIndex>,
        test: Option<NodeIndex>,
        modify: Option<NodeIndex>,
        body: Vec<NodeIndex>,
    ) -> NodeIndex {
        let body = self.block(body);
        self.arena.for_loop(self.span, init, test, modify, body)
    }

    /// `for (;;) { body }`
    pub fn for_ever(&mut self, body: Vec<NodeIndex>) -> NodeIndex {
        self.for_loop(None, None, None, body)
    }

    pub fn for_in(&mut self, target: &str, object: NodeIndex, body: Vec<NodeIndex>) -> NodeIndex {
        let target = self.ident(target);
        let body = self.block(body);
        self.arena.for_in(self.span, target, object, body)
    }

    /// `try { body } catch (name) { ... } ... finally { ... }`
    pub fn try_catch_finally(
        &mut self,
        body: Vec<NodeIndex>,
        catches: Vec<(&str, Vec<NodeIndex>)>,
        finally_body: Option<Vec<NodeIndex>>,
    ) -> NodeIndex {
        let body = self.block(body);
        let catch_blocks = catches
            .into_iter()
            .map(|(name, statements)| {
                let exception = self.ident(name);
                let catch_body = self.block(statements);
                self.arena.catch_block(self.span, exception, None, catch_body)
            })
            .collect();
        let finally_body = finally_body.map(|statements| self.block(statements));
        self.arena
            .try_statement(self.span, body, catch_blocks, finally_body)
    }

    pub fn try_finally(&mut self, body: Vec<NodeIndex>, finally_body: Vec<NodeIndex>) -> NodeIndex {
        self.try_catch_finally(body, Vec::new(), Some(finally_body))
    }

    pub fn throw(&mut self, expression: NodeIndex) -> NodeIndex {
        self.arena.throw(self.span, expression)
    }

    pub fn ret(&mut self, expression: Option<NodeIndex>) -> NodeIndex {
        self.arena.return_statement(self.span, expression)
    }

    pub fn break_to(&mut self, label: Option<&str>) -> NodeIndex {
        self.arena.break_statement(self.span, label.map(str::to_string))
    }

    pub fn continue_to(&mut self, label: Option<&str>) -> NodeIndex {
        self.arena
            .continue_statement(self.span, label.map(str::to_string))
    }

    pub fn labelled(&mut self, name: &str, body: Vec<NodeIndex>) -> NodeIndex {
        let body = self.block(body);
        self.arena.labelled(self.span, name, body)
    }

    /// `switch (discriminant) { case test: ... }`, `None` test is `default`.
    pub fn switch(&mut self, discriminant: NodeIndex, cases: Vec<(Option<NodeIndex>, Vec<NodeIndex>)>) -> NodeIndex {
        let cases = cases
            .into_iter()
            .map(|(test, statements)| {
                let body = self.block(statements);
                self.arena.case(self.span, test, body)
            })
            .collect();
        self.arena.switch(self.span, discriminant, cases)
    }

    pub fn with(&mut self, object: NodeIndex, body: Vec<NodeIndex>) -> NodeIndex {
        let body = self.block(body);
        self.arena.with(self.span, object, body)
    }

    pub fn empty(&mut self) -> NodeIndex {
        self.arena.empty(self.span)
    }

    fn function_body(&mut self, statements: Vec<NodeIndex>) -> (NodeIndex, bool) {
        let (statements, has_declared_functions) =
            hoist_function_declarations(self.arena, statements);
        (self.block(statements), has_declared_functions)
    }
}

/// Move function declarations to the front of a function body, keeping
/// their relative order, and tag the last one.
///
/// Returns the new statement list and whether any declaration was found.
pub(crate) fn hoist_function_declarations(
    arena: &mut NodeArena,
    statements: Vec<NodeIndex>,
) -> (Vec<NodeIndex>, bool) {
    let (mut declarations, rest): (Vec<_>, Vec<_>) = statements
        .into_iter()
        .partition(|&stmt| arena.has_flag(stmt, NodeFlags::IS_FUNCTION_DECLARATION));
    if let Some(last) = declarations.last_mut() {
        *last = arena.with_flag(*last, NodeFlags::IS_LAST_FUNCTION_DECLARATION, true);
    }
    let found = !declarations.is_empty();
    declarations.extend(rest);
    (declarations, found)
}
