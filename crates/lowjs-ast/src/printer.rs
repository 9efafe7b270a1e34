//! JavaScript-like printer for (lowered) trees.
//!
//! The output is meant for humans and golden tests: synthesized names such
//! as `:return` are printed verbatim, so it is not always valid JavaScript.
//! With [`PrintOptions::annotate`] set, breakable nodes carry a
//! `/* L<n> ... */` comment naming their jump label and flags, and eval call
//! sites show their attached arguments.

use crate::arena::NodeArena;
use crate::node::*;
use lowjs_common::limits::MAX_PRINT_DEPTH;

#[derive(Clone, Debug)]
pub struct PrintOptions {
    /// Annotate jump labels, terminal blocks, escaping loops and eval sites.
    pub annotate: bool,
    pub indent: &'static str,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            annotate: false,
            indent: "    ",
        }
    }
}

const PREC_COMMA: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_TERNARY: u8 = 3;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_MEMBER: u8 = 18;
const PREC_PRIMARY: u8 = 19;

pub struct Printer<'a> {
    arena: &'a NodeArena,
    options: PrintOptions,
    output: String,
    indent_level: u32,
    depth: u32,
}

impl<'a> Printer<'a> {
    #[must_use]
    pub fn new(arena: &'a NodeArena, options: PrintOptions) -> Self {
        Self {
            arena,
            options,
            output: String::new(),
            indent_level: 0,
            depth: 0,
        }
    }

    /// Print `root`: a program prints as its body statements, any other
    /// statement or expression prints as itself.
    #[must_use]
    pub fn print_to_string(arena: &NodeArena, root: NodeIndex, options: PrintOptions) -> String {
        let mut printer = Printer::new(arena, options);
        printer.print_root(root);
        printer.finish()
    }

    pub fn print_root(&mut self, root: NodeIndex) {
        let arena = self.arena;
        match arena.function(root) {
            Some(func) if func.is_program() => {
                let body = func.body;
                if self.options.annotate
                    && let Some(note) = self.annotation(body)
                {
                    self.write("/* ");
                    self.write(&note);
                    self.write(" */");
                    self.write_line();
                }
                for &stmt in arena.statements(body) {
                    self.emit_statement_line(stmt);
                }
            }
            _ => match arena.data(root) {
                Some(data) if data.is_statement() => self.emit_statement_line(root),
                _ => {
                    self.emit_expression(root, PREC_COMMA);
                    self.write_line();
                }
            },
        }
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.output
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn emit_statement_line(&mut self, idx: NodeIndex) {
        self.write_indent();
        self.emit_statement(idx);
        self.write_line();
    }

    fn emit_statement(&mut self, idx: NodeIndex) {
        if self.depth >= MAX_PRINT_DEPTH {
            self.write("/* ... */");
            return;
        }
        self.depth += 1;
        self.emit_statement_inner(idx);
        self.depth -= 1;
    }

    fn emit_statement_inner(&mut self, idx: NodeIndex) {
        let arena = self.arena;
        let Some(node) = arena.get(idx) else {
            self.write("/* <missing> */");
            return;
        };
        match &node.data {
            NodeData::Block(_) => self.emit_block(idx),
            NodeData::ExpressionStatement(stmt) => {
                if self.starts_ambiguously(stmt.expression) {
                    self.write("(");
                    self.emit_expression(stmt.expression, PREC_COMMA);
                    self.write(")");
                } else {
                    self.emit_expression(stmt.expression, PREC_COMMA);
                }
                self.write(";");
            }
            NodeData::Var(var) => self.emit_var(node, var),
            NodeData::If(if_data) => {
                self.write("if (");
                self.emit_expression(if_data.test, PREC_COMMA);
                self.write(") ");
                self.emit_block(if_data.pass);
                if let Some(fail) = if_data.fail {
                    self.write(" else ");
                    self.emit_block(fail);
                }
            }
            NodeData::For(for_data) => {
                self.write("for (");
                match for_data.kind {
                    ForKind::For => {
                        self.emit_optional(for_data.init);
                        self.write(";");
                        if let Some(test) = for_data.test {
                            self.write(" ");
                            self.emit_expression(test, PREC_COMMA);
                        }
                        self.write(";");
                        if let Some(modify) = for_data.modify {
                            self.write(" ");
                            self.emit_expression(modify, PREC_COMMA);
                        }
                    }
                    ForKind::ForIn => {
                        self.emit_optional(for_data.init);
                        self.write(" in ");
                        self.emit_optional(for_data.modify);
                    }
                }
                self.write(") ");
                self.emit_annotation(idx);
                self.emit_block(for_data.body);
            }
            NodeData::While(while_data) => {
                if while_data.is_do_while {
                    self.write("do ");
                    self.emit_annotation(idx);
                    self.emit_block(while_data.body);
                    self.write(" while (");
                    self.emit_test(while_data.test);
                    self.write(");");
                } else {
                    self.write("while (");
                    self.emit_test(while_data.test);
                    self.write(") ");
                    self.emit_annotation(idx);
                    self.emit_block(while_data.body);
                }
            }
            NodeData::Try(try_data) => {
                self.write("try ");
                self.emit_block(try_data.body);
                for &catch_block in &try_data.catch_blocks {
                    self.write(" ");
                    match arena.statements(catch_block) {
                        [catch] => self.emit_statement(*catch),
                        _ => self.emit_block(catch_block),
                    }
                }
                if let Some(finally_body) = try_data.finally_body {
                    self.write(" finally ");
                    self.emit_block(finally_body);
                }
            }
            NodeData::Catch(catch) => {
                self.write("catch (");
                self.emit_expression(catch.exception, PREC_PRIMARY);
                if let Some(condition) = catch.condition {
                    self.write(" if ");
                    self.emit_expression(condition, PREC_COMMA);
                }
                self.write(") ");
                self.emit_block(catch.body);
            }
            NodeData::Throw(throw) => {
                self.write("throw ");
                self.emit_expression(throw.expression, PREC_COMMA);
                self.write(";");
            }
            NodeData::Return(ret) => {
                self.write("return");
                if let Some(expression) = ret.expression {
                    self.write(" ");
                    self.emit_expression(expression, PREC_COMMA);
                }
                self.write(";");
            }
            NodeData::Break(jump) => self.emit_jump("break", jump),
            NodeData::Continue(jump) => self.emit_jump("continue", jump),
            NodeData::Labelled(labelled) => {
                self.write(&labelled.name);
                self.write(": ");
                self.emit_annotation(idx);
                self.emit_block(labelled.body);
            }
            NodeData::Switch(switch) => {
                self.write("switch (");
                self.emit_expression(switch.discriminant, PREC_COMMA);
                self.write(") ");
                self.emit_annotation(idx);
                self.write("{");
                self.write_line();
                for &case in &switch.cases {
                    self.emit_case(case);
                }
                self.write_indent();
                self.write("}");
            }
            NodeData::Case(_) => self.emit_case(idx),
            NodeData::With(with) => {
                self.write("with (");
                self.emit_expression(with.object, PREC_COMMA);
                self.write(") ");
                self.emit_block(with.body);
            }
            NodeData::Empty => self.write(";"),
            _ => {
                self.emit_expression(idx, PREC_COMMA);
                self.write(";");
            }
        }
    }

    fn emit_var(&mut self, node: &Node, var: &VarData) {
        let arena = self.arena;
        if node.has_flag(NodeFlags::IS_FUNCTION_DECLARATION)
            && let Some(init) = var.init
            && let Some(func) = arena.function(init)
        {
            self.emit_function(arena.ident_name(var.name), func);
            return;
        }
        self.write("var ");
        self.emit_expression(var.name, PREC_PRIMARY);
        if let Some(init) = var.init {
            self.write(" = ");
            self.emit_expression(init, PREC_ASSIGN);
        }
        self.write(";");
    }

    fn emit_jump(&mut self, keyword: &str, jump: &JumpData) {
        self.write(keyword);
        if let Some(label) = &jump.label {
            self.write(" ");
            self.write(label);
        }
        self.write(";");
    }

    fn emit_case(&mut self, idx: NodeIndex) {
        let arena = self.arena;
        let Some(NodeData::Case(case)) = arena.data(idx) else {
            return;
        };
        self.write_indent();
        match case.test {
            Some(test) => {
                self.write("case ");
                self.emit_expression(test, PREC_COMMA);
                self.write(":");
            }
            None => self.write("default:"),
        }
        self.write_line();
        self.increase_indent();
        for &stmt in arena.statements(case.body) {
            self.emit_statement_line(stmt);
        }
        self.decrease_indent();
    }

    fn emit_block(&mut self, idx: NodeIndex) {
        self.write("{");
        if let Some(note) = self.annotation(idx) {
            self.write(" /* ");
            self.write(&note);
            self.write(" */");
        }
        let arena = self.arena;
        let statements = arena.statements(idx);
        if statements.is_empty() {
            self.write(" }");
            return;
        }
        self.write_line();
        self.increase_indent();
        for &stmt in statements {
            self.emit_statement_line(stmt);
        }
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    fn emit_optional(&mut self, idx: Option<NodeIndex>) {
        if let Some(idx) = idx {
            self.emit_expression(idx, PREC_COMMA);
        }
    }

    fn emit_test(&mut self, test: Option<NodeIndex>) {
        match test {
            Some(test) => self.emit_expression(test, PREC_COMMA),
            None => self.write("true"),
        }
    }

    /// Annotation comment for a loop, switch or labelled statement, written
    /// before its body.
    fn emit_annotation(&mut self, idx: NodeIndex) {
        if let Some(note) = self.annotation(idx) {
            self.write("/* ");
            self.write(&note);
            self.write(" */ ");
        }
    }

    fn annotation(&self, idx: NodeIndex) -> Option<String> {
        if !self.options.annotate {
            return None;
        }
        let node = self.arena.get(idx)?;
        let mut parts = Vec::new();
        if let Some(label) = node.data.jump_label() {
            parts.push(label.to_string());
        }
        if matches!(node.data, NodeData::Block(_)) && node.has_flag(NodeFlags::TERMINAL) {
            parts.push("terminal".to_string());
        }
        if node.has_flag(NodeFlags::CONTROL_FLOW_ESCAPES) {
            parts.push("escapes".to_string());
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Expression statements must not start with `function` or `{`.
    fn starts_ambiguously(&self, idx: NodeIndex) -> bool {
        let mut current = idx;
        loop {
            match self.arena.data(current) {
                Some(NodeData::Function(_) | NodeData::Object(_)) => return true,
                Some(NodeData::Binary(binary)) => current = binary.lhs,
                Some(NodeData::Call(call)) if !call.is_new => current = call.callee,
                Some(NodeData::Access(access)) => current = access.base,
                Some(NodeData::Index(index)) => current = index.base,
                Some(NodeData::Ternary(ternary)) => current = ternary.test,
                Some(NodeData::Unary(unary)) if unary.op.is_postfix() => current = unary.operand,
                _ => return false,
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Emit an expression, parenthesized when it binds looser than `min_prec`.
    fn emit_expression(&mut self, idx: NodeIndex, min_prec: u8) {
        if self.depth >= MAX_PRINT_DEPTH {
            self.write("/* ... */");
            return;
        }
        let prec = self.precedence(idx);
        let parens = prec < min_prec;
        if parens {
            self.write("(");
        }
        self.depth += 1;
        self.emit_expression_inner(idx);
        self.depth -= 1;
        if parens {
            self.write(")");
        }
    }

    fn precedence(&self, idx: NodeIndex) -> u8 {
        match self.arena.data(idx) {
            Some(NodeData::Binary(binary)) => binary.op.precedence(),
            Some(NodeData::Ternary(_)) => PREC_TERNARY,
            Some(NodeData::Unary(unary)) if unary.op.is_postfix() => PREC_POSTFIX,
            Some(NodeData::Unary(_)) => PREC_UNARY,
            Some(NodeData::Call(_) | NodeData::Access(_) | NodeData::Index(_)) => PREC_MEMBER,
            _ => PREC_PRIMARY,
        }
    }

    fn emit_expression_inner(&mut self, idx: NodeIndex) {
        let arena = self.arena;
        let Some(node) = arena.get(idx) else {
            self.write("/* <missing> */");
            return;
        };
        match &node.data {
            NodeData::Ident(ident) => self.write(&ident.name),
            NodeData::Literal(literal) => self.emit_literal(literal),
            NodeData::Unary(unary) => {
                if unary.op.is_postfix() {
                    self.emit_expression(unary.operand, PREC_POSTFIX);
                    self.write(unary.op.as_str());
                } else {
                    self.write(unary.op.as_str());
                    if unary.op.is_keyword() {
                        self.write(" ");
                    }
                    self.emit_expression(unary.operand, PREC_UNARY);
                }
            }
            NodeData::Binary(binary) => {
                let prec = binary.op.precedence();
                let (lhs_prec, rhs_prec) = if binary.op.is_assignment() {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.emit_expression(binary.lhs, lhs_prec);
                if binary.op == BinaryOp::Comma {
                    self.write(", ");
                } else {
                    self.write(" ");
                    self.write(binary.op.as_str());
                    self.write(" ");
                }
                self.emit_expression(binary.rhs, rhs_prec);
            }
            NodeData::Ternary(ternary) => {
                self.emit_expression(ternary.test, PREC_TERNARY + 1);
                self.write(" ? ");
                self.emit_expression(ternary.pass, PREC_ASSIGN);
                self.write(" : ");
                self.emit_expression(ternary.fail, PREC_ASSIGN);
            }
            NodeData::Call(call) => {
                if call.is_new {
                    self.write("new ");
                }
                self.emit_expression(call.callee, PREC_MEMBER);
                self.write("(");
                self.emit_comma_separated(&call.args);
                self.write(")");
                if self.options.annotate
                    && let Some(eval) = &call.eval_args
                {
                    self.write(" /* eval ");
                    self.emit_expression(eval.code, PREC_ASSIGN);
                    self.write(" this=");
                    self.emit_expression(eval.this, PREC_PRIMARY);
                    self.write(" at ");
                    self.write(&eval.location);
                    if eval.strict {
                        self.write(" strict");
                    }
                    self.write(" */");
                }
            }
            NodeData::Access(access) => {
                self.emit_expression(access.base, PREC_MEMBER);
                self.write(".");
                self.write(&access.property);
            }
            NodeData::Index(index) => {
                self.emit_expression(index.base, PREC_MEMBER);
                self.write("[");
                self.emit_expression(index.index, PREC_COMMA);
                self.write("]");
            }
            NodeData::Array(array) => {
                self.write("[");
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(element) = element {
                        self.emit_expression(*element, PREC_ASSIGN);
                    }
                }
                if matches!(array.elements.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            NodeData::Object(object) => self.emit_object(object),
            NodeData::Function(func) => self.emit_function(func.name.as_deref(), func),
            _ => {
                self.write("/* ");
                self.write(node.kind_name());
                self.write(" */");
            }
        }
    }

    fn emit_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Undefined => self.write("undefined"),
            Literal::Null => self.write("null"),
            Literal::Boolean(true) => self.write("true"),
            Literal::Boolean(false) => self.write("false"),
            Literal::Number(value) => {
                let text = format_number(*value);
                self.write(&text);
            }
            Literal::String(value) => {
                let quoted = serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"));
                self.write(&quoted);
            }
        }
    }

    fn emit_object(&mut self, object: &ObjectData) {
        let arena = self.arena;
        if object.properties.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{ ");
        for (i, property) in object.properties.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match (property.kind, arena.function(property.value)) {
                (PropertyKind::Get | PropertyKind::Set, Some(func)) => {
                    self.write(if property.kind == PropertyKind::Get {
                        "get "
                    } else {
                        "set "
                    });
                    self.write(&property.key);
                    self.emit_params_and_body(func);
                }
                _ => {
                    self.write(&property.key);
                    self.write(": ");
                    self.emit_expression(property.value, PREC_ASSIGN);
                }
            }
        }
        self.write(" }");
    }

    fn emit_function(&mut self, name: Option<&str>, func: &FunctionData) {
        self.write("function");
        if let Some(name) = name {
            self.write(" ");
            self.write(name);
        }
        if self.options.annotate && func.state.contains(CompilationStates::LOWERED) {
            self.write(" /* lowered */");
        }
        self.emit_params_and_body(func);
    }

    fn emit_params_and_body(&mut self, func: &FunctionData) {
        self.write("(");
        self.emit_comma_separated(&func.params);
        self.write(") ");
        self.emit_block(func.body);
    }

    fn emit_comma_separated(&mut self, nodes: &[NodeIndex]) {
        for (i, &node) in nodes.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expression(node, PREC_ASSIGN);
        }
    }

    // =========================================================================
    // Output helpers
    // =========================================================================

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_line(&mut self) {
        self.output.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(self.options.indent);
        }
    }

    const fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    const fn decrease_indent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }
}

/// Integral values print without a fraction, everything else uses Rust's
/// shortest round-trip formatting.
fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
