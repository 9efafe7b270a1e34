//! ESTree JSON import.
//!
//! Converts a `Program` in the ESTree format (as produced by acorn or
//! esprima with `locations`/`ranges` enabled) into a [`NodeArena`]. Only the
//! ES5 surface the node model covers is accepted; anything else is reported
//! as [`ImportError::UnsupportedNode`] or [`ImportError::Unsupported`]
//! instead of being approximated.
//!
//! The importer also does the work a front-end does before lowering:
//! function declarations are hoisted to the front of their function body,
//! `for (var ...)` declarations are hoisted in front of the loop, and
//! `"use strict"` directives set the strict flag of their function.

use crate::arena::NodeArena;
use crate::builder::hoist_function_declarations;
use crate::node::*;
use lowjs_common::Span;
use lowjs_common::limits::MAX_IMPORT_DEPTH;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Treat the whole script as strict code.
    pub strict: bool,
    /// Mark nested functions lazy (compiled on first call, skipped by the
    /// lowering pass).
    pub lazy_functions: bool,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line {line}: {node_type} is missing field `{field}`")]
    MissingField {
        node_type: String,
        field: &'static str,
        line: u32,
    },
    #[error("line {line}: field `{field}` of {node_type} has an unexpected shape")]
    InvalidField {
        node_type: String,
        field: &'static str,
        line: u32,
    },
    #[error("line {line}: unsupported node type `{node_type}`")]
    UnsupportedNode { node_type: String, line: u32 },
    #[error("line {line}: unsupported construct: {detail}")]
    Unsupported { detail: String, line: u32 },
    #[error("tree nested deeper than {limit} levels")]
    TooDeep { limit: u32 },
}

/// Parse `json` and import the ESTree `Program` it contains.
///
/// Returns the arena and the index of the program's `Function` node.
pub fn import_program(json: &str, options: &ImportOptions) -> Result<(NodeArena, NodeIndex), ImportError> {
    let value: Value = serde_json::from_str(json)?;
    import_value(&value, options)
}

/// Import an already parsed ESTree `Program`.
pub fn import_value(value: &Value, options: &ImportOptions) -> Result<(NodeArena, NodeIndex), ImportError> {
    let mut importer = Importer {
        arena: NodeArena::new(),
        options,
        depth: 0,
    };
    let root = importer.program(value)?;
    Ok((importer.arena, root))
}

struct Importer<'o> {
    arena: NodeArena,
    options: &'o ImportOptions,
    depth: u32,
}

impl Importer<'_> {
    fn program(&mut self, value: &Value) -> Result<NodeIndex, ImportError> {
        let node_type = node_type(value)?;
        if node_type != "Program" {
            return Err(ImportError::UnsupportedNode {
                node_type: node_type.to_string(),
                line: line_of(value),
            });
        }
        let statements = array_field(value, "body")?;
        let strict = self.options.strict || has_use_strict(statements);
        let (body, has_declared_functions) = self.function_body(value, statements, strict)?;

        let mut flags = FunctionFlags::IS_PROGRAM;
        flags.set(FunctionFlags::IS_STRICT, strict);
        flags.set(FunctionFlags::HAS_DECLARED_FUNCTIONS, has_declared_functions);
        Ok(self
            .arena
            .function_node(span_of(value), Some(":program".to_string()), Vec::new(), body, flags))
    }

    fn function_body(
        &mut self,
        owner: &Value,
        statements: &[Value],
        strict: bool,
    ) -> Result<(NodeIndex, bool), ImportError> {
        let statements = self.statement_list(statements, strict)?;
        let (statements, has_declared_functions) = hoist_function_declarations(&mut self.arena, statements);
        Ok((self.arena.block(span_of(owner), statements), has_declared_functions))
    }

    fn function(&mut self, value: &Value, strict: bool) -> Result<NodeIndex, ImportError> {
        self.guard(|this| {
            let name = match opt_field(value, "id") {
                Some(id) => Some(identifier_name(id)?.to_string()),
                None => None,
            };
            if value.get("generator").and_then(Value::as_bool) == Some(true)
                || value.get("async").and_then(Value::as_bool) == Some(true)
            {
                return Err(unsupported(value, "generator and async functions"));
            }
            let params = array_field(value, "params")?
                .iter()
                .map(|param| {
                    let name = identifier_name(param)?;
                    Ok(this.arena.ident(span_of(param), name))
                })
                .collect::<Result<Vec<_>, ImportError>>()?;

            let body = field(value, "body")?;
            let statements = array_field(body, "body")?;
            let strict = strict || has_use_strict(statements);
            let (body, has_declared_functions) = this.function_body(body, statements, strict)?;

            let mut flags = FunctionFlags::empty();
            flags.set(FunctionFlags::IS_STRICT, strict);
            flags.set(FunctionFlags::HAS_DECLARED_FUNCTIONS, has_declared_functions);
            flags.set(FunctionFlags::IS_LAZY, this.options.lazy_functions);
            Ok(this.arena.function_node(span_of(value), name, params, body, flags))
        })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement_list(&mut self, values: &[Value], strict: bool) -> Result<Vec<NodeIndex>, ImportError> {
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            self.statement(value, strict, &mut out)?;
        }
        Ok(out)
    }

    /// Convert a statement used as a body into a block.
    fn body_block(&mut self, value: &Value, strict: bool) -> Result<NodeIndex, ImportError> {
        let statements = if node_type(value)? == "BlockStatement" {
            self.statement_list(array_field(value, "body")?, strict)?
        } else {
            let mut out = Vec::new();
            self.statement(value, strict, &mut out)?;
            out
        };
        Ok(self.arena.block(span_of(value), statements))
    }

    /// Convert one statement, appending the result to `out`. Declarations
    /// and hoisted loop variables can produce several statements.
    fn statement(&mut self, value: &Value, strict: bool, out: &mut Vec<NodeIndex>) -> Result<(), ImportError> {
        self.guard(|this| this.statement_inner(value, strict, out))
    }

    fn statement_inner(&mut self, value: &Value, strict: bool, out: &mut Vec<NodeIndex>) -> Result<(), ImportError> {
        let span = span_of(value);
        let stmt = match node_type(value)? {
            "ExpressionStatement" => {
                let expression = self.expression(field(value, "expression")?, strict)?;
                self.arena.expression_statement(span, expression)
            }
            "BlockStatement" => self.body_block(value, strict)?,
            "EmptyStatement" => self.arena.empty(span),
            "VariableDeclaration" => {
                for (name, init) in self.var_declarators(value, strict)? {
                    out.push(self.arena.var(span, name, init));
                }
                return Ok(());
            }
            "FunctionDeclaration" => {
                let id = field(value, "id")?;
                let name = self.arena.ident(span_of(id), identifier_name(id)?);
                let func = self.function(value, strict)?;
                self.arena.add_node(
                    span,
                    NodeFlags::IS_FUNCTION_DECLARATION,
                    NodeData::Var(VarData { name, init: Some(func) }),
                )
            }
            "IfStatement" => {
                let test = self.expression(field(value, "test")?, strict)?;
                let pass = self.body_block(field(value, "consequent")?, strict)?;
                let fail = match opt_field(value, "alternate") {
                    Some(alternate) => Some(self.body_block(alternate, strict)?),
                    None => None,
                };
                self.arena.if_statement(span, test, pass, fail)
            }
            "ForStatement" => {
                let init = match opt_field(value, "init") {
                    Some(init) if node_type(init)? == "VariableDeclaration" => {
                        for (name, init) in self.var_declarators(init, strict)? {
                            out.push(self.arena.var(span, name, init));
                        }
                        None
                    }
                    Some(init) => Some(self.expression(init, strict)?),
                    None => None,
                };
                let test = self.opt_expression(value, "test", strict)?;
                let modify = self.opt_expression(value, "update", strict)?;
                let body = self.body_block(field(value, "body")?, strict)?;
                self.arena.for_loop(span, init, test, modify, body)
            }
            "ForInStatement" => {
                let left = field(value, "left")?;
                let target = if node_type(left)? == "VariableDeclaration" {
                    let mut declarators = self.var_declarators(left, strict)?;
                    let (name, init) = match (declarators.pop(), declarators.is_empty()) {
                        (Some(declarator), true) => declarator,
                        _ => return Err(unsupported(left, "for-in with several declarations")),
                    };
                    let target_name = self.arena.ident_name(name).unwrap_or_default().to_string();
                    out.push(self.arena.var(span, name, init));
                    self.arena.ident(span_of(left), target_name)
                } else {
                    self.expression(left, strict)?
                };
                let object = self.expression(field(value, "right")?, strict)?;
                let body = self.body_block(field(value, "body")?, strict)?;
                self.arena.for_in(span, target, object, body)
            }
            "WhileStatement" => {
                let test = self.expression(field(value, "test")?, strict)?;
                let body = self.body_block(field(value, "body")?, strict)?;
                self.arena.while_loop(span, Some(test), body)
            }
            "DoWhileStatement" => {
                let body = self.body_block(field(value, "body")?, strict)?;
                let test = self.expression(field(value, "test")?, strict)?;
                self.arena.do_while(span, body, Some(test))
            }
            "TryStatement" => {
                let body = self.body_block(field(value, "block")?, strict)?;
                let mut catch_blocks = Vec::new();
                // esprima 1.x reports catch clauses as `guardedHandlers` + `handlers`.
                for key in ["guardedHandlers", "handlers"] {
                    if let Some(Value::Array(handlers)) = value.get(key) {
                        for handler in handlers {
                            catch_blocks.push(self.catch_block(handler, strict)?);
                        }
                    }
                }
                if catch_blocks.is_empty()
                    && let Some(handler) = opt_field(value, "handler")
                {
                    catch_blocks.push(self.catch_block(handler, strict)?);
                }
                let finally_body = match opt_field(value, "finalizer") {
                    Some(finalizer) => Some(self.body_block(finalizer, strict)?),
                    None => None,
                };
                self.arena.try_statement(span, body, catch_blocks, finally_body)
            }
            "ThrowStatement" => {
                let expression = self.expression(field(value, "argument")?, strict)?;
                self.arena.throw(span, expression)
            }
            "ReturnStatement" => {
                let expression = self.opt_expression(value, "argument", strict)?;
                self.arena.return_statement(span, expression)
            }
            "BreakStatement" => {
                let label = self.jump_label(value)?;
                self.arena.break_statement(span, label)
            }
            "ContinueStatement" => {
                let label = self.jump_label(value)?;
                self.arena.continue_statement(span, label)
            }
            "LabeledStatement" => {
                let name = identifier_name(field(value, "label")?)?.to_string();
                let body = self.body_block(field(value, "body")?, strict)?;
                self.arena.labelled(span, name, body)
            }
            "SwitchStatement" => {
                let discriminant = self.expression(field(value, "discriminant")?, strict)?;
                let cases = array_field(value, "cases")?
                    .iter()
                    .map(|case| {
                        let test = self.opt_expression(case, "test", strict)?;
                        let statements = self.statement_list(array_field(case, "consequent")?, strict)?;
                        let body = self.arena.block(span_of(case), statements);
                        Ok(self.arena.case(span_of(case), test, body))
                    })
                    .collect::<Result<Vec<_>, ImportError>>()?;
                self.arena.switch(span, discriminant, cases)
            }
            "WithStatement" => {
                if strict {
                    return Err(unsupported(value, "`with` in strict code"));
                }
                let object = self.expression(field(value, "object")?, strict)?;
                let body = self.body_block(field(value, "body")?, strict)?;
                self.arena.with(span, object, body)
            }
            other => {
                return Err(ImportError::UnsupportedNode {
                    node_type: other.to_string(),
                    line: span.line,
                });
            }
        };
        out.push(stmt);
        Ok(())
    }

    fn var_declarators(
        &mut self,
        declaration: &Value,
        strict: bool,
    ) -> Result<Vec<(NodeIndex, Option<NodeIndex>)>, ImportError> {
        match declaration.get("kind").and_then(Value::as_str) {
            Some("var") | None => {}
            Some(kind) => return Err(unsupported(declaration, &format!("`{kind}` declarations"))),
        }
        array_field(declaration, "declarations")?
            .iter()
            .map(|declarator| {
                let id = field(declarator, "id")?;
                let name = self.arena.ident(span_of(id), identifier_name(id)?);
                let init = self.opt_expression(declarator, "init", strict)?;
                Ok((name, init))
            })
            .collect()
    }

    fn catch_block(&mut self, clause: &Value, strict: bool) -> Result<NodeIndex, ImportError> {
        let span = span_of(clause);
        let param = field(clause, "param")?;
        let exception = self.arena.ident(span_of(param), identifier_name(param)?);
        let condition = self.opt_expression(clause, "guard", strict)?;
        let body = self.body_block(field(clause, "body")?, strict)?;
        Ok(self.arena.catch_block(span, exception, condition, body))
    }

    fn jump_label(&self, value: &Value) -> Result<Option<String>, ImportError> {
        match opt_field(value, "label") {
            Some(label) => Ok(Some(identifier_name(label)?.to_string())),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn opt_expression(&mut self, value: &Value, name: &'static str, strict: bool) -> Result<Option<NodeIndex>, ImportError> {
        match opt_field(value, name) {
            Some(expression) => Ok(Some(self.expression(expression, strict)?)),
            None => Ok(None),
        }
    }

    fn expression(&mut self, value: &Value, strict: bool) -> Result<NodeIndex, ImportError> {
        self.guard(|this| this.expression_inner(value, strict))
    }

    fn expression_inner(&mut self, value: &Value, strict: bool) -> Result<NodeIndex, ImportError> {
        let span = span_of(value);
        let node_type = node_type(value)?;
        match node_type {
            "Identifier" => Ok(self.arena.ident(span, identifier_name(value)?)),
            "ThisExpression" => Ok(self.arena.ident(span, "this")),
            "Literal" => {
                let literal = literal(value)?;
                Ok(self.arena.literal(span, literal))
            }
            "ArrayExpression" => {
                let elements = array_field(value, "elements")?
                    .iter()
                    .map(|element| match element {
                        Value::Null => Ok(None),
                        element => Ok(Some(self.expression(element, strict)?)),
                    })
                    .collect::<Result<Vec<_>, ImportError>>()?;
                Ok(self.arena.array(span, elements))
            }
            "ObjectExpression" => {
                let properties = array_field(value, "properties")?
                    .iter()
                    .map(|property| self.property(property, strict))
                    .collect::<Result<Vec<_>, ImportError>>()?;
                Ok(self.arena.object(span, properties))
            }
            "FunctionExpression" => self.function(value, strict),
            "UnaryExpression" => {
                let op = match str_field(value, "operator")? {
                    "-" => UnaryOp::Neg,
                    "+" => UnaryOp::Plus,
                    "!" => UnaryOp::Not,
                    "~" => UnaryOp::BitNot,
                    "typeof" => UnaryOp::Typeof,
                    "void" => UnaryOp::Void,
                    "delete" => UnaryOp::Delete,
                    _ => return Err(invalid(value, "operator")),
                };
                let operand = self.expression(field(value, "argument")?, strict)?;
                Ok(self.arena.unary(span, op, operand))
            }
            "UpdateExpression" => {
                let prefix = value.get("prefix").and_then(Value::as_bool).unwrap_or(false);
                let op = match (str_field(value, "operator")?, prefix) {
                    ("++", true) => UnaryOp::PreIncrement,
                    ("--", true) => UnaryOp::PreDecrement,
                    ("++", false) => UnaryOp::PostIncrement,
                    ("--", false) => UnaryOp::PostDecrement,
                    _ => return Err(invalid(value, "operator")),
                };
                let operand = self.expression(field(value, "argument")?, strict)?;
                Ok(self.arena.unary(span, op, operand))
            }
            "BinaryExpression" | "LogicalExpression" | "AssignmentExpression" => {
                let operator = str_field(value, "operator")?;
                let op = BinaryOp::from_token(operator)
                    .ok_or_else(|| unsupported(value, &format!("operator `{operator}`")))?;
                let lhs = self.expression(field(value, "left")?, strict)?;
                let rhs = self.expression(field(value, "right")?, strict)?;
                Ok(self.arena.binary(span, op, lhs, rhs))
            }
            "ConditionalExpression" => {
                let test = self.expression(field(value, "test")?, strict)?;
                let pass = self.expression(field(value, "consequent")?, strict)?;
                let fail = self.expression(field(value, "alternate")?, strict)?;
                Ok(self.arena.ternary(span, test, pass, fail))
            }
            "CallExpression" | "NewExpression" => {
                let callee = self.expression(field(value, "callee")?, strict)?;
                let args = array_field(value, "arguments")?
                    .iter()
                    .map(|arg| self.expression(arg, strict))
                    .collect::<Result<Vec<_>, _>>()?;
                if node_type == "NewExpression" {
                    Ok(self.arena.new_call(span, callee, args))
                } else {
                    Ok(self.arena.call(span, callee, args))
                }
            }
            "MemberExpression" => {
                let base = self.expression(field(value, "object")?, strict)?;
                let property = field(value, "property")?;
                if value.get("computed").and_then(Value::as_bool).unwrap_or(false) {
                    let index = self.expression(property, strict)?;
                    Ok(self.arena.index(span, base, index))
                } else {
                    Ok(self.arena.access(span, base, identifier_name(property)?))
                }
            }
            "SequenceExpression" => {
                let mut expressions = array_field(value, "expressions")?.iter();
                let first = expressions.next().ok_or_else(|| invalid(value, "expressions"))?;
                let mut result = self.expression(first, strict)?;
                for next in expressions {
                    let rhs = self.expression(next, strict)?;
                    let span = self.arena.span(result).cover(span_of(next));
                    result = self.arena.binary(span, BinaryOp::Comma, result, rhs);
                }
                Ok(result)
            }
            other => Err(ImportError::UnsupportedNode {
                node_type: other.to_string(),
                line: span.line,
            }),
        }
    }

    fn property(&mut self, property: &Value, strict: bool) -> Result<PropertyData, ImportError> {
        if property.get("computed").and_then(Value::as_bool) == Some(true) {
            return Err(unsupported(property, "computed property keys"));
        }
        let key = field(property, "key")?;
        let key = match node_type(key)? {
            "Identifier" => identifier_name(key)?.to_string(),
            "Literal" => match literal(key)? {
                Literal::String(text) => text,
                Literal::Number(number) => format!("{number}"),
                _ => return Err(invalid(property, "key")),
            },
            _ => return Err(invalid(property, "key")),
        };
        let kind = match property.get("kind").and_then(Value::as_str) {
            Some("get") => PropertyKind::Get,
            Some("set") => PropertyKind::Set,
            _ => PropertyKind::Init,
        };
        let value = self.expression(field(property, "value")?, strict)?;
        Ok(PropertyData { key, value, kind })
    }

    /// Run `f` one nesting level deeper.
    fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ImportError>) -> Result<T, ImportError> {
        if self.depth >= MAX_IMPORT_DEPTH {
            return Err(ImportError::TooDeep {
                limit: MAX_IMPORT_DEPTH,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

// =============================================================================
// JSON access helpers
// =============================================================================

fn node_type(value: &Value) -> Result<&str, ImportError> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ImportError::MissingField {
            node_type: "node".to_string(),
            field: "type",
            line: line_of(value),
        })
}

/// Field that must be present and non-null.
fn field<'v>(value: &'v Value, name: &'static str) -> Result<&'v Value, ImportError> {
    opt_field(value, name).ok_or_else(|| ImportError::MissingField {
        node_type: type_name(value),
        field: name,
        line: line_of(value),
    })
}

fn opt_field<'v>(value: &'v Value, name: &str) -> Option<&'v Value> {
    value.get(name).filter(|field| !field.is_null())
}

fn array_field<'v>(value: &'v Value, name: &'static str) -> Result<&'v [Value], ImportError> {
    field(value, name)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(value, name))
}

fn str_field<'v>(value: &'v Value, name: &'static str) -> Result<&'v str, ImportError> {
    field(value, name)?.as_str().ok_or_else(|| invalid(value, name))
}

fn identifier_name(value: &Value) -> Result<&str, ImportError> {
    match node_type(value)? {
        "Identifier" => str_field(value, "name"),
        other => Err(ImportError::Unsupported {
            detail: format!("{other} where an identifier is expected"),
            line: line_of(value),
        }),
    }
}

fn literal(value: &Value) -> Result<Literal, ImportError> {
    if value.get("regex").is_some() {
        return Err(unsupported(value, "regular expression literals"));
    }
    if value.get("bigint").is_some() {
        return Err(unsupported(value, "BigInt literals"));
    }
    match value.get("value") {
        None | Some(Value::Null) => Ok(Literal::Null),
        Some(Value::Bool(flag)) => Ok(Literal::Boolean(*flag)),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(Literal::Number)
            .ok_or_else(|| invalid(value, "value")),
        Some(Value::String(text)) => Ok(Literal::String(text.clone())),
        Some(_) => Err(invalid(value, "value")),
    }
}

/// A directive prologue containing `"use strict"`.
fn has_use_strict(statements: &[Value]) -> bool {
    statements
        .iter()
        .map_while(|stmt| {
            let expression = stmt.get("expression")?;
            if stmt.get("type")?.as_str()? != "ExpressionStatement" {
                return None;
            }
            match stmt.get("directive").and_then(Value::as_str) {
                Some(directive) => Some(directive.to_string()),
                None => expression.get("value")?.as_str().map(str::to_string),
            }
        })
        .any(|directive| directive == "use strict")
}

fn span_of(value: &Value) -> Span {
    let (start, end) = match (value.get("start"), value.get("end"), value.get("range")) {
        (Some(start), Some(end), _) => (as_u32(start), as_u32(end)),
        (_, _, Some(Value::Array(range))) if range.len() == 2 => (as_u32(&range[0]), as_u32(&range[1])),
        _ => (0, 0),
    };
    Span::new(start, end, line_of(value))
}

fn line_of(value: &Value) -> u32 {
    value
        .pointer("/loc/start/line")
        .map_or(0, as_u32)
}

fn as_u32(value: &Value) -> u32 {
    value
        .as_u64()
        .and_then(|number| u32::try_from(number).ok())
        .unwrap_or(0)
}

fn type_name(value: &Value) -> String {
    value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("node")
        .to_string()
}

fn invalid(value: &Value, field: &'static str) -> ImportError {
    ImportError::InvalidField {
        node_type: type_name(value),
        field,
        line: line_of(value),
    }
}

fn unsupported(value: &Value, detail: &str) -> ImportError {
    ImportError::Unsupported {
        detail: detail.to_string(),
        line: line_of(value),
    }
}
