//! Node model for the script AST.
//!
//! Nodes live in a [`NodeArena`](crate::NodeArena) and refer to each other by
//! [`NodeIndex`]. A node is a `Span`, a set of [`NodeFlags`] and one
//! [`NodeData`] variant. Node identity is index identity: the lowering pass
//! tracks "this very throw" or "this very loop" by comparing indices.

use bitflags::bitflags;
use lowjs_common::Span;
use serde::Serialize;

/// Index of a node in a [`NodeArena`](crate::NodeArena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    /// Index for an arena position, `None` at or past
    /// [`MAX_ARENA_NODES`](lowjs_common::limits::MAX_ARENA_NODES).
    #[must_use]
    pub fn from_position(position: usize) -> Option<NodeIndex> {
        if position >= lowjs_common::limits::MAX_ARENA_NODES {
            return None;
        }
        u32::try_from(position).ok().map(NodeIndex)
    }
}

/// Internal jump label of a breakable node.
///
/// This is the code generator's branch target for `break`/`continue`, not
/// the source-level label name. Two breakable nodes must never share one
/// inside a function, which is why copied subtrees get fresh labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JumpLabel(pub u32);

impl std::fmt::Display for JumpLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

bitflags! {
    /// Per-node flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct NodeFlags: u16 {
        /// Block: control never falls off the end.
        const TERMINAL = 1 << 0;
        /// Loop: a break/continue in the body targets the loop or an outer node.
        const CONTROL_FLOW_ESCAPES = 1 << 1;
        /// Ident/Access/Index: used as the callee of a call.
        const IS_FUNCTION = 1 << 2;
        /// Ident: compiler-synthesized symbol (`:return`, catch-all bindings).
        const INTERNAL = 1 << 3;
        /// Throw: rethrow of a synthesized catch-all clause.
        const SYNTHETIC_RETHROW = 1 << 4;
        /// Var: declares a function (`function f() {}`).
        const IS_FUNCTION_DECLARATION = 1 << 5;
        /// Var: the last hoisted function declaration of its function body.
        const IS_LAST_FUNCTION_DECLARATION = 1 << 6;
    }
}

bitflags! {
    /// Flags describing a function node.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct FunctionFlags: u8 {
        /// The top-level script.
        const IS_PROGRAM = 1 << 0;
        const IS_STRICT = 1 << 1;
        /// The body declares at least one function.
        const HAS_DECLARED_FUNCTIONS = 1 << 2;
        /// Compiled on first invocation; skipped by eager passes.
        const IS_LAZY = 1 << 3;
    }
}

bitflags! {
    /// Compilation phases a function has gone through. Monotonic.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct CompilationStates: u8 {
        const INITIALIZED = 1 << 0;
        const PARSED = 1 << 1;
        const LOWERED = 1 << 2;
    }
}

/// A node in the arena.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub span: Span,
    pub flags: NodeFlags,
    pub data: NodeData,
}

impl Node {
    #[inline]
    #[must_use]
    pub const fn has_flag(&self, flag: NodeFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Short name of the node kind, used in diagnostics and logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.data.kind_name()
    }
}

// =============================================================================
// Node payloads
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum NodeData {
    // Statements
    Block(BlockData),
    ExpressionStatement(ExpressionStatementData),
    Var(VarData),
    If(IfData),
    For(ForData),
    While(WhileData),
    Try(TryData),
    Catch(CatchData),
    Throw(ThrowData),
    Return(ReturnData),
    Break(JumpData),
    Continue(JumpData),
    Labelled(LabelledData),
    Switch(SwitchData),
    Case(CaseData),
    With(WithData),
    Empty,

    // Expressions
    Ident(IdentData),
    Literal(Literal),
    Unary(UnaryData),
    Binary(BinaryData),
    Ternary(TernaryData),
    Call(CallData),
    Access(AccessData),
    Index(IndexData),
    Array(ArrayData),
    Object(ObjectData),
    Function(FunctionData),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockData {
    pub statements: Vec<NodeIndex>,
    pub label: JumpLabel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpressionStatementData {
    pub expression: NodeIndex,
}

/// One declared variable. Function declarations are vars whose initializer
/// is a `Function` node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VarData {
    /// `Ident` node naming the variable.
    pub name: NodeIndex,
    pub init: Option<NodeIndex>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IfData {
    pub test: NodeIndex,
    /// Block.
    pub pass: NodeIndex,
    /// Block.
    pub fail: Option<NodeIndex>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ForKind {
    /// `for (init; test; modify)`
    For,
    /// `for (init in modify)`: `init` is the assignment target, `modify`
    /// the iterated object.
    ForIn,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForData {
    pub kind: ForKind,
    pub init: Option<NodeIndex>,
    pub test: Option<NodeIndex>,
    pub modify: Option<NodeIndex>,
    /// Block.
    pub body: NodeIndex,
    pub label: JumpLabel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WhileData {
    pub test: Option<NodeIndex>,
    /// Block.
    pub body: NodeIndex,
    pub is_do_while: bool,
    pub label: JumpLabel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TryData {
    /// Block.
    pub body: NodeIndex,
    /// Blocks, each holding exactly one `Catch` statement.
    pub catch_blocks: Vec<NodeIndex>,
    /// Block.
    pub finally_body: Option<NodeIndex>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatchData {
    /// `Ident` node binding the thrown value.
    pub exception: NodeIndex,
    /// Guard of a conditional catch clause (`catch (e if cond)`).
    pub condition: Option<NodeIndex>,
    /// Block.
    pub body: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThrowData {
    pub expression: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReturnData {
    pub expression: Option<NodeIndex>,
}

/// Payload of `break` and `continue`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JumpData {
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelledData {
    pub name: String,
    /// Block.
    pub body: NodeIndex,
    pub label: JumpLabel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwitchData {
    pub discriminant: NodeIndex,
    /// `Case` nodes; the default clause is the case without a test.
    pub cases: Vec<NodeIndex>,
    pub label: JumpLabel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaseData {
    pub test: Option<NodeIndex>,
    /// Block.
    pub body: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WithData {
    pub object: NodeIndex,
    /// Block.
    pub body: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentData {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Delete,
    Void,
    Typeof,
    Not,
    Neg,
    Plus,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Void => "void",
            Self::Typeof => "typeof",
            Self::Not => "!",
            Self::Neg => "-",
            Self::Plus => "+",
            Self::BitNot => "~",
            Self::PreIncrement | Self::PostIncrement => "++",
            Self::PreDecrement | Self::PostDecrement => "--",
        }
    }

    #[must_use]
    pub const fn is_postfix(self) -> bool {
        matches!(self, Self::PostIncrement | Self::PostDecrement)
    }

    /// Keyword operators need a space before their operand.
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(self, Self::Delete | Self::Void | Self::Typeof)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Assign,
    AssignAdd,
    AssignSub,
    AssignMul,
    AssignDiv,
    AssignMod,
    AssignShl,
    AssignShr,
    AssignUShr,
    AssignBitAnd,
    AssignBitOr,
    AssignBitXor,
    Comma,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    InstanceOf,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    const TABLE: [(BinaryOp, &'static str); 36] = [
        (Self::Assign, "="),
        (Self::AssignAdd, "+="),
        (Self::AssignSub, "-="),
        (Self::AssignMul, "*="),
        (Self::AssignDiv, "/="),
        (Self::AssignMod, "%="),
        (Self::AssignShl, "<<="),
        (Self::AssignShr, ">>="),
        (Self::AssignUShr, ">>>="),
        (Self::AssignBitAnd, "&="),
        (Self::AssignBitOr, "|="),
        (Self::AssignBitXor, "^="),
        (Self::Comma, ","),
        (Self::Or, "||"),
        (Self::And, "&&"),
        (Self::BitOr, "|"),
        (Self::BitXor, "^"),
        (Self::BitAnd, "&"),
        (Self::Eq, "=="),
        (Self::NotEq, "!="),
        (Self::StrictEq, "==="),
        (Self::StrictNotEq, "!=="),
        (Self::Lt, "<"),
        (Self::Le, "<="),
        (Self::Gt, ">"),
        (Self::Ge, ">="),
        (Self::In, "in"),
        (Self::InstanceOf, "instanceof"),
        (Self::Shl, "<<"),
        (Self::Shr, ">>"),
        (Self::UShr, ">>>"),
        (Self::Add, "+"),
        (Self::Sub, "-"),
        (Self::Mul, "*"),
        (Self::Div, "/"),
        (Self::Mod, "%"),
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(op, _)| *op == self)
            .map_or("?", |(_, text)| text)
    }

    /// Operator for its source text, e.g. `"+="`.
    #[must_use]
    pub fn from_token(text: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(_, token)| *token == text)
            .map(|(op, _)| *op)
    }

    #[must_use]
    pub const fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::AssignAdd
                | Self::AssignSub
                | Self::AssignMul
                | Self::AssignDiv
                | Self::AssignMod
                | Self::AssignShl
                | Self::AssignShr
                | Self::AssignUShr
                | Self::AssignBitAnd
                | Self::AssignBitOr
                | Self::AssignBitXor
        )
    }

    /// Binding power, higher binds tighter. Assignments are right-associative.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Comma => 1,
            _ if self.is_assignment() => 2,
            Self::Or => 4,
            Self::And => 5,
            Self::BitOr => 6,
            Self::BitXor => 7,
            Self::BitAnd => 8,
            Self::Eq | Self::NotEq | Self::StrictEq | Self::StrictNotEq => 9,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::In | Self::InstanceOf => 10,
            Self::Shl | Self::Shr | Self::UShr => 11,
            Self::Add | Self::Sub => 12,
            Self::Mul | Self::Div | Self::Mod => 13,
            _ => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnaryData {
    pub op: UnaryOp,
    pub operand: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinaryData {
    pub op: BinaryOp,
    pub lhs: NodeIndex,
    pub rhs: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TernaryData {
    pub test: NodeIndex,
    pub pass: NodeIndex,
    pub fail: NodeIndex,
}

/// Extra information attached to a call that may be a direct `eval`.
///
/// Code generation emits "if the callee is the built-in eval, evaluate
/// `code` in the caller's scope; otherwise call normally".
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvalArgs {
    /// Independent copy of the first argument.
    pub code: NodeIndex,
    /// The caller's `this` binding.
    pub this: NodeIndex,
    /// Synthetic location, e.g. `script.js#17<eval>`.
    pub location: String,
    pub strict: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallData {
    pub callee: NodeIndex,
    pub args: Vec<NodeIndex>,
    pub is_new: bool,
    pub eval_args: Option<EvalArgs>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccessData {
    pub base: NodeIndex,
    pub property: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexData {
    pub base: NodeIndex,
    pub index: NodeIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrayData {
    /// `None` is an elision (`[a, , b]`).
    pub elements: Vec<Option<NodeIndex>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyData {
    pub key: String,
    pub value: NodeIndex,
    pub kind: PropertyKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectData {
    pub properties: Vec<PropertyData>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionData {
    pub name: Option<String>,
    /// `Ident` nodes.
    pub params: Vec<NodeIndex>,
    /// Block.
    pub body: NodeIndex,
    pub flags: FunctionFlags,
    pub state: CompilationStates,
}

impl FunctionData {
    #[inline]
    #[must_use]
    pub const fn is_program(&self) -> bool {
        self.flags.contains(FunctionFlags::IS_PROGRAM)
    }

    #[inline]
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.flags.contains(FunctionFlags::IS_STRICT)
    }

    #[inline]
    #[must_use]
    pub const fn is_lazy(&self) -> bool {
        self.flags.contains(FunctionFlags::IS_LAZY)
    }

    /// Name for logs; anonymous functions print as `<anonymous>`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

// =============================================================================
// Kind queries and structural child mapping
// =============================================================================

impl NodeData {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Block(_) => "Block",
            Self::ExpressionStatement(_) => "ExpressionStatement",
            Self::Var(_) => "Var",
            Self::If(_) => "If",
            Self::For(_) => "For",
            Self::While(_) => "While",
            Self::Try(_) => "Try",
            Self::Catch(_) => "Catch",
            Self::Throw(_) => "Throw",
            Self::Return(_) => "Return",
            Self::Break(_) => "Break",
            Self::Continue(_) => "Continue",
            Self::Labelled(_) => "Labelled",
            Self::Switch(_) => "Switch",
            Self::Case(_) => "Case",
            Self::With(_) => "With",
            Self::Empty => "Empty",
            Self::Ident(_) => "Ident",
            Self::Literal(_) => "Literal",
            Self::Unary(_) => "Unary",
            Self::Binary(_) => "Binary",
            Self::Ternary(_) => "Ternary",
            Self::Call(_) => "Call",
            Self::Access(_) => "Access",
            Self::Index(_) => "Index",
            Self::Array(_) => "Array",
            Self::Object(_) => "Object",
            Self::Function(_) => "Function",
        }
    }

    #[must_use]
    pub const fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::Block(_)
                | Self::ExpressionStatement(_)
                | Self::Var(_)
                | Self::If(_)
                | Self::For(_)
                | Self::While(_)
                | Self::Try(_)
                | Self::Catch(_)
                | Self::Throw(_)
                | Self::Return(_)
                | Self::Break(_)
                | Self::Continue(_)
                | Self::Labelled(_)
                | Self::Switch(_)
                | Self::With(_)
                | Self::Empty
        )
    }

    #[must_use]
    pub const fn is_loop(&self) -> bool {
        matches!(self, Self::For(_) | Self::While(_))
    }

    /// Jump label of a breakable node.
    #[must_use]
    pub const fn jump_label(&self) -> Option<JumpLabel> {
        match self {
            Self::Block(d) => Some(d.label),
            Self::For(d) => Some(d.label),
            Self::While(d) => Some(d.label),
            Self::Labelled(d) => Some(d.label),
            Self::Switch(d) => Some(d.label),
            _ => None,
        }
    }

    pub fn set_jump_label(&mut self, label: JumpLabel) {
        match self {
            Self::Block(d) => d.label = label,
            Self::For(d) => d.label = label,
            Self::While(d) => d.label = label,
            Self::Labelled(d) => d.label = label,
            Self::Switch(d) => d.label = label,
            _ => {}
        }
    }

    /// Body block of a loop.
    #[must_use]
    pub const fn loop_body(&self) -> Option<NodeIndex> {
        match self {
            Self::For(d) => Some(d.body),
            Self::While(d) => Some(d.body),
            _ => None,
        }
    }

    /// Child indices in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        // Mapping with the identity never fails; it only records children.
        let _ = self.clone().try_map_children(|child| {
            out.push(child);
            Ok::<_, std::convert::Infallible>(child)
        });
        out
    }

    /// Rebuild this payload with every child index passed through `f`, in
    /// evaluation order.
    ///
    /// This is the single place that knows the shape of every node kind;
    /// generic walks (duplication, finally splicing, escape analysis) go
    /// through it instead of matching all kinds themselves.
    pub fn try_map_children<E>(
        self,
        mut f: impl FnMut(NodeIndex) -> Result<NodeIndex, E>,
    ) -> Result<NodeData, E> {
        Ok(match self {
            Self::Block(d) => Self::Block(BlockData {
                statements: d.statements.into_iter().map(&mut f).collect::<Result<_, _>>()?,
                label: d.label,
            }),
            Self::ExpressionStatement(d) => Self::ExpressionStatement(ExpressionStatementData {
                expression: f(d.expression)?,
            }),
            Self::Var(d) => {
                let name = f(d.name)?;
                let init = map_opt(d.init, &mut f)?;
                Self::Var(VarData { name, init })
            }
            Self::If(d) => {
                let test = f(d.test)?;
                let pass = f(d.pass)?;
                let fail = map_opt(d.fail, &mut f)?;
                Self::If(IfData { test, pass, fail })
            }
            Self::For(d) => {
                let init = map_opt(d.init, &mut f)?;
                let test = map_opt(d.test, &mut f)?;
                let modify = map_opt(d.modify, &mut f)?;
                let body = f(d.body)?;
                Self::For(ForData {
                    kind: d.kind,
                    init,
                    test,
                    modify,
                    body,
                    label: d.label,
                })
            }
            Self::While(d) => {
                let (test, body) = if d.is_do_while {
                    let body = f(d.body)?;
                    (map_opt(d.test, &mut f)?, body)
                } else {
                    let test = map_opt(d.test, &mut f)?;
                    (test, f(d.body)?)
                };
                Self::While(WhileData {
                    test,
                    body,
                    is_do_while: d.is_do_while,
                    label: d.label,
                })
            }
            Self::Try(d) => {
                let body = f(d.body)?;
                let catch_blocks = d
                    .catch_blocks
                    .into_iter()
                    .map(&mut f)
                    .collect::<Result<_, _>>()?;
                let finally_body = map_opt(d.finally_body, &mut f)?;
                Self::Try(TryData {
                    body,
                    catch_blocks,
                    finally_body,
                })
            }
            Self::Catch(d) => {
                let exception = f(d.exception)?;
                let condition = map_opt(d.condition, &mut f)?;
                let body = f(d.body)?;
                Self::Catch(CatchData {
                    exception,
                    condition,
                    body,
                })
            }
            Self::Throw(d) => Self::Throw(ThrowData {
                expression: f(d.expression)?,
            }),
            Self::Return(d) => Self::Return(ReturnData {
                expression: map_opt(d.expression, &mut f)?,
            }),
            Self::Break(d) => Self::Break(d),
            Self::Continue(d) => Self::Continue(d),
            Self::Labelled(d) => Self::Labelled(LabelledData {
                body: f(d.body)?,
                name: d.name,
                label: d.label,
            }),
            Self::Switch(d) => {
                let discriminant = f(d.discriminant)?;
                let cases = d.cases.into_iter().map(&mut f).collect::<Result<_, _>>()?;
                Self::Switch(SwitchData {
                    discriminant,
                    cases,
                    label: d.label,
                })
            }
            Self::Case(d) => {
                let test = map_opt(d.test, &mut f)?;
                let body = f(d.body)?;
                Self::Case(CaseData { test, body })
            }
            Self::With(d) => {
                let object = f(d.object)?;
                let body = f(d.body)?;
                Self::With(WithData { object, body })
            }
            Self::Empty => Self::Empty,
            Self::Ident(d) => Self::Ident(d),
            Self::Literal(d) => Self::Literal(d),
            Self::Unary(d) => Self::Unary(UnaryData {
                op: d.op,
                operand: f(d.operand)?,
            }),
            Self::Binary(d) => {
                let lhs = f(d.lhs)?;
                let rhs = f(d.rhs)?;
                Self::Binary(BinaryData { op: d.op, lhs, rhs })
            }
            Self::Ternary(d) => {
                let test = f(d.test)?;
                let pass = f(d.pass)?;
                let fail = f(d.fail)?;
                Self::Ternary(TernaryData { test, pass, fail })
            }
            Self::Call(d) => {
                let callee = f(d.callee)?;
                let args = d.args.into_iter().map(&mut f).collect::<Result<_, _>>()?;
                let eval_args = match d.eval_args {
                    Some(eval) => Some(EvalArgs {
                        code: f(eval.code)?,
                        this: f(eval.this)?,
                        location: eval.location,
                        strict: eval.strict,
                    }),
                    None => None,
                };
                Self::Call(CallData {
                    callee,
                    args,
                    is_new: d.is_new,
                    eval_args,
                })
            }
            Self::Access(d) => Self::Access(AccessData {
                base: f(d.base)?,
                property: d.property,
            }),
            Self::Index(d) => {
                let base = f(d.base)?;
                let index = f(d.index)?;
                Self::Index(IndexData { base, index })
            }
            Self::Array(d) => Self::Array(ArrayData {
                elements: d
                    .elements
                    .into_iter()
                    .map(|element| map_opt(element, &mut f))
                    .collect::<Result<_, _>>()?,
            }),
            Self::Object(d) => Self::Object(ObjectData {
                properties: d
                    .properties
                    .into_iter()
                    .map(|property| {
                        Ok(PropertyData {
                            value: f(property.value)?,
                            key: property.key,
                            kind: property.kind,
                        })
                    })
                    .collect::<Result<_, _>>()?,
            }),
            Self::Function(d) => {
                let params = d.params.into_iter().map(&mut f).collect::<Result<_, _>>()?;
                let body = f(d.body)?;
                Self::Function(FunctionData {
                    name: d.name,
                    params,
                    body,
                    flags: d.flags,
                    state: d.state,
                })
            }
        })
    }
}

fn map_opt<E>(
    child: Option<NodeIndex>,
    f: &mut impl FnMut(NodeIndex) -> Result<NodeIndex, E>,
) -> Result<Option<NodeIndex>, E> {
    child.map(f).transpose()
}
