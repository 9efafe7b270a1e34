//! Unique-name allocation and compiler constants.

use rustc_hash::FxHashMap;

/// Per-function unique-name allocator.
///
/// Each base name gets its own counter, so `unique_name(":catch_all")`
/// yields `:catch_all$1`, `:catch_all$2`, ... independently of other bases.
#[derive(Clone, Debug, Default)]
pub struct Namespace {
    counters: FxHashMap<String, u32>,
}

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique_name(&mut self, base: &str) -> String {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        *counter += 1;
        format!("{base}${counter}")
    }
}

/// Names the compiler reserves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompilerConstant {
    /// Result placeholder of a function; the completion value of a program.
    Return,
    This,
    Eval,
    /// Base name for the bindings of synthesized catch-all clauses.
    CatchAll,
}

impl CompilerConstant {
    #[must_use]
    pub const fn symbol_name(self) -> &'static str {
        match self {
            Self::Return => ":return",
            Self::This => "this",
            Self::Eval => "eval",
            Self::CatchAll => ":catch_all",
        }
    }

    /// Synthesized names start with `:` and can never collide with a source
    /// identifier.
    #[must_use]
    pub fn is_internal_name(name: &str) -> bool {
        name.starts_with(':')
    }
}
