//! Source spans.
//!
//! Every AST node carries a `Span`: a half-open byte range into the script
//! source plus the 1-based line the node starts on. Line information is kept
//! on the span itself because later phases (and the `eval` location tags
//! produced by lowering) need it without access to the source text.

use serde::Serialize;

/// A source range `[start, end)` with the line of `start`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    /// 1-based line number, `0` when unknown.
    pub line: u32,
}

impl Span {
    /// Span used for nodes that have no source counterpart.
    pub const SYNTHETIC: Span = Span {
        start: 0,
        end: 0,
        line: 0,
    };

    #[must_use]
    pub const fn new(start: u32, end: u32, line: u32) -> Self {
        Self { start, end, line }
    }

    /// A zero-width span at the start of `self`, keeping its line.
    #[must_use]
    pub const fn at_start(self) -> Self {
        Self {
            start: self.start,
            end: self.start,
            line: self.line,
        }
    }

    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// The line is taken from whichever span starts first.
    #[must_use]
    pub const fn cover(self, other: Span) -> Self {
        let (start, line) = if other.start < self.start {
            (other.start, other.line)
        } else {
            (self.start, self.line)
        };
        let end = if other.end > self.end {
            other.end
        } else {
            self.end
        };
        Self { start, end, line }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "{}..{}", self.start, self.end)
        } else {
            write!(f, "line {} ({}..{})", self.line, self.start, self.end)
        }
    }
}
