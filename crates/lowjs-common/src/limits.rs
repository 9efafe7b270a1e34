//! Centralized limits and thresholds for the lowjs compiler.
//!
//! Every recursive tree walk in the workspace is bounded by one of these
//! constants. Hitting a limit is reported as an error by the walker that
//! owns it; no walker silently truncates a tree.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth for the lowering pass.
///
/// Each nested statement or expression adds a handful of frames to the
/// native call stack of the pass; 500 levels stays well inside the 8 MB
/// default main-thread stack even in debug builds.
///
/// # JavaScript example
///
/// ```javascript
/// // Deeply nested blocks / expressions:
/// if (a) { if (b) { if (c) { /* ... 500 levels ... */ } } }
/// f(f(f(f(f(f(f(f(f(/* ... */)))))))));
/// ```
pub const MAX_LOWERING_DEPTH: u32 = 500;

/// Maximum nesting depth accepted when importing an ESTree JSON document.
///
/// ESTree documents come from external tools; the importer refuses
/// pathological inputs instead of overflowing the stack. Kept above
/// [`MAX_LOWERING_DEPTH`] so that anything the pass can lower can also be
/// imported.
pub const MAX_IMPORT_DEPTH: u32 = 1_000;

/// Maximum nesting depth for the printer.
///
/// Deeper subtrees are elided as `/* ... */` rather than printed.
pub const MAX_PRINT_DEPTH: u32 = 1_000;

// =============================================================================
// Storage Limits
// =============================================================================

/// Maximum number of nodes a single node arena can hold.
///
/// Node indices are `u32` and `u32::MAX` is reserved for the "no node"
/// sentinel, so positions `0..MAX_ARENA_NODES` are addressable. Allocating
/// past the cap panics instead of wrapping onto an existing index.
pub const MAX_ARENA_NODES: usize = u32::MAX as usize;
