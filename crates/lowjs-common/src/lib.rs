//! Common types and utilities for the lowjs script compiler.
//!
//! This crate provides foundational types used across all lowjs crates:
//! - Source spans (`Span`) carrying byte offsets and a line number
//! - Compiler limits and thresholds

// Span - Source location tracking (byte offsets + line)
pub mod span;
pub use span::Span;

// Centralized limits and thresholds
pub mod limits;

#[cfg(test)]
#[path = "../tests/span_tests.rs"]
mod span_tests;
