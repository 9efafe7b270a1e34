//! Command-line driver for the lowjs lowering pass.

pub mod args;
pub mod driver;
pub mod tracing_config;

#[cfg(test)]
#[path = "../tests/args_tests.rs"]
mod args_tests;
