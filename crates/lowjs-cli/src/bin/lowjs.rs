#![allow(clippy::print_stderr)]

use clap::Parser;
use colored::Colorize;

use lowjs_cli::args::CliArgs;
use lowjs_cli::{driver, tracing_config};

fn main() {
    // Zero cost unless LOWJS_LOG or RUST_LOG is set.
    tracing_config::init_tracing();

    let args = CliArgs::parse();
    if let Err(err) = driver::run(&args) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
