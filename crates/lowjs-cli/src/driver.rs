//! Read, import, lower and render one program.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Read;
use tracing::{debug, info_span};

use crate::args::{CliArgs, OutputFormat};
use lowjs_ast::estree::import_program;
use lowjs_ast::printer::{PrintOptions, Printer};
use lowjs_ast::{NodeArena, NodeIndex};
use lowjs_lowering::lower_program;

/// JSON rendering of a lowered program.
#[derive(Serialize)]
struct LoweredProgram<'a> {
    source_name: &'a str,
    root: NodeIndex,
    arena: &'a NodeArena,
}

/// Run the whole pipeline and write the result where `args` says.
pub fn run(args: &CliArgs) -> Result<()> {
    let output = lower_input(args)?;
    match &args.out {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{output}");
            Ok(())
        }
    }
}

/// Lower the input named by `args` and render it in the requested format.
pub fn lower_input(args: &CliArgs) -> Result<String> {
    let source = read_input(args)?;
    let options = args.lowering_options();
    let _span = info_span!("lower_input", source = %options.source_name).entered();

    let (mut arena, root) = import_program(&source, &args.import_options())
        .with_context(|| format!("failed to import {}", options.source_name))?;
    debug!("imported {} nodes", arena.len());

    let lowered = lower_program(&mut arena, root, &options)
        .with_context(|| format!("failed to lower {}", options.source_name))?;
    debug!("lowered tree holds {} nodes", arena.len());

    render(&arena, lowered, &options.source_name, args)
}

fn read_input(args: &CliArgs) -> Result<String> {
    if args.reads_stdin() {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read standard input")?;
        return Ok(source);
    }
    std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))
}

fn render(arena: &NodeArena, root: NodeIndex, source_name: &str, args: &CliArgs) -> Result<String> {
    match args.format {
        OutputFormat::Text => Ok(Printer::print_to_string(
            arena,
            root,
            PrintOptions {
                annotate: args.annotate,
                ..PrintOptions::default()
            },
        )),
        OutputFormat::Json => {
            let program = LoweredProgram {
                source_name,
                root,
                arena,
            };
            let mut json = serde_json::to_string_pretty(&program).context("failed to serialize lowered program")?;
            json.push('\n');
            Ok(json)
        }
    }
}
