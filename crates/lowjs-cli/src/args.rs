use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use lowjs_ast::estree::ImportOptions;
use lowjs_common::limits::MAX_LOWERING_DEPTH;
use lowjs_lowering::LoweringOptions;

/// CLI arguments for the lowjs binary.
#[derive(Parser, Debug)]
#[command(
    name = "lowjs",
    version,
    about = "Lower an ESTree JSON program into explicit control flow"
)]
pub struct CliArgs {
    /// ESTree JSON file to lower, or `-` to read standard input.
    pub input: PathBuf,

    /// Name used in synthetic eval locations (defaults to the input file name).
    #[arg(long = "source-name")]
    pub source_name: Option<String>,

    /// Treat the whole script as strict code.
    #[arg(long)]
    pub strict: bool,

    /// Leave nested functions unlowered, as if compiled on first call.
    #[arg(long)]
    pub lazy: bool,

    /// Annotate jump labels, terminal blocks, escaping loops and eval sites.
    #[arg(long)]
    pub annotate: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, ignore_case = true)]
    pub format: OutputFormat,

    /// Nesting limit for the lowering traversal.
    #[arg(long = "max-depth", default_value_t = MAX_LOWERING_DEPTH)]
    pub max_depth: u32,

    /// Write the result to this file instead of standard output.
    #[arg(short = 'o', long = "out")]
    pub out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// JavaScript-like source text.
    Text,
    /// The lowered arena and root index as JSON.
    Json,
}

impl CliArgs {
    #[must_use]
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }

    #[must_use]
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            strict: self.strict,
            lazy_functions: self.lazy,
        }
    }

    #[must_use]
    pub fn lowering_options(&self) -> LoweringOptions {
        let source_name = match &self.source_name {
            Some(name) => name.clone(),
            None if self.reads_stdin() => LoweringOptions::default().source_name,
            None => self
                .input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.input.display().to_string()),
        };
        LoweringOptions {
            source_name,
            max_depth: self.max_depth,
        }
    }
}
