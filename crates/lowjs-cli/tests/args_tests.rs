use clap::Parser;
use std::path::PathBuf;

use crate::args::{CliArgs, OutputFormat};
use crate::tracing_config::LogFormat;
use lowjs_common::limits::MAX_LOWERING_DEPTH;

#[test]
fn test_defaults() {
    let args = CliArgs::try_parse_from(["lowjs", "program.json"]).expect("valid arguments");

    assert_eq!(args.input, PathBuf::from("program.json"));
    assert_eq!(args.format, OutputFormat::Text);
    assert_eq!(args.max_depth, MAX_LOWERING_DEPTH);
    assert!(!args.strict && !args.lazy && !args.annotate);
    assert!(args.out.is_none());
}

#[test]
fn test_source_name_defaults_to_file_name() {
    let args = CliArgs::try_parse_from(["lowjs", "scripts/page.json"]).expect("valid arguments");

    assert_eq!(args.lowering_options().source_name, "page.json");
}

#[test]
fn test_explicit_source_name_wins() {
    let args = CliArgs::try_parse_from(["lowjs", "page.json", "--source-name", "page.js"])
        .expect("valid arguments");

    assert_eq!(args.lowering_options().source_name, "page.js");
}

#[test]
fn test_stdin_uses_default_source_name() {
    let args = CliArgs::try_parse_from(["lowjs", "-"]).expect("valid arguments");

    assert!(args.reads_stdin());
    assert_eq!(args.lowering_options().source_name, "<script>");
}

#[test]
fn test_flags_map_onto_options() {
    let args = CliArgs::try_parse_from([
        "lowjs",
        "page.json",
        "--strict",
        "--lazy",
        "--max-depth",
        "64",
        "--format",
        "JSON",
    ])
    .expect("valid arguments");

    let import = args.import_options();
    assert!(import.strict);
    assert!(import.lazy_functions);
    assert_eq!(args.lowering_options().max_depth, 64);
    assert_eq!(args.format, OutputFormat::Json);
}

#[test]
fn test_missing_input_is_rejected() {
    assert!(CliArgs::try_parse_from(["lowjs"]).is_err());
}

#[test]
fn test_log_format_parsing() {
    assert_eq!(LogFormat::parse("tree"), LogFormat::Tree);
    assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
    assert_eq!(LogFormat::parse(""), LogFormat::Text);
    assert_eq!(LogFormat::parse("verbose"), LogFormat::Text);
}
