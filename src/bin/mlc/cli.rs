//! # Cli
//!
//! CLI argument parsing for the mlc transpiler.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ml_lang::EmitMode;

/// Struct containing the CLI configuration for mlc.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Specify the log level of the transpiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of mlc.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings (like advisory analyzer findings).
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the transpiler,
    /// e.g., which files are emitted.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the transpiler.
    #[value(alias("3"))]
    Debug,

    /// Log extra information, including per-node tracing.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transpile an ML program to Python.
    Build(BuildArgs),

    /// Parse and analyze an ML program without emitting output.
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// The path to the ML source file.
    #[arg(index = 1)]
    pub file: PathBuf,

    /// The output directory for the emitted program.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How to lay out the emitted output.
    #[arg(value_enum, long, default_value_t = EmitModeArg::MultiFile)]
    pub emit: EmitModeArg,

    /// Additional directories searched for user ML modules.
    #[arg(long = "import-path")]
    pub import_paths: Vec<PathBuf>,

    /// Treat analyzer warnings as errors.
    #[arg(long)]
    pub strict: bool,

    /// Emit a positional source map next to the output.
    #[arg(long)]
    pub source_maps: bool,

    /// Whether to dump the parsed AST (for debugging).
    #[arg(long)]
    pub dump_ast: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// The path to the ML source file.
    #[arg(index = 1)]
    pub file: PathBuf,

    /// Treat analyzer warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum EmitModeArg {
    /// One file per module with an mtime cache.
    #[default]
    MultiFile,
    /// Everything inlined into one portable file.
    SingleFile,
    /// In-memory only; print the output to stdout.
    Silent,
}

impl From<EmitModeArg> for EmitMode {
    fn from(value: EmitModeArg) -> Self {
        match value {
            EmitModeArg::MultiFile => EmitMode::MultiFile,
            EmitModeArg::SingleFile => EmitMode::SingleFile,
            EmitModeArg::Silent => EmitMode::Silent,
        }
    }
}
