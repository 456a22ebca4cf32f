//! # mlc
//!
//! This binary is the transpiler for ML. It combines parser, security
//! analyzer, and code generator into a single application.
mod cli;

use cli::*;

use std::{error::Error, fs};

use log::{error, info, warn};
use ml_lang::{
    diagnostics::Severity, transpile, EmitMode, EngineError, TranspileOptions,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    match args.command {
        Commands::Build(build) => run_build(build),
        Commands::Check(check) => run_check(check),
    }
}

fn run_build(args: BuildArgs) -> Result<(), Box<dyn Error>> {
    let file = fs::canonicalize(&args.file)?;
    let source = fs::read_to_string(&file)?;

    if args.dump_ast {
        match ml_lang::parse(&source, &file.to_string_lossy()) {
            Ok(ast) => info!("Parsed AST:\n{ast:#?}"),
            Err(err) => {
                error!("{err}");
                std::process::exit(err.exit_code());
            }
        }
    }

    let options = TranspileOptions {
        import_paths: args.import_paths.clone(),
        emit_mode: args.emit.into(),
        strict: args.strict,
        source_maps: args.source_maps,
        source_name: file.to_string_lossy().to_string(),
        output_dir: args.output.clone(),
        ..TranspileOptions::default()
    };

    match transpile(&source, &options) {
        Ok(result) => {
            report_diagnostics(&result.diagnostics);
            if options.emit_mode == EmitMode::Silent {
                println!("{}", result.output_source);
            }
            Ok(())
        }
        Err(err) => exit_with(err),
    }
}

fn run_check(args: CheckArgs) -> Result<(), Box<dyn Error>> {
    let file = fs::canonicalize(&args.file)?;
    let source = fs::read_to_string(&file)?;

    let ast = match ml_lang::parse(&source, &file.to_string_lossy()) {
        Ok(ast) => ast,
        Err(err) => return exit_with(err),
    };

    let diagnostics = ml_lang::analyze(&ast);
    report_diagnostics(&diagnostics);

    let failing = diagnostics.iter().any(|diagnostic| {
        diagnostic.is_error() || (args.strict && diagnostic.severity == Severity::Warning)
    });
    if failing {
        std::process::exit(ml_lang::diagnostics::Category::Security.exit_code());
    }

    info!("no blocking findings");
    Ok(())
}

fn report_diagnostics(diagnostics: &[ml_lang::diagnostics::Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Error => error!("{diagnostic}"),
            Severity::Warning => warn!("{diagnostic}"),
            Severity::Info => info!("{diagnostic}"),
        }
    }
}

fn exit_with(err: EngineError) -> Result<(), Box<dyn Error>> {
    if let EngineError::Security(diagnostics) = &err {
        report_diagnostics(diagnostics);
    }
    error!("{err}");
    std::process::exit(err.exit_code());
}
