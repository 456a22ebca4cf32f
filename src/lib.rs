//! Core compilation and security-enforcement engine for ML, a small
//! capability-safe scripting language transpiled to Python.
//!
//! The pipeline: source text -> pest parse tree -> typed AST -> static
//! security analyzer -> whitelist-enforcing code generator -> Python
//! source (plus optional source map). Every call, attribute access, and
//! import in the output resolves either to a user-defined ML symbol, a
//! registered standard-library routine, or a compile-time error.
pub mod analyzer;
pub mod ast;
pub mod capabilities;
pub mod codegen;
pub mod diagnostics;
mod error;
pub mod options;
pub mod registry;
pub mod resolver;
pub mod runtime;

pub use self::error::EngineError;
pub use self::options::{CancelFlag, EmitMode, StdlibMode, TranspileOptions};

use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    analyzer::SecurityAnalyzer,
    ast::{Ast, MlParser},
    codegen::{emit_multi_file, emit_single_file, generate_inline, SourceMap},
    diagnostics::{has_fatal, Diagnostic},
    registry::{
        safe_attribute_registry, stdlib_registry, AttributeEntry, ModuleMetadata, RegistryError,
    },
    resolver::load_user_modules,
};

/// Result of a successful transpilation.
#[derive(Debug, Clone)]
pub struct Transpilation {
    pub output_source: String,
    pub source_map: Option<SourceMap>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse ML source into its AST. Exposed for tooling.
pub fn parse(source: &str, file: &str) -> Result<Ast, EngineError> {
    let pairs = MlParser::parse_program(file, source)?;
    Ok(Ast::from_program(pairs, file)?)
}

/// Run the static security analyzer as a standalone pass.
pub fn analyze(ast: &Ast) -> Vec<Diagnostic> {
    let options = TranspileOptions::default();
    SecurityAnalyzer::new(&options, None).analyze(ast)
}

/// Top-level entry point: compile one ML source unit according to the
/// options, including its user-module imports.
pub fn transpile(source: &str, options: &TranspileOptions) -> Result<Transpilation, EngineError> {
    if options.cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    debug!("transpiling '{}'", options.source_name);
    let ast = parse(source, &options.source_name)?;

    let source_dir = Path::new(&options.source_name)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf);

    let analyzer_diagnostics = SecurityAnalyzer::new(options, source_dir.clone()).analyze(&ast);
    if options.cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    if has_fatal(&analyzer_diagnostics, options.strict) {
        return Err(EngineError::Security(analyzer_diagnostics));
    }

    let modules = load_user_modules(&ast, options, source_dir.as_deref())?;

    let unit = match options.emit_mode {
        EmitMode::Silent => generate_inline(&ast, &modules, options, source_dir.as_deref())?,
        EmitMode::SingleFile => emit_single_file(&ast, &modules, options, source_dir.as_deref())?,
        EmitMode::MultiFile => emit_multi_file(&ast, &modules, options, source_dir.as_deref())?,
    };

    let mut diagnostics = analyzer_diagnostics;
    diagnostics.extend(unit.diagnostics);

    Ok(Transpilation {
        output_source: unit.source,
        source_map: unit.source_map,
        diagnostics,
    })
}

/// Register an additional stdlib module. Initialization-only: fails
/// after the registries are frozen.
pub fn register_stdlib_module(metadata: ModuleMetadata) -> Result<(), RegistryError> {
    stdlib_registry().register(metadata)
}

/// Register safe attributes for a host type. Initialization-only.
pub fn register_safe_attributes(
    type_key: &str,
    entries: Vec<AttributeEntry>,
) -> Result<(), RegistryError> {
    safe_attribute_registry().register(type_key, entries)
}

/// Scan directories for `// @module` markers and register the modules
/// found. Initialization-only.
pub fn discover_stdlib_modules(dirs: &[PathBuf]) -> Result<Vec<String>, RegistryError> {
    stdlib_registry().discover_modules(dirs)
}

/// Freeze both registries. After this, ML code may run; registration
/// attempts fail.
pub fn freeze_registries() {
    stdlib_registry().freeze();
    safe_attribute_registry().freeze();
}
