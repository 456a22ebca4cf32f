//! Engine-level error type returned by the public entry points. Each
//! variant maps onto one failure kind of the compilation pipeline and
//! onto a distinct process exit code in the `mlc` binary.
use std::{error::Error, fmt::Display, io};

use crate::{
    ast::{SyntaxError, TransformError},
    codegen::CodegenError,
    diagnostics::{Category, Diagnostic},
    resolver::ImportResolveError,
};

#[derive(Debug)]
pub enum EngineError {
    Syntax(SyntaxError),
    Transform(TransformError),
    /// The analyzer reported error-severity findings (or warnings in
    /// strict mode). All collected diagnostics ride along.
    Security(Vec<Diagnostic>),
    Codegen(CodegenError),
    Import(ImportResolveError),
    Io { context: String, source: io::Error },
    Cancelled,
}

impl EngineError {
    pub fn category(&self) -> Category {
        match self {
            EngineError::Syntax(_) => Category::Syntax,
            EngineError::Transform(_) => Category::Transform,
            EngineError::Security(_) => Category::Security,
            EngineError::Codegen(err) => err.diagnostic.category,
            EngineError::Import(_) => Category::Import,
            EngineError::Io { .. } => Category::Transform,
            EngineError::Cancelled => Category::Cancelled,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Syntax(err) => write!(f, "{err}"),
            EngineError::Transform(err) => write!(f, "{err}"),
            EngineError::Security(diagnostics) => {
                let errors = diagnostics
                    .iter()
                    .filter(|diagnostic| diagnostic.is_error())
                    .count();
                write!(f, "compilation aborted with {errors} security finding(s)")
            }
            EngineError::Codegen(err) => write!(f, "{err}"),
            EngineError::Import(err) => write!(f, "{err}"),
            EngineError::Io { context, source } => write!(f, "{context}: {source}"),
            EngineError::Cancelled => f.write_str("compilation cancelled"),
        }
    }
}

impl Error for EngineError {}

impl From<SyntaxError> for EngineError {
    fn from(err: SyntaxError) -> Self {
        EngineError::Syntax(err)
    }
}

impl From<TransformError> for EngineError {
    fn from(err: TransformError) -> Self {
        EngineError::Transform(err)
    }
}

impl From<CodegenError> for EngineError {
    fn from(err: CodegenError) -> Self {
        if err.diagnostic.category == Category::Cancelled {
            EngineError::Cancelled
        } else {
            EngineError::Codegen(err)
        }
    }
}

impl From<ImportResolveError> for EngineError {
    fn from(err: ImportResolveError) -> Self {
        EngineError::Import(err)
    }
}
