//! Options recognized by the public `transpile` entry point.
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// How the generated output is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitMode {
    /// One output file per user module, mtime-cached, with package-init
    /// files along the directory path.
    #[default]
    MultiFile,
    /// Everything inlined into a single portable output file.
    SingleFile,
    /// In-memory only; nothing touches the filesystem.
    Silent,
}

/// Which standard library the compilation unit sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdlibMode {
    /// Only the native ML stdlib. The strict default.
    #[default]
    Native,
    /// Native stdlib plus the host modules named in
    /// [`TranspileOptions::allow_host_modules`].
    Mixed,
}

/// Cooperative cancellation flag checked at pass boundaries and in the
/// generator's top-level statement loop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// Directories searched for user ML modules.
    pub import_paths: Vec<PathBuf>,
    /// Whether the source file's own directory is an implicit import
    /// path.
    pub allow_current_dir: bool,
    pub emit_mode: EmitMode,
    pub stdlib_mode: StdlibMode,
    /// Host modules additionally importable in [`StdlibMode::Mixed`].
    pub allow_host_modules: Vec<String>,
    /// Treat warnings as errors.
    pub strict: bool,
    /// Emit a positional source map alongside the output.
    pub source_maps: bool,
    /// Name of the source file, used in diagnostics and source maps.
    pub source_name: String,
    /// Output directory for the file-writing emit modes.
    pub output_dir: Option<PathBuf>,
    pub cancel: CancelFlag,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        TranspileOptions {
            import_paths: vec![],
            allow_current_dir: true,
            emit_mode: EmitMode::default(),
            stdlib_mode: StdlibMode::default(),
            allow_host_modules: vec![],
            strict: false,
            source_maps: false,
            source_name: "<input>".to_owned(),
            output_dir: None,
            cancel: CancelFlag::new(),
        }
    }
}

impl TranspileOptions {
    /// Options for a quick in-memory compilation of a source string.
    pub fn silent() -> TranspileOptions {
        TranspileOptions {
            emit_mode: EmitMode::Silent,
            ..TranspileOptions::default()
        }
    }
}
