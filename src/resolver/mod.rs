//! Module resolution: mapping `import a.b.c;` onto a registered stdlib
//! module, an allowed host module, or a user ML file, with cycle
//! detection across the recursive load.
mod cache;

pub use self::cache::*;

use std::{
    collections::{HashMap, HashSet},
    error::Error,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, trace};

use crate::{
    ast::{Ast, Import, MlParser, Position, Statement},
    options::{StdlibMode, TranspileOptions},
    registry::{stdlib_registry, ModuleMetadata},
};

#[derive(Debug, Clone)]
pub struct ImportResolveError {
    pub message: String,
    pub position: Position,
    pub cycle: bool,
}

impl ImportResolveError {
    fn new(message: impl Into<String>, position: &Position) -> Self {
        Self {
            message: message.into(),
            position: position.clone(),
            cycle: false,
        }
    }
}

impl Display for ImportResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (file, line, col) = &self.position;
        f.write_str(&format!(
            "{} ({}:{}:{})",
            self.message, file, line, col
        ))
    }
}

impl Error for ImportResolveError {}

/// Where an import statement leads.
#[derive(Debug, Clone)]
pub enum ResolvedImport {
    Stdlib(Arc<ModuleMetadata>),
    /// A host module explicitly allowed in mixed stdlib mode.
    Host(String),
    User { name: String, path: PathBuf },
}

/// Search the candidate directories for `a/b/c.ml`.
pub fn find_user_module(segments: &[String], search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in segments {
        relative.push(segment);
    }
    relative.set_extension("ml");

    for dir in search_dirs {
        let candidate = dir.join(&relative);
        if candidate.is_file() {
            trace!("import candidate hit: {}", candidate.display());
            return fs::canonicalize(&candidate).ok().or(Some(candidate));
        }
    }

    None
}

/// Resolve a single import against the three allowed targets.
pub fn resolve_import(
    import: &Import,
    options: &TranspileOptions,
    source_dir: Option<&Path>,
) -> Result<ResolvedImport, ImportResolveError> {
    let registry = stdlib_registry();

    if import.segments.len() == 1 {
        if let Some(metadata) = registry.lookup_module(import.module_name()) {
            return Ok(ResolvedImport::Stdlib(metadata));
        }
    }

    if options.stdlib_mode == StdlibMode::Mixed
        && options.allow_host_modules.contains(&import.dotted())
    {
        return Ok(ResolvedImport::Host(import.dotted()));
    }

    let mut search_dirs = options.import_paths.clone();
    if options.allow_current_dir {
        if let Some(source_dir) = source_dir {
            search_dirs.push(source_dir.to_path_buf());
        }
    }

    if let Some(path) = find_user_module(&import.segments, &search_dirs) {
        return Ok(ResolvedImport::User {
            name: import.module_name().to_owned(),
            path,
        });
    }

    Err(ImportResolveError::new(
        format!(
            "import '{}' does not resolve to a registered module or a user module file",
            import.dotted()
        ),
        &import.position,
    ))
}

/// A user ML module loaded for compilation.
#[derive(Debug, Clone)]
pub struct UserModule {
    pub name: String,
    /// Dotted import path under which the module was first reached.
    pub dotted: String,
    pub path: PathBuf,
    pub ast: Ast,
}

/// Loaded user modules keyed by their canonical path.
pub type UserModules = HashMap<String, UserModule>;

/// Recursively load every user module reachable from the given AST.
/// Circular imports are detected via the in-progress visiting set and
/// reported as errors; diamond imports collapse onto the map.
pub fn load_user_modules(
    ast: &Ast,
    options: &TranspileOptions,
    source_dir: Option<&Path>,
) -> Result<UserModules, ImportResolveError> {
    let mut modules = UserModules::default();
    let mut visiting = HashSet::new();
    collect_user_modules(ast, options, source_dir, &mut modules, &mut visiting)?;
    Ok(modules)
}

fn collect_user_modules(
    ast: &Ast,
    options: &TranspileOptions,
    source_dir: Option<&Path>,
    modules: &mut UserModules,
    visiting: &mut HashSet<String>,
) -> Result<(), ImportResolveError> {
    for statement in ast.nodes() {
        let Statement::Import(import) = statement else {
            continue;
        };

        let ResolvedImport::User { name, path } = resolve_import(import, options, source_dir)?
        else {
            continue;
        };

        let key = path.to_string_lossy().to_string();
        if visiting.contains(&key) {
            return Err(ImportResolveError {
                message: format!(
                    "circular import of '{}' via '{}'",
                    name,
                    import.dotted()
                ),
                position: import.position.clone(),
                cycle: true,
            });
        }
        if modules.contains_key(&key) {
            continue;
        }

        debug!("loading user module '{name}' from {}", path.display());

        let source = fs::read_to_string(&path).map_err(|err| {
            ImportResolveError::new(
                format!("could not read module '{name}': {err}"),
                &import.position,
            )
        })?;

        let file = path.to_string_lossy();
        let pairs = MlParser::parse_program(&file, &source).map_err(|err| {
            ImportResolveError::new(
                format!("module '{name}' failed to parse: {err}"),
                &import.position,
            )
        })?;
        let module_ast = Ast::from_program(pairs, &file).map_err(|err| {
            ImportResolveError::new(
                format!("module '{name}' failed to transform: {err}"),
                &import.position,
            )
        })?;

        visiting.insert(key.clone());
        let module_dir = path.parent().map(Path::to_path_buf);
        collect_user_modules(
            &module_ast,
            options,
            module_dir.as_deref(),
            modules,
            visiting,
        )?;
        visiting.remove(&key);

        modules.insert(
            key,
            UserModule {
                name,
                dotted: import.dotted(),
                path,
                ast: module_ast,
            },
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_module(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create module dir");
        }
        let mut file = fs::File::create(&path).expect("create module file");
        file.write_all(content.as_bytes()).expect("write module");
        path
    }

    fn parse(source: &str, file: &str) -> Ast {
        let pairs = MlParser::parse_program(file, source).expect("parse failed");
        Ast::from_program(pairs, file).expect("transform failed")
    }

    #[test]
    fn test_stdlib_import_resolves() {
        let ast = parse("import math;", "main.ml");
        let Statement::Import(import) = &ast.nodes()[0] else {
            panic!("expected import");
        };

        let options = TranspileOptions::default();
        let resolved = resolve_import(import, &options, None).expect("resolves");
        assert!(matches!(resolved, ResolvedImport::Stdlib(_)));
    }

    #[test]
    fn test_user_module_resolves_from_import_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_module(dir.path(), "utils/text.ml", "function pad(s) { return s; }\n");

        let ast = parse("import utils.text;", "main.ml");
        let Statement::Import(import) = &ast.nodes()[0] else {
            panic!("expected import");
        };

        let options = TranspileOptions {
            import_paths: vec![dir.path().to_path_buf()],
            ..TranspileOptions::default()
        };
        let resolved = resolve_import(import, &options, None).expect("resolves");
        let ResolvedImport::User { name, .. } = resolved else {
            panic!("expected user module");
        };
        assert_eq!(name, "text");
    }

    #[test]
    fn test_unresolvable_import_errors() {
        let ast = parse("import nowhere;", "main.ml");
        let Statement::Import(import) = &ast.nodes()[0] else {
            panic!("expected import");
        };

        let options = TranspileOptions::default();
        let err = resolve_import(import, &options, None).expect_err("must fail");
        assert!(!err.cycle);
    }

    #[test]
    fn test_circular_import_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_module(dir.path(), "a.ml", "import b;\n");
        write_module(dir.path(), "b.ml", "import a;\n");

        let ast = parse("import a;", "main.ml");
        let options = TranspileOptions {
            import_paths: vec![dir.path().to_path_buf()],
            ..TranspileOptions::default()
        };

        let err = load_user_modules(&ast, &options, None).expect_err("cycle must fail");
        assert!(err.cycle, "expected cycle error, got: {err}");
    }

    #[test]
    fn test_diamond_import_loads_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_module(dir.path(), "shared.ml", "function f() { return 1; }\n");
        write_module(dir.path(), "left.ml", "import shared;\n");
        write_module(dir.path(), "right.ml", "import shared;\n");

        let ast = parse("import left; import right;", "main.ml");
        let options = TranspileOptions {
            import_paths: vec![dir.path().to_path_buf()],
            ..TranspileOptions::default()
        };

        let modules = load_user_modules(&ast, &options, None).expect("loads");
        assert_eq!(modules.len(), 3);
    }
}
