use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

use log::{debug, trace};
use once_cell::sync::{Lazy, OnceCell};

use crate::{
    ast::{Ast, MlParser, Statement},
    runtime::{RuntimeError, Value},
};

use super::{native, RegistryError};

/// Signature of a natively implemented standard-library routine.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, RuntimeError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub names: Vec<String>,
    pub required: usize,
    pub variadic: bool,
}

impl ParamSpec {
    pub fn fixed(names: &[&str]) -> ParamSpec {
        ParamSpec {
            names: names.iter().map(|name| (*name).to_owned()).collect(),
            required: names.len(),
            variadic: false,
        }
    }

    pub fn with_optional(names: &[&str], required: usize) -> ParamSpec {
        ParamSpec {
            names: names.iter().map(|name| (*name).to_owned()).collect(),
            required,
            variadic: false,
        }
    }

    pub fn variadic(names: &[&str], required: usize) -> ParamSpec {
        ParamSpec {
            names: names.iter().map(|name| (*name).to_owned()).collect(),
            required,
            variadic: true,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required && (self.variadic || count <= self.names.len())
    }

    /// Human-readable arity for diagnostics, e.g. "1..2" or "2+".
    pub fn describe(&self) -> String {
        if self.variadic {
            format!("{}+", self.required)
        } else if self.required == self.names.len() {
            self.required.to_string()
        } else {
            format!("{}..{}", self.required, self.names.len())
        }
    }
}

/// Metadata for one routine exposed to ML: its external name, required
/// capability types, parameter spec, and (for native modules) the
/// implementing function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMetadata {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub params: ParamSpec,
    pub func: Option<BuiltinFn>,
}

impl FunctionMetadata {
    pub fn native(
        name: &str,
        description: &str,
        capabilities: &[&str],
        params: ParamSpec,
        func: BuiltinFn,
    ) -> FunctionMetadata {
        FunctionMetadata {
            name: name.to_owned(),
            description: description.to_owned(),
            capabilities: capabilities.iter().map(|cap| (*cap).to_owned()).collect(),
            params,
            func: Some(func),
        }
    }
}

#[derive(Debug)]
enum ModuleSource {
    /// Statically declared descriptor table, materialized on first use.
    Native(fn() -> Vec<FunctionMetadata>),
    /// Discovered ML file; parsed for its function signatures on first
    /// import.
    Script(PathBuf),
}

/// Catalog entry for a registered module. Discovery registers the entry
/// eagerly but the routine table is built lazily.
#[derive(Debug)]
pub struct ModuleMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    source: ModuleSource,
    entries: OnceCell<Vec<Arc<FunctionMetadata>>>,
}

impl ModuleMetadata {
    pub fn native(
        name: &str,
        version: &str,
        description: &str,
        loader: fn() -> Vec<FunctionMetadata>,
    ) -> ModuleMetadata {
        ModuleMetadata {
            name: name.to_owned(),
            version: version.to_owned(),
            description: description.to_owned(),
            source: ModuleSource::Native(loader),
            entries: OnceCell::new(),
        }
    }

    pub fn script(name: &str, path: PathBuf) -> ModuleMetadata {
        ModuleMetadata {
            name: name.to_owned(),
            version: "0.0.0".to_owned(),
            description: format!("discovered module at {}", path.display()),
            source: ModuleSource::Script(path),
            entries: OnceCell::new(),
        }
    }

    /// Materialize and return the module's routines.
    pub fn functions(&self) -> Result<&[Arc<FunctionMetadata>], RegistryError> {
        let entries = self.entries.get_or_try_init(|| match &self.source {
            ModuleSource::Native(loader) => {
                trace!("materializing native module '{}'", self.name);
                Ok(loader().into_iter().map(Arc::new).collect::<Vec<_>>())
            }
            ModuleSource::Script(path) => {
                trace!(
                    "materializing script module '{}' from {}",
                    self.name,
                    path.display()
                );
                materialize_script(&self.name, path)
            }
        })?;
        Ok(entries)
    }

    pub fn function(&self, name: &str) -> Option<Arc<FunctionMetadata>> {
        self.functions()
            .ok()?
            .iter()
            .find(|function| function.name == name)
            .cloned()
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions()
            .map(|functions| {
                functions
                    .iter()
                    .map(|function| function.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn materialize_script(
    name: &str,
    path: &Path,
) -> Result<Vec<Arc<FunctionMetadata>>, RegistryError> {
    let source = fs::read_to_string(path).map_err(|err| {
        RegistryError::new(format!(
            "could not read module '{name}' from {}: {err}",
            path.display()
        ))
    })?;

    let file = path.to_string_lossy();
    let pairs = MlParser::parse_program(&file, &source)
        .map_err(|err| RegistryError::new(format!("module '{name}' failed to parse: {err}")))?;
    let ast = Ast::from_program(pairs, &file)
        .map_err(|err| RegistryError::new(format!("module '{name}' failed to transform: {err}")))?;

    let mut functions = vec![];
    for statement in ast.nodes() {
        if let Statement::FunctionDef(function) = statement {
            let param_names = function
                .params
                .iter()
                .map(|param| param.value.as_str())
                .collect::<Vec<_>>();
            functions.push(Arc::new(FunctionMetadata {
                name: function.name.value.clone(),
                description: String::new(),
                capabilities: vec![],
                params: ParamSpec::fixed(&param_names),
                func: None,
            }));
        }
    }

    Ok(functions)
}

/// Global catalog of modules callable from ML.
#[derive(Debug)]
pub struct StdlibRegistry {
    modules: RwLock<HashMap<String, Arc<ModuleMetadata>>>,
    frozen: AtomicBool,
}

static GLOBAL: Lazy<StdlibRegistry> = Lazy::new(StdlibRegistry::with_native_modules);

pub fn stdlib_registry() -> &'static StdlibRegistry {
    &GLOBAL
}

impl StdlibRegistry {
    pub fn new() -> StdlibRegistry {
        StdlibRegistry {
            modules: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    fn with_native_modules() -> StdlibRegistry {
        let registry = StdlibRegistry::new();
        for metadata in native::native_modules() {
            registry
                .register(metadata)
                .expect("native module registration cannot fail before freeze");
        }
        registry
    }

    /// Register a module. Only permitted during initialization.
    pub fn register(&self, metadata: ModuleMetadata) -> Result<(), RegistryError> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(RegistryError::new(format!(
                "stdlib registry is frozen; cannot register '{}'",
                metadata.name
            )));
        }

        debug!("registering stdlib module '{}'", metadata.name);
        let mut modules = self.modules.write().expect("registry lock poisoned");
        modules.insert(metadata.name.clone(), Arc::new(metadata));
        Ok(())
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_registered_module(&self, name: &str) -> bool {
        let modules = self.modules.read().expect("registry lock poisoned");
        modules.contains_key(name)
    }

    pub fn lookup_module(&self, name: &str) -> Option<Arc<ModuleMetadata>> {
        let modules = self.modules.read().expect("registry lock poisoned");
        modules.get(name).cloned()
    }

    pub fn module_names(&self) -> Vec<String> {
        let modules = self.modules.read().expect("registry lock poisoned");
        let mut names = modules.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Whether a bare identifier is a member of the implicitly imported
    /// `builtin` module.
    pub fn is_allowed_builtin(&self, name: &str) -> bool {
        self.lookup_module(native::BUILTIN_MODULE)
            .and_then(|module| module.function(name))
            .is_some()
    }

    /// The precomputed bare-identifier whitelist, fed into each
    /// compilation unit's symbol table.
    pub fn builtin_names(&self) -> Vec<String> {
        self.lookup_module(native::BUILTIN_MODULE)
            .map(|module| {
                let mut names = module.function_names();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    /// Capability types required by `module.function`, empty when the
    /// routine is unknown or requires none.
    pub fn required_capabilities(&self, qualified: &str) -> Vec<String> {
        let Some((module_name, function_name)) = qualified.split_once('.') else {
            return vec![];
        };

        self.lookup_module(module_name)
            .and_then(|module| module.function(function_name))
            .map(|function| function.capabilities.clone())
            .unwrap_or_default()
    }

    /// Scan directories for ML files whose leading comment block carries
    /// a `// @module <name>` marker and register them. The files are not
    /// parsed here; their routine tables materialize on first import.
    pub fn discover_modules(&self, dirs: &[PathBuf]) -> Result<Vec<String>, RegistryError> {
        let mut discovered = vec![];

        for dir in dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    return Err(RegistryError::new(format!(
                        "cannot scan '{}': {err}",
                        dir.display()
                    )))
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|ext| ext != "ml").unwrap_or(true) {
                    continue;
                }

                let Ok(source) = fs::read_to_string(&path) else {
                    continue;
                };
                let Some(module_name) = header_module_name(&source) else {
                    continue;
                };

                debug!(
                    "discovered module '{module_name}' at {}",
                    path.display()
                );
                self.register(ModuleMetadata::script(&module_name, path))?;
                discovered.push(module_name);
            }
        }

        discovered.sort();
        Ok(discovered)
    }
}

impl Default for StdlibRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the `@module` marker from a file's leading comment block
/// without parsing the rest of the file.
fn header_module_name(source: &str) -> Option<String> {
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(comment) = trimmed.strip_prefix("//") else {
            break;
        };
        if let Some(rest) = comment.trim().strip_prefix("@module") {
            let name = rest.trim();
            if !name.is_empty() {
                return Some(name.to_owned());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_module_is_registered() {
        let registry = StdlibRegistry::with_native_modules();
        assert!(registry.is_registered_module("builtin"));
        assert!(registry.is_registered_module("math"));
    }

    #[test]
    fn test_is_allowed_builtin() {
        let registry = StdlibRegistry::with_native_modules();
        assert!(registry.is_allowed_builtin("len"));
        assert!(registry.is_allowed_builtin("print"));
        assert!(!registry.is_allowed_builtin("type"));
        assert!(!registry.is_allowed_builtin("eval"));
    }

    #[test]
    fn test_required_capabilities() {
        let registry = StdlibRegistry::with_native_modules();
        assert_eq!(
            registry.required_capabilities("file.read_text"),
            vec!["FileRead"]
        );
        assert!(registry.required_capabilities("math.sqrt").is_empty());
        assert!(registry.required_capabilities("nonsense").is_empty());
    }

    #[test]
    fn test_frozen_registry_rejects_registration() {
        let registry = StdlibRegistry::new();
        registry.freeze();
        let result = registry.register(ModuleMetadata::native("late", "1.0", "", Vec::new));
        assert!(result.is_err());
    }

    #[test]
    fn test_header_module_name() {
        let source = "// helper routines\n// @module strings_extra\n\nfunction pad(s) { return s; }\n";
        assert_eq!(
            header_module_name(source),
            Some("strings_extra".to_owned())
        );

        let without_marker = "function pad(s) { return s; }\n";
        assert_eq!(header_module_name(without_marker), None);
    }

    #[test]
    fn test_marker_after_code_is_ignored() {
        let source = "x = 1;\n// @module sneaky\n";
        assert_eq!(header_module_name(source), None);
    }

    #[test]
    fn test_discovery_registers_lazily() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("extra.ml"),
            "// @module strings_extra\nfunction pad(s, width) { return s; }\n",
        )
        .expect("write module");
        std::fs::write(dir.path().join("plain.ml"), "function f() { return 1; }\n")
            .expect("write unmarked module");

        let registry = StdlibRegistry::new();
        let discovered = registry
            .discover_modules(&[dir.path().to_path_buf()])
            .expect("discovery succeeds");
        assert_eq!(discovered, vec!["strings_extra"]);
        assert!(registry.is_registered_module("strings_extra"));
        assert!(!registry.is_registered_module("plain"));

        // routines materialize on first use
        let module = registry
            .lookup_module("strings_extra")
            .expect("module registered");
        let pad = module.function("pad").expect("function materialized");
        assert_eq!(pad.params.names, vec!["s", "width"]);
        assert!(pad.func.is_none());
    }
}
