//! Output assembly for the three emit modes.
//!
//! Single-file (and silent) output lifts every user-module function to
//! file scope under a unique prefixed name, then constructs namespace
//! objects carrying the exposed names. Multi-file output mirrors the
//! source layout on disk with package-init files and an mtime cache.
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    ast::Ast,
    error::EngineError,
    options::TranspileOptions,
    resolver::{ModuleCache, UserModule, UserModules},
    runtime::{RUNTIME_FILE_NAME, RUNTIME_MODULE_NAME, RUNTIME_SOURCE},
};

use super::{CodeGenerator, GeneratedUnit, LiftedModule};

fn runtime_prelude() -> String {
    format!(
        "import {RUNTIME_MODULE_NAME}\nfrom {RUNTIME_MODULE_NAME} import builtin, safe_call, \
         safe_attr_access, safe_attr_assign, safe_method_call, MLUserException\n\n"
    )
}

fn io_error(context: impl Into<String>) -> impl FnOnce(io::Error) -> EngineError {
    let context = context.into();
    move |source| EngineError::Io { context, source }
}

fn sorted_modules(modules: &UserModules) -> Vec<&UserModule> {
    let mut sorted = modules.values().collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.dotted.cmp(&b.dotted));
    sorted
}

/// Build the whole program as one in-memory output: lifted module
/// functions, stdlib import bindings, namespace objects, then the main
/// body.
pub fn generate_inline(
    main_ast: &Ast,
    modules: &UserModules,
    options: &TranspileOptions,
    source_dir: Option<&Path>,
) -> Result<GeneratedUnit, EngineError> {
    let mut lifted = vec![];
    for module in sorted_modules(modules) {
        let generator =
            CodeGenerator::new(options, module.path.parent().map(Path::to_path_buf));
        lifted.push(generator.generate_lifted(module)?);
    }

    let main_unit = CodeGenerator::new(options, source_dir.map(Path::to_path_buf))
        .without_prelude()
        .generate(main_ast)?;

    let uses_runtime = main_unit.uses_runtime
        || !lifted.is_empty()
        || lifted.iter().any(|module| module.uses_runtime);

    let mut source = String::new();
    if uses_runtime {
        source.push_str(&runtime_prelude());
    }

    for module in &lifted {
        source.push_str(&module.defs_source);
    }

    let mut bindings = vec![];
    for module in &lifted {
        for binding in &module.import_bindings {
            if !bindings.contains(binding) {
                bindings.push(binding.clone());
            }
        }
    }
    for binding in &bindings {
        source.push_str(binding);
        source.push('\n');
    }
    if !bindings.is_empty() {
        source.push('\n');
    }

    for module in &lifted {
        source.push_str(&namespace_line(module));
        source.push('\n');
    }
    if !lifted.is_empty() {
        source.push('\n');
    }

    let offset = source.matches('\n').count();
    source.push_str(&main_unit.source);

    let mut diagnostics = vec![];
    for module in lifted {
        diagnostics.extend(module.diagnostics);
    }
    diagnostics.extend(main_unit.diagnostics);

    let source_map = main_unit.source_map.map(|mut map| {
        map.shift(offset);
        map
    });

    Ok(GeneratedUnit {
        source,
        source_map,
        diagnostics,
        uses_runtime,
    })
}

fn namespace_line(module: &LiftedModule) -> String {
    let members = module
        .namespace_members
        .iter()
        .map(|(public, lifted)| format!("{}: {lifted}", super::py_str(public)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{name} = {RUNTIME_MODULE_NAME}.make_user_module({dotted}, {{{members}}})",
        name = module.name,
        dotted = super::py_str(&module.dotted)
    )
}

/// Single-file mode: the inline output plus the runtime library written
/// next to it.
pub fn emit_single_file(
    main_ast: &Ast,
    modules: &UserModules,
    options: &TranspileOptions,
    source_dir: Option<&Path>,
) -> Result<GeneratedUnit, EngineError> {
    let unit = generate_inline(main_ast, modules, options, source_dir)?;

    let output_dir = output_dir(options);
    fs::create_dir_all(&output_dir)
        .map_err(io_error(format!("cannot create '{}'", output_dir.display())))?;
    write_runtime_library(&output_dir)?;

    let main_path = output_dir.join(format!("{}.py", main_stem(options)));
    info!("writing single-file output to {}", main_path.display());
    fs::write(&main_path, &unit.source)
        .map_err(io_error(format!("cannot write '{}'", main_path.display())))?;
    write_source_map(&main_path, &unit)?;

    Ok(unit)
}

/// Multi-file mode: one output file per user module mirroring the
/// source layout, package-init files along each path, an mtime cache,
/// and the main program at the top of the output directory.
pub fn emit_multi_file(
    main_ast: &Ast,
    modules: &UserModules,
    options: &TranspileOptions,
    source_dir: Option<&Path>,
) -> Result<GeneratedUnit, EngineError> {
    let output_dir = output_dir(options);
    fs::create_dir_all(&output_dir)
        .map_err(io_error(format!("cannot create '{}'", output_dir.display())))?;
    write_runtime_library(&output_dir)?;

    let mut cache = ModuleCache::load(&output_dir);
    let mut diagnostics = vec![];

    for module in sorted_modules(modules) {
        let segments = module.dotted.split('.').collect::<Vec<_>>();

        // package-init files so host-module resolution works along the
        // directory path
        let mut package_dir = output_dir.clone();
        for segment in &segments[..segments.len() - 1] {
            package_dir = package_dir.join(segment);
            fs::create_dir_all(&package_dir)
                .map_err(io_error(format!("cannot create '{}'", package_dir.display())))?;
            let init = package_dir.join("__init__.py");
            if !init.exists() {
                fs::write(&init, "")
                    .map_err(io_error(format!("cannot write '{}'", init.display())))?;
            }
        }

        let out_path = package_dir.join(format!(
            "{}.py",
            segments.last().copied().unwrap_or_default()
        ));

        if cache.already_compiled(&module.path) || cache.is_fresh(&module.path, &out_path) {
            debug!(
                "cache hit for {}, skipping re-emission",
                module.path.display()
            );
            continue;
        }

        let module_options = TranspileOptions {
            source_name: module.path.to_string_lossy().to_string(),
            ..options.clone()
        };
        let unit = CodeGenerator::new(&module_options, module.path.parent().map(Path::to_path_buf))
            .as_user_module()
            .generate(&module.ast)?;

        info!("writing module '{}' to {}", module.name, out_path.display());
        fs::write(&out_path, &unit.source)
            .map_err(io_error(format!("cannot write '{}'", out_path.display())))?;
        write_source_map(&out_path, &unit)?;
        diagnostics.extend(unit.diagnostics);

        cache.mark_compiled(&module.path, &out_path);
    }

    let main_unit =
        CodeGenerator::new(options, source_dir.map(Path::to_path_buf)).generate(main_ast)?;
    let main_path = output_dir.join(format!("{}.py", main_stem(options)));
    info!("writing main program to {}", main_path.display());
    fs::write(&main_path, &main_unit.source)
        .map_err(io_error(format!("cannot write '{}'", main_path.display())))?;
    write_source_map(&main_path, &main_unit)?;

    cache
        .save()
        .map_err(io_error("cannot save module cache manifest"))?;

    diagnostics.extend(main_unit.diagnostics.clone());
    Ok(GeneratedUnit {
        diagnostics,
        ..main_unit
    })
}

fn output_dir(options: &TranspileOptions) -> PathBuf {
    options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."))
}

fn main_stem(options: &TranspileOptions) -> String {
    Path::new(&options.source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty() && stem != "<input>")
        .unwrap_or_else(|| "main".to_owned())
}

fn write_runtime_library(output_dir: &Path) -> Result<(), EngineError> {
    let path = output_dir.join(RUNTIME_FILE_NAME);
    fs::write(&path, RUNTIME_SOURCE)
        .map_err(io_error(format!("cannot write '{}'", path.display())))
}

fn write_source_map(out_path: &Path, unit: &GeneratedUnit) -> Result<(), EngineError> {
    let Some(source_map) = &unit.source_map else {
        return Ok(());
    };
    let map_path = PathBuf::from(format!("{}.map", out_path.display()));
    fs::write(&map_path, source_map.to_json())
        .map_err(io_error(format!("cannot write '{}'", map_path.display())))
}
