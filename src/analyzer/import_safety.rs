//! Import-safety pass: every import must resolve to a registered
//! stdlib module, an allowed host module (mixed mode only), or a user
//! ML file reachable via the configured import paths.
use crate::{
    ast::{Ast, Statement},
    diagnostics::{Category, Diagnostic},
    options::StdlibMode,
    registry::stdlib_registry,
    resolver::find_user_module,
};

use super::{AnalyzerContext, AnalyzerPass};

pub struct ImportSafetyPass;

impl AnalyzerPass for ImportSafetyPass {
    fn name(&self) -> &'static str {
        "import-safety"
    }

    fn run(&mut self, ast: &Ast, ctx: &AnalyzerContext) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        let registry = stdlib_registry();

        for statement in ast.nodes() {
            let Statement::Import(import) = statement else {
                continue;
            };

            if import.segments.len() == 1 && registry.is_registered_module(import.module_name()) {
                continue;
            }

            if ctx.options.stdlib_mode == StdlibMode::Mixed
                && ctx.options.allow_host_modules.contains(&import.dotted())
            {
                continue;
            }

            if find_user_module(&import.segments, &ctx.search_dirs()).is_some() {
                continue;
            }

            let mut diagnostic = Diagnostic::error(
                Category::Import,
                "IMP001",
                format!("import '{}' does not resolve", import.dotted()),
                &import.position,
            )
            .with_hint(format!(
                "registered stdlib modules: {}",
                registry.module_names().join(", ")
            ));
            if ctx.search_dirs().is_empty() {
                diagnostic = diagnostic
                    .with_hint("no import paths are configured for user modules".to_owned());
            }
            diagnostics.push(diagnostic);
        }

        diagnostics
    }
}
