//! Static security analyzer.
//!
//! Runs after AST construction and before code generation. The pass
//! order is fixed (patterns, dangerous calls, capability declarations,
//! import safety) because later passes may rely on earlier findings.
//! The analyzer itself is advisory: it reports everything it finds in
//! one invocation, and the driver aborts before code generation when
//! any error-severity issue is present.
mod capability_decl;
mod dangerous_calls;
mod import_safety;
mod patterns;
pub mod visit;

use std::path::PathBuf;

use log::debug;

use crate::{
    ast::Ast,
    diagnostics::{Category, Diagnostic},
    options::TranspileOptions,
};

use self::{
    capability_decl::CapabilityDeclPass, dangerous_calls::DangerousCallPass,
    import_safety::ImportSafetyPass, patterns::PatternPass,
};

/// Compilation-unit facts the passes need beyond the AST itself.
pub struct AnalyzerContext<'a> {
    pub options: &'a TranspileOptions,
    /// Directory of the unit being analyzed, used as an implicit import
    /// path when the options allow it.
    pub source_dir: Option<PathBuf>,
}

impl AnalyzerContext<'_> {
    /// Directories searched for user modules, in priority order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.options.import_paths.clone();
        if self.options.allow_current_dir {
            if let Some(source_dir) = &self.source_dir {
                dirs.push(source_dir.clone());
            }
        }
        dirs
    }
}

trait AnalyzerPass {
    fn name(&self) -> &'static str;
    fn run(&mut self, ast: &Ast, ctx: &AnalyzerContext) -> Vec<Diagnostic>;
}

pub struct SecurityAnalyzer<'a> {
    ctx: AnalyzerContext<'a>,
}

impl<'a> SecurityAnalyzer<'a> {
    pub fn new(options: &'a TranspileOptions, source_dir: Option<PathBuf>) -> Self {
        Self {
            ctx: AnalyzerContext {
                options,
                source_dir,
            },
        }
    }

    /// Run every pass and collect all findings, so one invocation
    /// surfaces as many problems as possible.
    pub fn analyze(&self, ast: &Ast) -> Vec<Diagnostic> {
        let mut passes: Vec<Box<dyn AnalyzerPass>> = vec![
            Box::new(PatternPass),
            Box::new(DangerousCallPass),
            Box::new(CapabilityDeclPass),
            Box::new(ImportSafetyPass),
        ];

        let mut diagnostics = vec![];
        for pass in passes.iter_mut() {
            if self.ctx.options.cancel.is_cancelled() {
                diagnostics.push(cancelled_diagnostic());
                return diagnostics;
            }

            let found = pass.run(ast, &self.ctx);
            debug!(
                "analyzer pass '{name}' produced {count} findings",
                name = pass.name(),
                count = found.len()
            );
            diagnostics.extend(found);
        }

        diagnostics
    }
}

fn cancelled_diagnostic() -> Diagnostic {
    Diagnostic::error(
        Category::Cancelled,
        "CAN001",
        "compilation cancelled",
        &("<cancelled>".to_owned(), 0, 0),
    )
}

#[cfg(test)]
mod tests {
    use crate::ast::MlParser;

    use super::*;

    fn analyze(source: &str) -> Vec<Diagnostic> {
        let pairs = MlParser::parse_program("test.ml", source).expect("parse failed");
        let ast = Ast::from_program(pairs, "test.ml").expect("transform failed");
        let options = TranspileOptions::default();
        SecurityAnalyzer::new(&options, None).analyze(&ast)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .map(|diagnostic| diagnostic.code.as_str())
            .collect()
    }

    #[test]
    fn test_clean_program_has_no_findings() {
        let diagnostics = analyze("x = len([1, 2, 3]); print(x);");
        assert!(diagnostics.is_empty(), "got {diagnostics:?}");
    }

    #[test]
    fn test_dunder_member_flagged() {
        let diagnostics = analyze("y = obj.__class__;");
        assert!(codes(&diagnostics).contains(&"SEC002"));
    }

    #[test]
    fn test_blacklisted_attribute_flagged() {
        let diagnostics = analyze("y = obj.mro;");
        assert!(codes(&diagnostics).contains(&"SEC004"));
    }

    #[test]
    fn test_eval_call_flagged() {
        let diagnostics = analyze("y = eval(\"1 + 1\");");
        assert!(codes(&diagnostics).contains(&"SEC010"));
    }

    #[test]
    fn test_literal_dunder_concat_is_warning_only() {
        let diagnostics = analyze("n = \"__\" + \"class__\"; r = getattr(obj, n);");
        let concat = diagnostics
            .iter()
            .find(|diagnostic| diagnostic.code == "SEC003")
            .expect("concat warning expected");
        assert!(!concat.is_error());
        // compilation is not blocked by the warning
        assert!(diagnostics.iter().all(|diagnostic| !diagnostic.is_error()));
    }

    #[test]
    fn test_empty_capability_block_rejected() {
        let diagnostics = analyze("capability Nothing { }");
        let found = codes(&diagnostics);
        assert!(found.contains(&"CAP001"));
        assert!(found.contains(&"CAP002"));
    }

    #[test]
    fn test_malformed_glob_rejected() {
        let diagnostics =
            analyze("capability Broken { resource \"data[0\"; allow read; }");
        assert!(codes(&diagnostics).contains(&"CAP003"));
    }

    #[test]
    fn test_stdlib_import_allowed() {
        let diagnostics = analyze("import math; y = math.sqrt(4);");
        assert!(diagnostics.is_empty(), "got {diagnostics:?}");
    }

    #[test]
    fn test_unresolved_import_rejected() {
        let diagnostics = analyze("import nowhere;");
        assert!(codes(&diagnostics).contains(&"IMP001"));
    }

    #[test]
    fn test_cancellation_short_circuits() {
        let pairs = MlParser::parse_program("test.ml", "x = 1;").expect("parse failed");
        let ast = Ast::from_program(pairs, "test.ml").expect("transform failed");

        let options = TranspileOptions::default();
        options.cancel.cancel();
        let diagnostics = SecurityAnalyzer::new(&options, None).analyze(&ast);
        assert_eq!(codes(&diagnostics), vec!["CAN001"]);
    }
}
