//! Dangerous-call pass: calls whose callee is on the absolute blacklist
//! of host evaluators and compilers.
//!
//! `getattr`/`hasattr`/`setattr` are deliberately absent: they are ML
//! builtins whose implementations enforce the underscore rule at
//! runtime.
use crate::{
    ast::{Ast, Expression},
    diagnostics::{Category, Diagnostic},
};

use super::{
    visit::{walk_ast, Visitor},
    AnalyzerContext, AnalyzerPass,
};

const BLACKLISTED_CALLS: &[&str] = &["eval", "exec", "compile", "__import__", "execfile"];

pub struct DangerousCallPass;

impl AnalyzerPass for DangerousCallPass {
    fn name(&self) -> &'static str {
        "dangerous-calls"
    }

    fn run(&mut self, ast: &Ast, _ctx: &AnalyzerContext) -> Vec<Diagnostic> {
        let mut visitor = DangerousCallVisitor {
            diagnostics: vec![],
        };
        walk_ast(&mut visitor, ast);
        visitor.diagnostics
    }
}

struct DangerousCallVisitor {
    diagnostics: Vec<Diagnostic>,
}

impl Visitor for DangerousCallVisitor {
    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Call(call) => {
                if let Expression::Ident(ident) = call.callee.as_ref() {
                    if BLACKLISTED_CALLS.contains(&ident.value.as_str()) {
                        self.diagnostics.push(
                            Diagnostic::error(
                                Category::Security,
                                "SEC010",
                                format!("call to blacklisted function '{}'", ident.value),
                                &ident.position,
                            )
                            .with_remediation("dynamic code execution is not available in ML"),
                        );
                    }
                }
            }
            Expression::MethodCall(method_call)
                if BLACKLISTED_CALLS.contains(&method_call.method.as_str()) =>
            {
                self.diagnostics.push(Diagnostic::error(
                    Category::Security,
                    "SEC011",
                    format!("call to blacklisted method '{}'", method_call.method),
                    &method_call.position,
                ));
            }
            _ => {}
        }
    }
}
