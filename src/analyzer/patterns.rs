//! Pattern-detection pass: known unsafe idioms that are visible in the
//! tree itself.
use crate::{
    ast::{AssignTarget, Ast, BinaryOp, Expression, Statement},
    diagnostics::{Category, Diagnostic},
    registry::DANGEROUS_NAMES,
};

use super::{
    visit::{walk_ast, Visitor},
    AnalyzerContext, AnalyzerPass,
};

pub struct PatternPass;

impl AnalyzerPass for PatternPass {
    fn name(&self) -> &'static str {
        "patterns"
    }

    fn run(&mut self, ast: &Ast, _ctx: &AnalyzerContext) -> Vec<Diagnostic> {
        let mut visitor = PatternVisitor {
            diagnostics: vec![],
        };
        walk_ast(&mut visitor, ast);
        visitor.diagnostics
    }
}

struct PatternVisitor {
    diagnostics: Vec<Diagnostic>,
}

impl PatternVisitor {
    fn check_attribute_name(&mut self, name: &str, position: &crate::ast::Position) {
        if name.starts_with('_') {
            self.diagnostics.push(
                Diagnostic::error(
                    Category::Security,
                    "SEC002",
                    format!("attribute '{name}' starts with an underscore"),
                    position,
                )
                .with_remediation("underscore names are never reachable from ML"),
            );
        } else if DANGEROUS_NAMES.contains(&name) {
            self.diagnostics.push(Diagnostic::error(
                Category::Security,
                "SEC004",
                format!("attribute '{name}' is on the dangerous-pattern blacklist"),
                position,
            ));
        }
    }
}

impl Visitor for PatternVisitor {
    fn visit_statement(&mut self, statement: &Statement) {
        if let Statement::Assignment(assignment) = statement {
            if let AssignTarget::Member(member) = &assignment.target {
                self.check_attribute_name(&member.property, &member.position);
            }
        }
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Ident(ident) if ident.value.starts_with("__") => {
                self.diagnostics.push(Diagnostic::error(
                    Category::Security,
                    "SEC001",
                    format!("identifier '{}' uses a reserved dunder name", ident.value),
                    &ident.position,
                ));
            }
            Expression::Member(member) => {
                self.check_attribute_name(&member.property, &member.position);
            }
            Expression::MethodCall(method_call) => {
                self.check_attribute_name(&method_call.method, &method_call.position);
            }
            Expression::Binary(binary) if binary.op == BinaryOp::Add => {
                // only literal/literal concatenations are provable here;
                // runtime-assembled names are left to the helpers'
                // underscore refusal
                if let (Expression::Str(lhs), Expression::Str(rhs)) =
                    (binary.lhs.as_ref(), binary.rhs.as_ref())
                {
                    let joined = format!("{}{}", lhs.value, rhs.value);
                    if joined.starts_with('_') || joined.contains("__") {
                        self.diagnostics.push(
                            Diagnostic::warning(
                                Category::Security,
                                "SEC003",
                                format!(
                                    "string concatenation builds the underscore name '{joined}'"
                                ),
                                &binary.position,
                            )
                            .with_hint(
                                "the runtime helpers will refuse this name if it is used \
                                 as an attribute",
                            ),
                        );
                    }
                }
            }
            _ => {}
        }
    }
}
