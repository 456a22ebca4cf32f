//! Capability-declaration pass: structural validation of `capability`
//! blocks before the generator turns them into token factories.
use std::collections::HashSet;

use crate::{
    ast::{Ast, Statement},
    capabilities::is_valid_glob,
    diagnostics::{Category, Diagnostic},
};

use super::{AnalyzerContext, AnalyzerPass};

pub struct CapabilityDeclPass;

impl AnalyzerPass for CapabilityDeclPass {
    fn name(&self) -> &'static str {
        "capability-declarations"
    }

    fn run(&mut self, ast: &Ast, _ctx: &AnalyzerContext) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];

        for statement in ast.nodes() {
            let Statement::Capability(capability) = statement else {
                continue;
            };

            if capability.resources.is_empty() {
                diagnostics.push(Diagnostic::error(
                    Category::Capability,
                    "CAP001",
                    format!(
                        "capability '{}' declares no resource patterns",
                        capability.name.value
                    ),
                    &capability.position,
                ));
            }

            if capability.operations.is_empty() {
                diagnostics.push(Diagnostic::error(
                    Category::Capability,
                    "CAP002",
                    format!(
                        "capability '{}' allows no operations",
                        capability.name.value
                    ),
                    &capability.position,
                ));
            }

            for resource in &capability.resources {
                if !is_valid_glob(&resource.value) {
                    diagnostics.push(Diagnostic::error(
                        Category::Capability,
                        "CAP003",
                        format!("malformed resource pattern '{}'", resource.value),
                        &resource.position,
                    ));
                }
            }

            let mut seen = HashSet::new();
            for operation in &capability.operations {
                if !seen.insert(operation.value.as_str()) {
                    diagnostics.push(Diagnostic::warning(
                        Category::Capability,
                        "CAP004",
                        format!(
                            "operation '{}' is allowed more than once",
                            operation.value
                        ),
                        &operation.position,
                    ));
                }
            }
        }

        diagnostics
    }
}
