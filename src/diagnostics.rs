//! Diagnostic model shared by the analyzer, the code generator, and the
//! resolver. All user-visible findings flow through this one shape so
//! CLI, REPL, and LSP collaborators render them the same way.
use std::fmt::Display;

use serde::Serialize;

use crate::ast::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Syntax,
    Transform,
    Security,
    UnknownIdentifier,
    Whitelist,
    Import,
    Capability,
    Cancelled,
}

impl Category {
    /// Process exit code used by the `mlc` binary for this category, so
    /// scripts can branch on the failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Category::Syntax => 10,
            Category::Transform => 11,
            Category::Security => 12,
            Category::UnknownIdentifier => 13,
            Category::Whitelist => 14,
            Category::Import => 15,
            Category::Capability => 16,
            Category::Cancelled => 17,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl From<&Position> for Location {
    fn from((file, line, column): &Position) -> Self {
        Location {
            file: file.clone(),
            line: *line,
            column: *column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub code: String,
    pub message: String,
    pub location: Location,
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        category: Category,
        code: &str,
        message: impl Into<String>,
        position: &Position,
    ) -> Diagnostic {
        Diagnostic {
            severity,
            category,
            code: code.to_owned(),
            message: message.into(),
            location: Location::from(position),
            hints: vec![],
            remediation: None,
        }
    }

    pub fn error(
        category: Category,
        code: &str,
        message: impl Into<String>,
        position: &Position,
    ) -> Diagnostic {
        Diagnostic::new(Severity::Error, category, code, message, position)
    }

    pub fn warning(
        category: Category,
        code: &str,
        message: impl Into<String>,
        position: &Position,
    ) -> Diagnostic {
        Diagnostic::new(Severity::Warning, category, code, message, position)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Diagnostic {
        self.hints.push(hint.into());
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Diagnostic {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}]: {} ({}:{}:{})",
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "info",
            },
            self.code,
            self.message,
            self.location.file,
            self.location.line,
            self.location.column
        )?;

        for hint in &self.hints {
            write!(f, "\n  hint: {hint}")?;
        }
        if let Some(remediation) = &self.remediation {
            write!(f, "\n  fix: {remediation}")?;
        }

        Ok(())
    }
}

/// Whether a batch of diagnostics should abort compilation under the
/// given strictness.
pub fn has_fatal(diagnostics: &[Diagnostic], strict: bool) -> bool {
    diagnostics.iter().any(|diagnostic| {
        diagnostic.is_error() || (strict && diagnostic.severity == Severity::Warning)
    })
}
