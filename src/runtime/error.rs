use std::{error::Error, fmt::Display};

use crate::capabilities::CapabilityError;

/// Failure raised by the embedded runtime helpers. Security refusals are
/// deliberately distinct from ordinary value errors so callers (and the
/// `getattr` builtin's default handling) can tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A name starting with `_` or on the dangerous-name blacklist was
    /// refused.
    SecurityViolation { name: String, message: String },
    /// Attribute exists checks passed but the per-type whitelist did not
    /// contain the name.
    AttributeDenied { type_name: String, attribute: String },
    Capability(CapabilityError),
    NotCallable { type_name: String },
    Arity { name: String, expected: String, found: usize },
    TypeMismatch { expected: String, found: String },
    Value(String),
}

impl RuntimeError {
    pub fn security(name: impl Into<String>, message: impl Into<String>) -> RuntimeError {
        RuntimeError::SecurityViolation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn is_security_refusal(&self) -> bool {
        matches!(
            self,
            RuntimeError::SecurityViolation { .. } | RuntimeError::AttributeDenied { .. }
        )
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::SecurityViolation { name, message } => {
                write!(f, "security violation on '{name}': {message}")
            }
            RuntimeError::AttributeDenied {
                type_name,
                attribute,
            } => {
                write!(
                    f,
                    "attribute '{attribute}' is not whitelisted on type '{type_name}'"
                )
            }
            RuntimeError::Capability(err) => write!(f, "{err}"),
            RuntimeError::NotCallable { type_name } => {
                write!(f, "value of type '{type_name}' is not callable")
            }
            RuntimeError::Arity {
                name,
                expected,
                found,
            } => {
                write!(f, "'{name}' expects {expected} arguments, got {found}")
            }
            RuntimeError::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            RuntimeError::Value(message) => f.write_str(message),
        }
    }
}

impl Error for RuntimeError {}

impl From<CapabilityError> for RuntimeError {
    fn from(err: CapabilityError) -> Self {
        RuntimeError::Capability(err)
    }
}
