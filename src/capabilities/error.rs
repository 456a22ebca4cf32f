use std::{error::Error, fmt::Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    Missing(String),
    Expired(String),
    UsageExceeded(String),
    PatternMismatch { capability: String, resource: String },
    OperationDenied { capability: String, operation: String },
    IntegrityViolation(String),
    InvalidGlob { pattern: String, message: String },
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityError::Missing(name) => {
                write!(f, "missing capability '{name}'")
            }
            CapabilityError::Expired(name) => {
                write!(f, "capability '{name}' has expired")
            }
            CapabilityError::UsageExceeded(name) => {
                write!(f, "capability '{name}' exceeded its usage cap")
            }
            CapabilityError::PatternMismatch {
                capability,
                resource,
            } => {
                write!(
                    f,
                    "capability '{capability}' does not cover resource '{resource}'"
                )
            }
            CapabilityError::OperationDenied {
                capability,
                operation,
            } => {
                write!(
                    f,
                    "capability '{capability}' does not allow operation '{operation}'"
                )
            }
            CapabilityError::IntegrityViolation(name) => {
                write!(f, "capability '{name}' failed its integrity check")
            }
            CapabilityError::InvalidGlob { pattern, message } => {
                write!(f, "invalid resource pattern '{pattern}': {message}")
            }
        }
    }
}

impl Error for CapabilityError {}
