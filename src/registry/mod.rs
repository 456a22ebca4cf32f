//! Initialize-once registries consulted by the analyzer, the code
//! generator, and the runtime helpers.
//!
//! Both registries are global and read-mostly: registrations happen
//! during initialization, after which the data is frozen for the rest of
//! the run.
mod native;
mod safe_attrs;
mod stdlib;

pub use self::safe_attrs::*;
pub use self::stdlib::*;

use std::{error::Error, fmt::Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryError {
    pub message: String,
}

impl RegistryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for RegistryError {}
