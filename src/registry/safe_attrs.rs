use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

use log::debug;
use once_cell::sync::Lazy;

use super::RegistryError;

/// Introspection-adjacent names that are refused as attributes no matter
/// which type they appear on. The underscore rule catches the dunder
/// spellings; this list catches the bare ones.
pub const DANGEROUS_NAMES: &[&str] = &[
    "class",
    "dict",
    "globals",
    "locals",
    "vars",
    "bases",
    "mro",
    "subclasses",
    "code",
    "closure",
    "import",
    "builtins",
    "eval",
    "exec",
    "compile",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Property,
    Method,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeEntry {
    pub name: String,
    pub kind: AttributeKind,
    pub description: String,
}

impl AttributeEntry {
    pub fn method(name: &str, description: &str) -> AttributeEntry {
        AttributeEntry {
            name: name.to_owned(),
            kind: AttributeKind::Method,
            description: description.to_owned(),
        }
    }

    pub fn property(name: &str, description: &str) -> AttributeEntry {
        AttributeEntry {
            name: name.to_owned(),
            kind: AttributeKind::Property,
            description: description.to_owned(),
        }
    }
}

/// Per-type whitelist of attribute names reachable from ML on host
/// objects. Host types gain ML visibility only by registering an entry
/// here.
#[derive(Debug)]
pub struct SafeAttributeRegistry {
    entries: RwLock<HashMap<String, HashMap<String, AttributeEntry>>>,
    frozen: AtomicBool,
}

static GLOBAL: Lazy<SafeAttributeRegistry> = Lazy::new(SafeAttributeRegistry::with_defaults);

pub fn safe_attribute_registry() -> &'static SafeAttributeRegistry {
    &GLOBAL
}

/// Whether a name is refused before any whitelist is consulted.
pub fn is_dangerous_name(name: &str) -> bool {
    name.starts_with('_') || DANGEROUS_NAMES.contains(&name)
}

impl SafeAttributeRegistry {
    pub fn new() -> SafeAttributeRegistry {
        SafeAttributeRegistry {
            entries: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    fn with_defaults() -> SafeAttributeRegistry {
        let registry = SafeAttributeRegistry::new();

        let str_methods = [
            ("upper", "Uppercased copy of the string."),
            ("lower", "Lowercased copy of the string."),
            ("strip", "Copy with surrounding whitespace removed."),
            ("split", "Split into a list on a separator."),
            ("join", "Join a list of strings with this separator."),
            ("replace", "Copy with occurrences of a substring replaced."),
            ("startswith", "Whether the string starts with a prefix."),
            ("endswith", "Whether the string ends with a suffix."),
            ("find", "Index of a substring, or -1."),
        ];
        let list_methods = [
            ("append", "Append an element in place."),
            ("pop", "Remove and return the last element."),
            ("insert", "Insert an element at an index."),
            ("remove", "Remove the first matching element."),
            ("index", "Index of the first matching element."),
            ("count", "Number of matching elements."),
            ("sort", "Sort in place."),
            ("reverse", "Reverse in place."),
            ("extend", "Append all elements of another list."),
        ];
        // reachable from the emitted host runtime only: untagged host
        // dicts can surface there from allowed host modules, while the
        // embedded floor's objects are tagged records that dispatch
        // before this registry is consulted
        let dict_methods = [
            ("keys", "The mapping's keys."),
            ("values", "The mapping's values."),
            ("items", "Key/value pairs."),
            ("get", "Value for a key, with an optional default."),
        ];

        let mut register = |type_key: &str, methods: &[(&str, &str)]| {
            let entries = methods
                .iter()
                .map(|(name, description)| AttributeEntry::method(name, description))
                .collect::<Vec<_>>();
            registry
                .register(type_key, entries)
                .expect("default attribute registration cannot fail before freeze");
        };

        register("str", &str_methods);
        register("list", &list_methods);
        register("dict", &dict_methods);

        registry
    }

    /// Register whitelist entries for a host type. Only permitted during
    /// initialization, before the registry is frozen.
    pub fn register(
        &self,
        type_key: &str,
        new_entries: Vec<AttributeEntry>,
    ) -> Result<(), RegistryError> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(RegistryError::new(format!(
                "safe-attribute registry is frozen; cannot register '{type_key}'"
            )));
        }

        debug!(
            "registering {count} safe attributes for type '{type_key}'",
            count = new_entries.len()
        );

        let mut entries = self.entries.write().expect("registry lock poisoned");
        let per_type = entries.entry(type_key.to_owned()).or_default();
        for entry in new_entries {
            per_type.insert(entry.name.clone(), entry);
        }

        Ok(())
    }

    /// Freeze the registry. Called once initialization is complete;
    /// all later registrations fail.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    /// The three-step check: underscore prefix, dangerous-name
    /// blacklist, then the per-type whitelist.
    pub fn is_safe_attribute_name(&self, type_key: &str, name: &str) -> bool {
        if is_dangerous_name(name) {
            return false;
        }

        let entries = self.entries.read().expect("registry lock poisoned");
        entries
            .get(type_key)
            .map(|per_type| per_type.contains_key(name))
            .unwrap_or(false)
    }

    pub fn lookup(&self, type_key: &str, name: &str) -> Option<AttributeEntry> {
        if is_dangerous_name(name) {
            return None;
        }

        let entries = self.entries.read().expect("registry lock poisoned");
        entries
            .get(type_key)
            .and_then(|per_type| per_type.get(name))
            .cloned()
    }

    pub fn attribute_names(&self, type_key: &str) -> Vec<String> {
        let entries = self.entries.read().expect("registry lock poisoned");
        let mut names = entries
            .get(type_key)
            .map(|per_type| per_type.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for SafeAttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_always_unsafe() {
        let registry = SafeAttributeRegistry::with_defaults();
        assert!(!registry.is_safe_attribute_name("str", "_upper"));
        assert!(!registry.is_safe_attribute_name("str", "__class__"));
    }

    #[test]
    fn test_dangerous_names_blocked_everywhere() {
        let registry = SafeAttributeRegistry::with_defaults();
        for name in DANGEROUS_NAMES {
            assert!(
                !registry.is_safe_attribute_name("str", name),
                "'{name}' should be refused"
            );
        }
    }

    #[test]
    fn test_whitelisted_method_allowed() {
        let registry = SafeAttributeRegistry::with_defaults();
        assert!(registry.is_safe_attribute_name("str", "upper"));
        assert!(registry.is_safe_attribute_name("list", "append"));
    }

    #[test]
    fn test_unlisted_name_refused() {
        let registry = SafeAttributeRegistry::with_defaults();
        assert!(!registry.is_safe_attribute_name("str", "mystery"));
        assert!(!registry.is_safe_attribute_name("unknown_type", "upper"));
    }

    #[test]
    fn test_frozen_registry_rejects_registration() {
        let registry = SafeAttributeRegistry::new();
        registry.freeze();
        let result = registry.register("str", vec![AttributeEntry::method("upper", "")]);
        assert!(result.is_err());
    }
}
