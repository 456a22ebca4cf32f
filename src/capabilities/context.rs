use std::{
    cell::RefCell,
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::trace;
use uuid::Uuid;

use super::{CapabilityError, CapabilityToken};

/// Thread-scoped holder of live capability tokens with an optional
/// parent link. Children see their parent's tokens by reference;
/// removing a token from a child never affects the parent.
#[derive(Debug)]
pub struct CapabilityContext {
    id: Uuid,
    parent: Option<Arc<CapabilityContext>>,
    tokens: Mutex<HashMap<String, Arc<CapabilityToken>>>,
}

impl CapabilityContext {
    pub fn new(parent: Option<Arc<CapabilityContext>>) -> Arc<CapabilityContext> {
        Arc::new(CapabilityContext {
            id: Uuid::new_v4(),
            parent,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn add_token(&self, token: Arc<CapabilityToken>) {
        trace!(
            "adding token '{kind}' to context {id}",
            kind = token.capability_type(),
            id = self.id
        );
        let mut tokens = self.tokens.lock().expect("context lock poisoned");
        tokens.insert(token.capability_type().to_owned(), token);
    }

    pub fn remove_token(&self, capability_type: &str) {
        let mut tokens = self.tokens.lock().expect("context lock poisoned");
        tokens.remove(capability_type);
    }

    /// Find a valid token of the given type, pruning expired tokens on
    /// the way and falling back to the parent context.
    pub fn find_token(&self, capability_type: &str) -> Option<Arc<CapabilityToken>> {
        {
            let mut tokens = self.tokens.lock().expect("context lock poisoned");
            tokens.retain(|_, token| !token.is_expired());

            if let Some(token) = tokens.get(capability_type) {
                if token.validate().is_ok() {
                    return Some(token.clone());
                }
            }
        }

        self.parent
            .as_ref()
            .and_then(|parent| parent.find_token(capability_type))
    }

    pub fn has_capability(&self, capability_type: &str) -> bool {
        self.find_token(capability_type).is_some()
    }

    /// All visible capability types, own tokens shadowing the parent's.
    pub fn capability_types(&self) -> Vec<String> {
        let mut types = self
            .parent
            .as_ref()
            .map(|parent| parent.capability_types())
            .unwrap_or_default();

        let mut tokens = self.tokens.lock().expect("context lock poisoned");
        tokens.retain(|_, token| !token.is_expired());
        for capability_type in tokens.keys() {
            if !types.contains(capability_type) {
                types.push(capability_type.clone());
            }
        }

        types.sort();
        types
    }
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Arc<CapabilityContext>>> = const { RefCell::new(Vec::new()) };
}

/// Guard returned by [`enter_context`]. Exits the context when dropped,
/// so the context is left on all paths including panics and early
/// returns.
#[derive(Debug)]
pub struct ContextGuard {
    context_id: Uuid,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.last().map(|context| context.id) == Some(self.context_id) {
                stack.pop();
            }
        });
    }
}

/// Enter a new context holding the given tokens, nested below the
/// current one (if any).
pub fn enter_context(tokens: Vec<Arc<CapabilityToken>>) -> ContextGuard {
    let parent = current_context();
    let context = CapabilityContext::new(parent);
    for token in tokens {
        context.add_token(token);
    }

    let context_id = context.id;
    CONTEXT_STACK.with(|stack| stack.borrow_mut().push(context));
    ContextGuard { context_id }
}

pub fn current_context() -> Option<Arc<CapabilityContext>> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Whether a valid token of the given type is visible on this thread.
pub fn has_capability(capability_type: &str) -> bool {
    current_context()
        .map(|context| context.has_capability(capability_type))
        .unwrap_or(false)
}

pub fn get_capabilities() -> Vec<String> {
    current_context()
        .map(|context| context.capability_types())
        .unwrap_or_default()
}

/// Introspection record for a single live capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInfo {
    pub capability_type: String,
    pub resource_patterns: Vec<String>,
    pub operations: Vec<String>,
    pub usage: u64,
}

pub fn get_capability_info(capability_type: &str) -> Option<CapabilityInfo> {
    let token = current_context()?.find_token(capability_type)?;
    Some(CapabilityInfo {
        capability_type: token.capability_type().to_owned(),
        resource_patterns: token.resource_patterns().to_vec(),
        operations: token.operations().map(str::to_owned).collect(),
        usage: token.usage(),
    })
}

/// Find a token of the given type or fail with a missing-capability
/// error. Used by builtins that enforce capability requirements.
pub fn require_capability(capability_type: &str) -> Result<Arc<CapabilityToken>, CapabilityError> {
    current_context()
        .and_then(|context| context.find_token(capability_type))
        .ok_or_else(|| CapabilityError::Missing(capability_type.to_owned()))
}

#[cfg(test)]
mod tests {
    use crate::capabilities::CapabilityConstraints;

    use super::*;

    fn token(kind: &str) -> Arc<CapabilityToken> {
        Arc::new(
            CapabilityToken::new(
                kind,
                vec!["*".to_owned()],
                ["read".to_owned()],
                CapabilityConstraints::default(),
            )
            .expect("token should build"),
        )
    }

    #[test]
    fn test_capability_visible_inside_context() {
        assert!(!has_capability("FileReader"));
        {
            let _guard = enter_context(vec![token("FileReader")]);
            assert!(has_capability("FileReader"));
        }
        assert!(!has_capability("FileReader"));
    }

    #[test]
    fn test_child_inherits_parent_tokens() {
        let _outer = enter_context(vec![token("FileReader")]);
        let _inner = enter_context(vec![token("NetworkAccess")]);

        assert!(has_capability("FileReader"));
        assert!(has_capability("NetworkAccess"));
        assert_eq!(get_capabilities(), vec!["FileReader", "NetworkAccess"]);
    }

    #[test]
    fn test_removing_from_child_keeps_parent() {
        let _outer = enter_context(vec![token("FileReader")]);
        let child = current_context().expect("context expected");
        let _inner = enter_context(vec![token("FileReader")]);

        let inner = current_context().expect("context expected");
        inner.remove_token("FileReader");

        // the parent's token still answers for the child
        assert!(has_capability("FileReader"));
        assert!(child.has_capability("FileReader"));
    }

    #[test]
    fn test_contexts_are_thread_scoped() {
        let _guard = enter_context(vec![token("FileReader")]);

        let seen_elsewhere =
            std::thread::spawn(|| has_capability("FileReader")).join().expect("thread");
        assert!(!seen_elsewhere);
    }

    #[test]
    fn test_capability_info() {
        let _guard = enter_context(vec![token("FileReader")]);

        let info = get_capability_info("FileReader").expect("info expected");
        assert_eq!(info.capability_type, "FileReader");
        assert_eq!(info.resource_patterns, vec!["*"]);
        assert_eq!(info.operations, vec!["read"]);
    }
}
