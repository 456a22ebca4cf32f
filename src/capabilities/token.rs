use std::{
    collections::BTreeSet,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{compile_glob, CapabilityError};

/// Constraints attached to a capability token. Only constraints that are
/// actually present are enforced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilityConstraints {
    pub expires_at: Option<SystemTime>,
    pub usage_cap: Option<u64>,
    pub max_file_size: Option<u64>,
    pub network_hosts: Vec<String>,
}

/// Unforgeable permission certificate. All fields except the usage
/// counter are immutable after construction; the checksum is the SHA-256
/// of the canonical serialization of those fields, so any mutation
/// invalidates the token.
#[derive(Debug)]
pub struct CapabilityToken {
    id: Uuid,
    capability_type: String,
    resource_patterns: Vec<String>,
    operations: BTreeSet<String>,
    constraints: CapabilityConstraints,
    checksum: String,
    usage: AtomicU64,
}

impl CapabilityToken {
    pub fn new(
        capability_type: impl Into<String>,
        resource_patterns: Vec<String>,
        operations: impl IntoIterator<Item = String>,
        constraints: CapabilityConstraints,
    ) -> Result<CapabilityToken, CapabilityError> {
        let capability_type = capability_type.into();

        // reject malformed globs up front so a token can never carry one
        for pattern in &resource_patterns {
            compile_glob(pattern)?;
        }

        let id = Uuid::new_v4();
        let operations: BTreeSet<String> = operations.into_iter().collect();
        let checksum = Self::compute_checksum(
            &id,
            &capability_type,
            &resource_patterns,
            &operations,
            &constraints,
        );

        Ok(CapabilityToken {
            id,
            capability_type,
            resource_patterns,
            operations,
            constraints,
            checksum,
            usage: AtomicU64::new(0),
        })
    }

    fn compute_checksum(
        id: &Uuid,
        capability_type: &str,
        resource_patterns: &[String],
        operations: &BTreeSet<String>,
        constraints: &CapabilityConstraints,
    ) -> String {
        let expiry = constraints
            .expires_at
            .and_then(|at| at.duration_since(UNIX_EPOCH).ok())
            .map(|since| since.as_nanos().to_string())
            .unwrap_or_else(|| "-".to_owned());
        let usage_cap = constraints
            .usage_cap
            .map(|cap| cap.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let max_file_size = constraints
            .max_file_size
            .map(|size| size.to_string())
            .unwrap_or_else(|| "-".to_owned());

        let canonical = format!(
            "{id}\u{1f}{capability_type}\u{1f}{patterns}\u{1f}{operations}\u{1f}{expiry}\u{1f}{usage_cap}\u{1f}{max_file_size}\u{1f}{hosts}",
            patterns = resource_patterns.join(","),
            operations = operations
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(","),
            hosts = constraints.network_hosts.join(","),
        );

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn capability_type(&self) -> &str {
        &self.capability_type
    }

    pub fn resource_patterns(&self) -> &[String] {
        &self.resource_patterns
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(String::as_str)
    }

    pub fn constraints(&self) -> &CapabilityConstraints {
        &self.constraints
    }

    pub fn usage(&self) -> u64 {
        self.usage.load(Ordering::SeqCst)
    }

    /// Validate checksum, expiry, and usage cap. Runs on every access.
    pub fn validate(&self) -> Result<(), CapabilityError> {
        let expected = Self::compute_checksum(
            &self.id,
            &self.capability_type,
            &self.resource_patterns,
            &self.operations,
            &self.constraints,
        );
        if expected != self.checksum {
            return Err(CapabilityError::IntegrityViolation(
                self.capability_type.clone(),
            ));
        }

        if self.is_expired() {
            return Err(CapabilityError::Expired(self.capability_type.clone()));
        }

        if let Some(cap) = self.constraints.usage_cap {
            if self.usage.load(Ordering::SeqCst) >= cap {
                return Err(CapabilityError::UsageExceeded(
                    self.capability_type.clone(),
                ));
            }
        }

        Ok(())
    }

    pub fn is_expired(&self) -> bool {
        match self.constraints.expires_at {
            Some(at) => SystemTime::now() >= at,
            None => false,
        }
    }

    /// Check that this token covers the given resource and operation.
    pub fn matches(&self, resource: &str, operation: &str) -> Result<(), CapabilityError> {
        if !self.operations.contains(operation) {
            return Err(CapabilityError::OperationDenied {
                capability: self.capability_type.clone(),
                operation: operation.to_owned(),
            });
        }

        let covered = self.resource_patterns.iter().any(|pattern| {
            compile_glob(pattern)
                .map(|regex| regex.is_match(resource))
                .unwrap_or(false)
        });
        if !covered {
            return Err(CapabilityError::PatternMismatch {
                capability: self.capability_type.clone(),
                resource: resource.to_owned(),
            });
        }

        Ok(())
    }

    pub fn allows_host(&self, host: &str) -> bool {
        self.constraints.network_hosts.is_empty()
            || self.constraints.network_hosts.iter().any(|allowed| allowed == host)
    }

    /// Record one unit of usage, failing once the cap is reached.
    pub fn record_use(&self) -> Result<(), CapabilityError> {
        self.validate()?;
        self.usage.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn read_token() -> CapabilityToken {
        CapabilityToken::new(
            "FileReader",
            vec!["*.txt".to_owned()],
            ["read".to_owned()],
            CapabilityConstraints::default(),
        )
        .expect("token should build")
    }

    #[test]
    fn test_checksum_validates() {
        let token = read_token();
        assert!(token.validate().is_ok());
    }

    #[test]
    fn test_matches_resource_and_operation() {
        let token = read_token();
        assert!(token.matches("notes.txt", "read").is_ok());
        assert_eq!(
            token.matches("notes.txt", "write"),
            Err(CapabilityError::OperationDenied {
                capability: "FileReader".to_owned(),
                operation: "write".to_owned(),
            })
        );
        assert!(matches!(
            token.matches("secrets.bin", "read"),
            Err(CapabilityError::PatternMismatch { .. })
        ));
    }

    #[test]
    fn test_usage_cap_exceeds() {
        let token = CapabilityToken::new(
            "Limited",
            vec!["*".to_owned()],
            ["read".to_owned()],
            CapabilityConstraints {
                usage_cap: Some(2),
                ..CapabilityConstraints::default()
            },
        )
        .expect("token should build");

        assert!(token.record_use().is_ok());
        assert!(token.record_use().is_ok());
        assert_eq!(
            token.record_use(),
            Err(CapabilityError::UsageExceeded("Limited".to_owned()))
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = CapabilityToken::new(
            "Stale",
            vec!["*".to_owned()],
            ["read".to_owned()],
            CapabilityConstraints {
                expires_at: Some(SystemTime::now() - Duration::from_secs(1)),
                ..CapabilityConstraints::default()
            },
        )
        .expect("token should build");

        assert_eq!(
            token.validate(),
            Err(CapabilityError::Expired("Stale".to_owned()))
        );
    }

    #[test]
    fn test_invalid_glob_rejected_at_construction() {
        let result = CapabilityToken::new(
            "Broken",
            vec!["data[0".to_owned()],
            ["read".to_owned()],
            CapabilityConstraints::default(),
        );
        assert!(matches!(result, Err(CapabilityError::InvalidGlob { .. })));
    }

    #[test]
    fn test_empty_host_list_allows_all() {
        let token = read_token();
        assert!(token.allows_host("example.org"));
    }
}
