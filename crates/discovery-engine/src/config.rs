//! Engine configuration

use discovery_vault::{NamespaceConfig, NamespaceError, NamespaceResolver, StorageKey};
use serde::{Deserialize, Serialize};

/// Default storage key of the advisor's client registry
pub const DEFAULT_REGISTRY_KEY: &str = "discovery-clients";

/// Profile engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Storage key layout
    pub namespace: NamespaceConfig,
    /// Where the client registry lives; must not collide with profile keys
    pub registry_key: String,
    /// Treat a client blob whose `ownerId` differs from the client id as unreadable
    pub verify_ownership: bool,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With namespace layout
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceConfig) -> Self {
        self.namespace = namespace;
        self
    }

    /// With registry key
    #[inline]
    #[must_use]
    pub fn with_registry_key(mut self, key: impl Into<String>) -> Self {
        self.registry_key = key.into();
        self
    }

    /// With ownership verification
    #[inline]
    #[must_use]
    pub fn with_verify_ownership(mut self, verify: bool) -> Self {
        self.verify_ownership = verify;
        self
    }

    /// Validated namespace resolver
    ///
    /// # Errors
    /// [`NamespaceError`] for an empty or overlapping layout
    pub fn resolver(&self) -> Result<NamespaceResolver, NamespaceError> {
        NamespaceResolver::new(self.namespace.clone())
    }

    /// Registry key, checked against the profile namespaces
    ///
    /// # Errors
    /// [`NamespaceError::Reserved`] if it falls inside a profile namespace
    pub fn registry_storage_key(&self) -> Result<StorageKey, NamespaceError> {
        self.resolver()?.check_auxiliary(&self.registry_key)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: NamespaceConfig::default(),
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            verify_ownership: true,
        }
    }
}
