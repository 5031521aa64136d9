//! Tenant namespace resolution
//!
//! Maps a tenant to the storage key holding its profile. The consumer gets
//! one fixed key; each client gets the client prefix followed by its id.
//! Because the consumer key may not start with the client prefix, and the
//! prefix is followed by the full id, distinct tenants never share a key.

use crate::error::NamespaceError;
use discovery_model::Tenant;
use serde::{Deserialize, Serialize};

/// Default consumer-mode key
pub const DEFAULT_CONSUMER_KEY: &str = "discovery-profile";
/// Default prefix for client keys
pub const DEFAULT_CLIENT_PREFIX: &str = "discovery-profile::client::";

/// Key under which one blob is stored
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Wrap a raw key
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespace layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Key for the consumer profile
    pub consumer_key: String,
    /// Prefix for every client profile key
    pub client_prefix: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            consumer_key: DEFAULT_CONSUMER_KEY.to_string(),
            client_prefix: DEFAULT_CLIENT_PREFIX.to_string(),
        }
    }
}

/// Pure tenant to key mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceResolver {
    config: NamespaceConfig,
}

impl NamespaceResolver {
    /// Build a resolver, rejecting layouts where tenants could collide
    ///
    /// # Errors
    /// Returns `NamespaceError` for empty keys or overlapping layouts
    pub fn new(config: NamespaceConfig) -> Result<Self, NamespaceError> {
        if config.consumer_key.is_empty() {
            return Err(NamespaceError::EmptyConsumerKey);
        }
        if config.client_prefix.is_empty() {
            return Err(NamespaceError::EmptyClientPrefix);
        }
        if config.consumer_key.starts_with(&config.client_prefix) {
            return Err(NamespaceError::Overlap {
                consumer_key: config.consumer_key,
                client_prefix: config.client_prefix,
            });
        }
        Ok(Self { config })
    }

    /// Storage key for a tenant
    #[must_use]
    pub fn resolve(&self, tenant: &Tenant) -> StorageKey {
        match tenant {
            Tenant::Consumer => StorageKey::new(self.config.consumer_key.clone()),
            Tenant::Client(id) => StorageKey::new(format!("{}{}", self.config.client_prefix, id)),
        }
    }

    /// Check whether a key belongs to some profile namespace
    #[must_use]
    pub fn is_profile_key(&self, key: &str) -> bool {
        key == self.config.consumer_key || key.starts_with(&self.config.client_prefix)
    }

    /// Reject an auxiliary key (such as the client registry) that would land
    /// inside a profile namespace
    ///
    /// # Errors
    /// Returns `NamespaceError::Reserved` on collision
    pub fn check_auxiliary(&self, key: &str) -> Result<StorageKey, NamespaceError> {
        if self.is_profile_key(key) {
            return Err(NamespaceError::Reserved(key.to_string()));
        }
        Ok(StorageKey::new(key))
    }

    /// Active layout
    #[inline]
    #[must_use]
    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self {
            config: NamespaceConfig::default(),
        }
    }
}
