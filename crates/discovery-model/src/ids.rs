//! Identifiers for profiles, clients and tenants

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner id given to a fresh consumer-mode profile
pub const CONSUMER_OWNER_ID: &str = "consumer";

/// Opaque profile identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    /// Generate new profile ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Advisor-managed client identifier
///
/// Stable for the lifetime of the client record; renaming a client never
/// changes it, so its storage namespace never moves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identifier
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Isolation boundary for a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Tenant {
    /// The single self-service user
    #[default]
    Consumer,
    /// One advisor-managed client
    Client(ClientId),
}

impl Tenant {
    /// Tenant for a client id
    #[inline]
    #[must_use]
    pub fn client(id: impl Into<ClientId>) -> Self {
        Self::Client(id.into())
    }

    /// Client id, if any
    #[inline]
    #[must_use]
    pub fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::Consumer => None,
            Self::Client(id) => Some(id),
        }
    }

    /// Owner id for a profile created fresh in this tenant
    #[inline]
    #[must_use]
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Consumer => CONSUMER_OWNER_ID,
            Self::Client(id) => id.as_str(),
        }
    }

    /// Check for consumer mode
    #[inline]
    #[must_use]
    pub fn is_consumer(&self) -> bool {
        matches!(self, Self::Consumer)
    }
}

impl From<Option<ClientId>> for Tenant {
    fn from(value: Option<ClientId>) -> Self {
        value.map_or(Self::Consumer, Self::Client)
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consumer => f.write_str("consumer"),
            Self::Client(id) => write!(f, "client:{id}"),
        }
    }
}
