//! Error types for the profile engine
//!
//! Provides error handling for:
//! - Broken pipeline dependency tables (programmer errors)
//! - Profile store misuse and illegal status transitions
//! - Client registry lookups
//!
//! Unreadable stored blobs are not errors here; they surface as
//! [`LoadSource::Recovered`](crate::store::LoadSource).

use discovery_model::{ClientId, ProfileStatus, SectionName, Tenant};
use discovery_vault::{NamespaceError, StorageError};

/// Pipeline invalidation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidationError {
    /// Step token not in the section's chain
    #[error("unknown step {token:?} in {section}")]
    UnknownStep {
        /// Section addressed
        section: SectionName,
        /// Token supplied
        token: String,
    },

    /// Section has no step pipeline
    #[error("{0} has no step pipeline")]
    NoPipeline(SectionName),

    /// A step was completed before its upstream steps
    #[error("cannot complete {step} in {section}: {missing} is not complete")]
    UpstreamIncomplete {
        /// Section addressed
        section: SectionName,
        /// Step being completed
        step: &'static str,
        /// First incomplete upstream step
        missing: &'static str,
    },

    /// A completed step sits downstream of an incomplete one
    #[error("{step} in {section} is complete but upstream {missing} is not")]
    OrderingViolation {
        /// Section addressed
        section: SectionName,
        /// Completed downstream step
        step: &'static str,
        /// First incomplete upstream step
        missing: &'static str,
    },
}

impl InvalidationError {
    /// Check if this error means the dependency table or a call site is wrong
    #[inline]
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::UnknownStep { .. } | Self::NoPipeline(_))
    }
}

/// Illegal profile status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition: {from:?} -> {to:?}")]
pub struct StatusError {
    /// Current status
    pub from: ProfileStatus,
    /// Requested status
    pub to: ProfileStatus,
}

/// Profile store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Mutation attempted with no resident profile
    #[error("no resident profile")]
    NoResidentProfile,

    /// Section patch was not a JSON object
    #[error("patch for {0} must be a JSON object")]
    PatchNotObject(SectionName),

    /// Restore would discard unsaved changes
    #[error("resident profile for {0} has unsaved changes")]
    UnsavedChanges(Tenant),

    /// Outgoing profile could not be flushed; the switch was aborted
    #[error("could not flush {tenant} before switching: {source}")]
    FlushFailed {
        /// Tenant still resident
        tenant: Tenant,
        /// Write failure
        #[source]
        source: StorageError,
    },

    /// Illegal status transition
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Pipeline operation failed
    #[error(transparent)]
    Invalidation(#[from] InvalidationError),

    /// Storage failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Namespace misconfiguration
    #[error("namespace configuration error: {0}")]
    Namespace(#[from] NamespaceError),

    /// Section failed to serialize
    #[error("section serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) | Self::FlushFailed { source: e, .. } => e.is_transient(),
            _ => false,
        }
    }
}

/// Client registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No client with this id
    #[error("client not found: {0}")]
    UnknownClient(ClientId),

    /// A client with this id already exists
    #[error("client already exists: {0}")]
    DuplicateClient(ClientId),

    /// Client name is blank
    #[error("client name must not be empty")]
    EmptyName,

    /// Storage failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programmer_error_classification() {
        assert!(InvalidationError::NoPipeline(SectionName::RiskComfort).is_programmer_error());
        assert!(InvalidationError::UnknownStep {
            section: SectionName::ValuesDiscovery,
            token: "top7".to_string(),
        }
        .is_programmer_error());
        assert!(!InvalidationError::UpstreamIncomplete {
            section: SectionName::ValuesDiscovery,
            step: "top5",
            missing: "top10",
        }
        .is_programmer_error());
    }

    #[test]
    fn store_error_retryable() {
        let transient = StoreError::Storage(StorageError::Unavailable("offline".to_string()));
        assert!(transient.is_retryable());
        assert!(!StoreError::NoResidentProfile.is_retryable());
    }

    #[test]
    fn status_error_display() {
        let err = StatusError {
            from: ProfileStatus::Complete,
            to: ProfileStatus::InProgress,
        };
        assert!(err.to_string().contains("illegal status transition"));
    }
}
