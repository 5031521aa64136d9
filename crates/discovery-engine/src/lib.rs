//! Discovery Engine - profile state for consumers and advisors
//!
//! Owns the resident profile and everything that changes it:
//! - Sanitized, shallow section patches
//! - Pipeline invalidation when an upstream step changes
//! - Forward-only status transitions
//! - Tenant switching with flush-before-load persistence
//! - The advisor's client registry
//!
//! # Example
//!
//! ```rust
//! use discovery_engine::{EngineConfig, ProfileStore};
//! use discovery_model::SectionName;
//! use discovery_vault::{MemoryStore, SessionKey};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = ProfileStore::new(MemoryStore::new(), &SessionKey::generate(), &EngineConfig::new())?;
//! store.initialize("u1");
//! store.update_section(SectionName::BasicContext, json!({ "firstName": "Jo" }))?;
//! store.persist().await?;
//! assert!(!store.is_dirty());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod error;
pub mod invalidation;
pub mod registry;
pub mod sanitize;
pub mod status;
pub mod store;

// Re-exports for convenience
pub use config::{EngineConfig, DEFAULT_REGISTRY_KEY};
pub use error::{InvalidationError, RegistryError, StatusError, StoreError};
pub use invalidation::{
    Invalidation, PipelineChain, PipelineOp, PipelineSection, StepDescriptor,
    FINANCIAL_GOALS_CHAIN, VALUES_DISCOVERY_CHAIN,
};
pub use registry::{
    derive_status, Client, ClientRegistry, ClientStatus, ClientUpdate, NewClient,
    TRACKED_SECTIONS,
};
pub use sanitize::{is_reserved_key, sanitize, sanitize_with_report};
pub use status::{allowed_transitions, validate_transition};
pub use store::{
    HealedSteps, LoadSource, PersistOutcome, ProfileStore, RecoveryReason, RestoreOutcome,
    SectionUpdate, SharedProfileStore, SwitchOutcome,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the profile engine
    pub use crate::{
        ClientRegistry, EngineConfig, LoadSource, NewClient, ProfileStore, SharedProfileStore,
        StoreError,
    };
    pub use discovery_model::{ClientId, Profile, ProfileStatus, SectionName, Tenant};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
