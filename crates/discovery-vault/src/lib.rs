//! Discovery Vault
//!
//! Encrypted, tenant-namespaced persistence:
//! - **KeyValueStore**: raw async byte store ([`MemoryStore`], [`DirectoryStore`])
//! - **EncryptedStorage**: AES-256-GCM envelope with JSON framing; unreadable
//!   blobs surface as [`ReadOutcome::Corrupt`], never as errors
//! - **NamespaceResolver**: tenant to storage key mapping
//!
//! # Example
//!
//! ```rust
//! use discovery_model::Tenant;
//! use discovery_vault::{EncryptedStorage, MemoryStore, NamespaceResolver, SessionKey};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = EncryptedStorage::new(MemoryStore::new(), &SessionKey::generate());
//! let key = NamespaceResolver::default().resolve(&Tenant::client("c42"));
//!
//! storage.set(&key, b"hello").await?;
//! assert_eq!(storage.get(&key).await.as_deref(), Some(&b"hello"[..]));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod encrypted;
pub mod envelope;
pub mod error;
pub mod key;
pub mod namespace;

// Re-exports
pub use backend::{DirectoryStore, KeyValueStore, MemoryStore};
pub use encrypted::{CorruptReason, EncryptedStorage, ReadOutcome};
pub use envelope::{Envelope, ProfileState, ENVELOPE_VERSION};
pub use error::{KeyError, NamespaceError, StorageError};
pub use key::SessionKey;
pub use namespace::{NamespaceConfig, NamespaceResolver, StorageKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
