//! Persisted JSON envelope
//!
//! Every blob decrypts to `{ "state": { ... }, "version": N }`. The profile
//! namespace stores `{ "state": { "currentProfile": Profile | null } }`.

use discovery_model::Profile;
use serde::{Deserialize, Serialize};

/// Envelope schema version written by this crate
pub const ENVELOPE_VERSION: u32 = 1;

/// Versioned wrapper around persisted state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<S> {
    /// Persisted state
    pub state: S,
    /// Schema version at write time
    #[serde(default)]
    pub version: u32,
}

impl<S> Envelope<S> {
    /// Wrap state at the current version
    #[inline]
    #[must_use]
    pub fn new(state: S) -> Self {
        Self {
            state,
            version: ENVELOPE_VERSION,
        }
    }
}

/// State held in a profile namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileState {
    /// Resident profile at write time
    #[serde(default)]
    pub current_profile: Option<Profile>,
}

impl ProfileState {
    /// State holding `profile`
    #[inline]
    #[must_use]
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            current_profile: Some(profile),
        }
    }
}
