//! Session key material
//!
//! The key is derived once per session by the caller and handed in as 32
//! opaque bytes. It is never logged: `Debug` prints a redacted marker.

use crate::error::KeyError;
use rand::rngs::OsRng;
use rand::RngCore;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// Opaque symmetric key for one session
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    /// Wrap raw key bytes
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy key bytes from a slice
    ///
    /// # Errors
    /// Returns `KeyError::InvalidLength` unless the slice is exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Parse 64 hex characters
    ///
    /// # Errors
    /// Returns `KeyError` for bad hex or wrong length
    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(encoded.trim())?;
        Self::from_slice(&bytes)
    }

    /// Fresh random key from the OS generator
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Hex encoding, for handing a generated key to an operator
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[inline]
    pub(crate) fn expose(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}
