//! Encrypted persistence adapter
//!
//! Blob layout: 8-byte magic, 12-byte random nonce, AES-256-GCM ciphertext.
//! The storage key is bound in as associated data, so a blob copied into
//! another tenant's namespace fails to open.
//!
//! Reads never fail on bad bytes. A blob that is truncated, tampered with,
//! sealed under another key, or no longer matches the schema comes back as
//! [`ReadOutcome::Corrupt`]; callers treat it as "no prior state".

use crate::backend::KeyValueStore;
use crate::error::StorageError;
use crate::key::SessionKey;
use crate::namespace::StorageKey;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;

const BLOB_MAGIC: &[u8; 8] = b"DSCV0001";
const NONCE_LEN: usize = 12;

/// Why a stored blob could not be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorruptReason {
    /// Shorter than the header
    #[error("blob truncated ({0} bytes)")]
    Truncated(usize),
    /// Header magic missing
    #[error("blob header not recognized")]
    BadMagic,
    /// Authentication failed: wrong key, wrong namespace or tampering
    #[error("blob failed to decrypt")]
    Decrypt,
    /// Plaintext was not valid JSON for the expected shape
    #[error("blob does not match schema: {0}")]
    Schema(String),
}

/// Result of reading one key
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    /// Value decoded
    Loaded(T),
    /// Nothing stored
    NotFound,
    /// Bytes present but unreadable
    Corrupt(CorruptReason),
}

impl<T> ReadOutcome<T> {
    /// Collapse to an option; corrupt reads become `None`
    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::NotFound | Self::Corrupt(_) => None,
        }
    }

    /// Map the loaded value
    #[inline]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOutcome<U> {
        match self {
            Self::Loaded(value) => ReadOutcome::Loaded(f(value)),
            Self::NotFound => ReadOutcome::NotFound,
            Self::Corrupt(reason) => ReadOutcome::Corrupt(reason),
        }
    }

    /// Check for a corrupt read
    #[inline]
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

/// Encrypt/decrypt envelope over a raw store
pub struct EncryptedStorage<S> {
    backend: S,
    cipher: Aes256Gcm,
}

impl<S> std::fmt::Debug for EncryptedStorage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStorage")
            .field("cipher", &"AES-256-GCM")
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> EncryptedStorage<S> {
    /// Wrap `backend`, sealing with `key`
    #[must_use]
    pub fn new(backend: S, key: &SessionKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose()));
        Self { backend, cipher }
    }

    /// Underlying raw store
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn seal(&self, key: &StorageKey, plaintext: &[u8]) -> Result<Vec<u8>, StorageError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: key.as_str().as_bytes(),
                },
            )
            .map_err(|_| StorageError::Encryption {
                key: key.to_string(),
            })?;

        let mut out = Vec::with_capacity(BLOB_MAGIC.len() + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(BLOB_MAGIC);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, key: &StorageKey, stored: &[u8]) -> Result<Vec<u8>, CorruptReason> {
        let header = BLOB_MAGIC.len() + NONCE_LEN;
        if stored.len() < header {
            return Err(CorruptReason::Truncated(stored.len()));
        }
        if !stored.starts_with(BLOB_MAGIC) {
            return Err(CorruptReason::BadMagic);
        }
        let nonce = &stored[BLOB_MAGIC.len()..header];
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: &stored[header..],
                    aad: key.as_str().as_bytes(),
                },
            )
            .map_err(|_| CorruptReason::Decrypt)
    }

    /// Read and decrypt the bytes at `key`
    ///
    /// # Errors
    /// Only backend I/O failures; unreadable bytes are `ReadOutcome::Corrupt`
    pub async fn read(&self, key: &StorageKey) -> Result<ReadOutcome<Vec<u8>>, StorageError> {
        let Some(stored) = self.backend.get(key.as_str()).await? else {
            return Ok(ReadOutcome::NotFound);
        };
        match self.open(key, &stored) {
            Ok(plaintext) => Ok(ReadOutcome::Loaded(plaintext)),
            Err(reason) => {
                tracing::debug!(key = %key, bytes = stored.len(), %reason, "discarding unreadable blob");
                Ok(ReadOutcome::Corrupt(reason))
            }
        }
    }

    /// Decrypted bytes at `key`, or `None` if missing or unreadable
    pub async fn get(&self, key: &StorageKey) -> Option<Vec<u8>> {
        match self.read(key).await {
            Ok(outcome) => outcome.into_option(),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "storage read failed");
                None
            }
        }
    }

    /// Encrypt and store `plaintext` at `key`, replacing any previous blob
    ///
    /// # Errors
    /// Returns `StorageError` if sealing or the backend write fails
    pub async fn set(&self, key: &StorageKey, plaintext: &[u8]) -> Result<(), StorageError> {
        let blob = self.seal(key, plaintext)?;
        let len = blob.len();
        self.backend.set(key.as_str(), blob).await?;
        tracing::debug!(key = %key, bytes = len, "wrote encrypted blob");
        Ok(())
    }

    /// Delete the blob at `key`
    ///
    /// # Errors
    /// Returns `StorageError` if the backend delete fails
    pub async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
        self.backend.remove(key.as_str()).await
    }

    /// Read and decode a JSON value
    ///
    /// # Errors
    /// Only backend I/O failures
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        key: &StorageKey,
    ) -> Result<ReadOutcome<T>, StorageError> {
        Ok(match self.read(key).await? {
            ReadOutcome::Loaded(plaintext) => match serde_json::from_slice(&plaintext) {
                Ok(value) => ReadOutcome::Loaded(value),
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "blob does not match schema");
                    ReadOutcome::Corrupt(CorruptReason::Schema(e.to_string()))
                }
            },
            ReadOutcome::NotFound => ReadOutcome::NotFound,
            ReadOutcome::Corrupt(reason) => ReadOutcome::Corrupt(reason),
        })
    }

    /// Encode and store a JSON value
    ///
    /// # Errors
    /// Returns `StorageError` on serialization, sealing or backend failure
    pub async fn write_json<T: Serialize + Sync>(
        &self,
        key: &StorageKey,
        value: &T,
    ) -> Result<(), StorageError> {
        let plaintext = serde_json::to_vec(value)?;
        self.set(key, &plaintext).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;

    fn storage() -> (EncryptedStorage<MemoryStore>, MemoryStore) {
        let raw = MemoryStore::new();
        (
            EncryptedStorage::new(raw.clone(), &SessionKey::from_bytes([7; 32])),
            raw,
        )
    }

    #[tokio::test]
    async fn plaintext_never_reaches_the_backend() {
        let (storage, raw) = storage();
        let key = StorageKey::new("k");
        storage.set(&key, b"SENTINEL_VALUE").await.unwrap();

        let stored = raw.raw("k").unwrap();
        assert!(stored.starts_with(BLOB_MAGIC));
        assert!(!stored
            .windows(b"SENTINEL_VALUE".len())
            .any(|w| w == b"SENTINEL_VALUE"));
        assert_eq!(storage.get(&key).await.unwrap(), b"SENTINEL_VALUE".to_vec());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let (storage, _) = storage();
        assert_eq!(
            storage.read(&StorageKey::new("nope")).await.unwrap(),
            ReadOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn truncated_blob_reads_as_corrupt() {
        let (storage, raw) = storage();
        let key = StorageKey::new("k");
        storage.set(&key, b"payload").await.unwrap();
        let mut stored = raw.raw("k").unwrap();
        stored.truncate(10);
        raw.insert_raw("k", stored);

        assert_eq!(
            storage.read(&key).await.unwrap(),
            ReadOutcome::Corrupt(CorruptReason::Truncated(10))
        );
        assert!(storage.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn tampered_blob_fails_authentication() {
        let (storage, raw) = storage();
        let key = StorageKey::new("k");
        storage.set(&key, b"payload").await.unwrap();
        let mut stored = raw.raw("k").unwrap();
        let last = stored.len() - 1;
        stored[last] ^= 0xFF;
        raw.insert_raw("k", stored);

        assert_eq!(
            storage.read(&key).await.unwrap(),
            ReadOutcome::Corrupt(CorruptReason::Decrypt)
        );
    }

    #[tokio::test]
    async fn wrong_key_fails_to_open() {
        let raw = MemoryStore::new();
        let writer = EncryptedStorage::new(raw.clone(), &SessionKey::from_bytes([1; 32]));
        let reader = EncryptedStorage::new(raw, &SessionKey::from_bytes([2; 32]));
        let key = StorageKey::new("k");
        writer.set(&key, b"payload").await.unwrap();

        assert!(reader.read(&key).await.unwrap().is_corrupt());
    }

    #[tokio::test]
    async fn blob_is_bound_to_its_namespace() {
        let (storage, raw) = storage();
        storage
            .set(&StorageKey::new("tenant-a"), b"a's data")
            .await
            .unwrap();
        raw.insert_raw("tenant-b", raw.raw("tenant-a").unwrap());

        assert_eq!(
            storage.read(&StorageKey::new("tenant-b")).await.unwrap(),
            ReadOutcome::Corrupt(CorruptReason::Decrypt)
        );
    }

    #[tokio::test]
    async fn unsealed_bytes_have_bad_magic() {
        let (storage, raw) = storage();
        raw.insert_raw("k", b"{\"state\":{}} plus padding".to_vec());
        assert_eq!(
            storage.read(&StorageKey::new("k")).await.unwrap(),
            ReadOutcome::Corrupt(CorruptReason::BadMagic)
        );
    }

    #[tokio::test]
    async fn schema_mismatch_is_corrupt() {
        let (storage, _) = storage();
        let key = StorageKey::new("k");
        storage.set(&key, b"[1,2,3]").await.unwrap();
        let outcome: ReadOutcome<std::collections::HashMap<String, String>> =
            storage.read_json(&key).await.unwrap();
        assert!(matches!(
            outcome,
            ReadOutcome::Corrupt(CorruptReason::Schema(_))
        ));
    }

    #[tokio::test]
    async fn nonces_differ_between_writes() {
        let (storage, raw) = storage();
        let key = StorageKey::new("k");
        storage.set(&key, b"same").await.unwrap();
        let first = raw.raw("k").unwrap();
        storage.set(&key, b"same").await.unwrap();
        assert_ne!(first, raw.raw("k").unwrap());
    }
}
