//! Error types for the vault

/// Storage failures on the write path or backend I/O
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend I/O failed
    #[error("storage i/o failed for {key}: {source}")]
    Io {
        /// Storage key involved
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backend refused the write for lack of space
    #[error("storage quota exceeded writing {key} ({requested} bytes, {available} available)")]
    QuotaExceeded {
        /// Storage key involved
        key: String,
        /// Bytes the write needed
        requested: usize,
        /// Bytes left under the quota
        available: usize,
    },

    /// Backend is not reachable
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// JSON framing failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sealing the blob failed
    #[error("encryption failed for {key}")]
    Encryption {
        /// Storage key involved
        key: String,
    },
}

impl StorageError {
    /// Check if a retry may succeed without any change to the data
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::QuotaExceeded { .. } | Self::Unavailable(_)
        )
    }
}

/// Malformed session key material
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Wrong number of bytes
    #[error("session key must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Not valid hex
    #[error("session key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Namespace configuration that could map two tenants to one key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// Consumer key is blank
    #[error("consumer key must not be empty")]
    EmptyConsumerKey,

    /// Client prefix is blank
    #[error("client key prefix must not be empty")]
    EmptyClientPrefix,

    /// Consumer key falls inside the client key space
    #[error("consumer key {consumer_key:?} collides with client prefix {client_prefix:?}")]
    Overlap {
        /// Configured consumer key
        consumer_key: String,
        /// Configured client prefix
        client_prefix: String,
    },

    /// An auxiliary key falls inside a profile namespace
    #[error("key {0:?} is reserved for profile namespaces")]
    Reserved(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let io = StorageError::Io {
            key: "k".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk"),
        };
        assert!(io.is_transient());
        assert!(StorageError::Unavailable("down".to_string()).is_transient());
        assert!(!StorageError::Encryption { key: "k".to_string() }.is_transient());
    }

    #[test]
    fn key_error_display() {
        let err = KeyError::InvalidLength {
            expected: 32,
            actual: 3,
        };
        assert!(err.to_string().contains("32 bytes"));
    }
}
