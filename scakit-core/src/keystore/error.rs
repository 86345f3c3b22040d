//! Error types for key store backends.

use thiserror::Error;

/// Result type for key store operations.
pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Errors raised by [`super::SecretKeyStore`] implementations.
///
/// Also the error type foreign key stores return across the FFI boundary.
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum KeyStoreError {
    /// The platform keystore refused or failed the operation.
    #[error("keystore error: {0}")]
    Backend(String),

    /// Filesystem failures in file-backed stores.
    #[error("keystore io error: {0}")]
    Io(String),

    /// A store-internal lock was poisoned or could not be taken.
    #[error("keystore lock error: {0}")]
    Lock(String),

    /// An entry exists but its contents cannot be parsed.
    #[error("corrupted keystore entry `{alias}`: {reason}")]
    CorruptedEntry {
        /// Alias of the unreadable entry.
        alias: String,
        /// What failed to parse.
        reason: String,
    },

    /// Key pair generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The alias is empty or otherwise unusable as an entry name.
    #[error("invalid alias: {0:?}")]
    InvalidAlias(String),
}

#[cfg(feature = "ffi")]
impl From<uniffi::UnexpectedUniFFICallbackError> for KeyStoreError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Backend(error.reason)
    }
}

impl KeyStoreError {
    pub(crate) fn corrupted(alias: &str, reason: impl Into<String>) -> Self {
        Self::CorruptedEntry {
            alias: alias.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejects aliases no backend can store.
pub(crate) fn check_alias(alias: &str) -> KeyStoreResult<()> {
    if alias.trim().is_empty() {
        return Err(KeyStoreError::InvalidAlias(alias.to_string()));
    }
    Ok(())
}
