use thiserror::Error;

use crate::keystore::KeyStoreError;

/// Result type for engine operations.
pub type ScaResult<T, E = ScaError> = std::result::Result<T, E>;

/// Error outputs from `SCAKit`.
///
/// The first five variants are the protocol taxonomy callers branch on.
/// `DecryptionFailed` and `KeyNotAvailable` should both surface to users as a
/// generic "could not process secure data" message.
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum ScaError {
    /// The envelope is structurally invalid; no cryptography was attempted.
    #[error("malformed_envelope: {0}")]
    MalformedEnvelope(String),
    /// No usable private key exists for the connection.
    #[error("key_not_available: {0}")]
    KeyNotAvailable(String),
    /// The envelope could not be decrypted. Deliberately carries no detail.
    #[error("decryption_failed")]
    DecryptionFailed,
    /// Stored or received key material could not be parsed.
    #[error("invalid_key_material: {0}")]
    InvalidKeyMaterial(String),
    /// Decryption succeeded but the plaintext has the wrong shape.
    #[error("malformed_payload: {0}")]
    MalformedPayload(String),
    /// Sealing a payload for the server failed.
    #[error("encryption_error: {0}")]
    Encryption(String),
    /// The engine configuration is not acceptable.
    #[error("invalid_config: {0}")]
    InvalidConfig(String),
    /// The key store backend failed.
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
}

impl ScaError {
    /// Returns `true` for failures that should be presented as
    /// "could not process secure data" without further detail.
    #[must_use]
    pub const fn is_opaque_to_user(&self) -> bool {
        matches!(self, Self::DecryptionFailed | Self::KeyNotAvailable(_))
    }

    /// Message-free label of the variant, safe to log.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) => "malformed_envelope",
            Self::KeyNotAvailable(_) => "key_not_available",
            Self::DecryptionFailed => "decryption_failed",
            Self::InvalidKeyMaterial(_) => "invalid_key_material",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Encryption(_) => "encryption_error",
            Self::InvalidConfig(_) => "invalid_config",
            Self::KeyStore(_) => "keystore_error",
        }
    }
}
