//! Hybrid RSA + AES envelope scheme spoken with the server.
//!
//! Sealing draws a random AES-256 key and 128-bit IV, encrypts the payload
//! with AES-256-CBC/PKCS#7, then RSA-encrypts (PKCS#1 v1.5) the raw key and
//! the raw IV separately under the peer's public key. All three outputs are
//! Base64 without line breaks.
//!
//! Opening reverses the steps with the connection's private key. Every
//! failure collapses into [`DecryptionFailed`]; callers never learn which
//! step rejected the input.

use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use thiserror::Error;

use super::asymmetric::{unwrap_secret, wrap_secret};
use super::encoding::{base64_decode, base64_encode};
use super::symmetric::{aes_cbc_decrypt, aes_cbc_encrypt, random_key_and_iv};
use crate::defaults::{AES_IV_SIZE, AES_KEY_SIZE};
use crate::envelope::{EncryptedEnvelope, EnvelopeFormat};
use crate::error::{ScaError, ScaResult};

/// The three Base64 wire fields of a hybrid envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedParts {
    /// RSA-wrapped AES key.
    pub wrapped_key: String,
    /// RSA-wrapped AES IV.
    pub wrapped_iv: String,
    /// AES-CBC ciphertext.
    pub ciphertext: String,
}

/// Opaque outcome of any failed open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("decryption failed")]
pub struct DecryptionFailed;

impl From<DecryptionFailed> for ScaError {
    fn from(_: DecryptionFailed) -> Self {
        Self::DecryptionFailed
    }
}

/// Opens sealed envelope parts. Implemented by [`HybridCryptoEngine`].
pub trait EnvelopeCipher: Send + Sync {
    /// Recovers the plaintext JSON carried by `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptionFailed`] if any step fails.
    fn open_parts(
        &self,
        parts: &SealedParts,
        private_key: &RsaPrivateKey,
    ) -> Result<String, DecryptionFailed>;
}

/// Stateless implementation of the hybrid scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridCryptoEngine;

impl HybridCryptoEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Seals `plaintext` for the holder of `peer`'s private key.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::Encryption`] if RSA wrapping fails.
    pub fn seal(&self, plaintext: &[u8], peer: &RsaPublicKey) -> ScaResult<SealedParts> {
        let (key, iv) = random_key_and_iv();
        self.seal_with(&key, &iv, plaintext, peer)
    }

    pub(crate) fn seal_with(
        &self,
        key: &[u8; AES_KEY_SIZE],
        iv: &[u8; AES_IV_SIZE],
        plaintext: &[u8],
        peer: &RsaPublicKey,
    ) -> ScaResult<SealedParts> {
        let ciphertext = aes_cbc_encrypt(key, iv, plaintext);
        let wrapped_key = wrap_secret(peer, key)
            .map_err(|err| ScaError::Encryption(format!("wrapping key: {err}")))?;
        let wrapped_iv = wrap_secret(peer, iv)
            .map_err(|err| ScaError::Encryption(format!("wrapping iv: {err}")))?;
        Ok(SealedParts {
            wrapped_key: base64_encode(&wrapped_key),
            wrapped_iv: base64_encode(&wrapped_iv),
            ciphertext: base64_encode(&ciphertext),
        })
    }

    /// Opens sealed parts with the connection's private key.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptionFailed`] if any Base64, RSA or AES step fails, or
    /// if the plaintext is not UTF-8 JSON.
    pub fn open(
        &self,
        parts: &SealedParts,
        private_key: &RsaPrivateKey,
    ) -> Result<String, DecryptionFailed> {
        let wrapped_key = base64_decode(&parts.wrapped_key).map_err(|_| DecryptionFailed)?;
        let wrapped_iv = base64_decode(&parts.wrapped_iv).map_err(|_| DecryptionFailed)?;
        let ciphertext = base64_decode(&parts.ciphertext).map_err(|_| DecryptionFailed)?;

        let key = unwrap_secret(private_key, &wrapped_key, AES_KEY_SIZE).ok_or(DecryptionFailed)?;
        let iv = unwrap_secret(private_key, &wrapped_iv, AES_IV_SIZE).ok_or(DecryptionFailed)?;
        let key = <&[u8; AES_KEY_SIZE]>::try_from(key.as_slice()).map_err(|_| DecryptionFailed)?;
        let iv = <&[u8; AES_IV_SIZE]>::try_from(iv.as_slice()).map_err(|_| DecryptionFailed)?;

        let plaintext = aes_cbc_decrypt(key, iv, &ciphertext).ok_or(DecryptionFailed)?;
        let text = String::from_utf8(plaintext).map_err(|_| DecryptionFailed)?;
        // A correct key always yields the JSON document the server encrypted.
        serde_json::from_str::<serde::de::IgnoredAny>(&text).map_err(|_| DecryptionFailed)?;
        Ok(text)
    }

    /// Serializes `payload` to JSON and seals it into a complete envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::Encryption`] if serialization or sealing fails.
    pub fn seal_envelope<P: Serialize>(
        &self,
        id: &str,
        connection_id: &str,
        payload: &P,
        peer: &RsaPublicKey,
        format: EnvelopeFormat,
    ) -> ScaResult<EncryptedEnvelope> {
        let json = serde_json::to_vec(payload)
            .map_err(|err| ScaError::Encryption(format!("serializing payload: {err}")))?;
        let parts = self.seal(&json, peer)?;
        Ok(EncryptedEnvelope::from_parts(id, connection_id, parts, format))
    }
}

impl EnvelopeCipher for HybridCryptoEngine {
    fn open_parts(
        &self,
        parts: &SealedParts,
        private_key: &RsaPrivateKey,
    ) -> Result<String, DecryptionFailed> {
        self.open(parts, private_key)
    }
}
