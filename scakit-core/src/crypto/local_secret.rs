//! Protection of small local secrets (PINs, passcodes) at rest.
//!
//! A secret is AES-256-GCM encrypted under a device-bound symmetric key held
//! by the [`SecretKeyStore`]. Blobs are Base64 text suitable for any
//! preferences store.
//!
//! Two blob layouts exist:
//!
//! - random nonce (default): `nonce(12) || ciphertext || tag(16)`
//! - fixed IV (legacy): `ciphertext || tag(16)`, nonce taken from the key entry
//!
//! [`LocalSecretProtector::reveal`] reads both.

use std::fmt;
use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use zeroize::Zeroizing;

use super::encoding::{base64_decode, base64_encode};
use super::symmetric::SymmetricKey;
use crate::defaults::{GCM_NONCE_SIZE, GCM_TAG_SIZE, LOCAL_SECRET_KEY_ALIAS};
use crate::error::{ScaError, ScaResult};
use crate::keystore::SecretKeyStore;

/// Nonce policy for newly protected secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[strum(serialize_all = "kebab-case")]
pub enum LocalSecretNonce {
    /// Fresh random nonce per blob, stored in front of the ciphertext.
    #[default]
    Random,
    /// The key entry's fixed IV, as written by older clients.
    FixedLegacy,
}

/// Base64 text produced by [`LocalSecretProtector::protect`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalSecretBlob(String);

impl LocalSecretBlob {
    /// The Base64 text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the blob, returning the Base64 text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for LocalSecretBlob {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for LocalSecretBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalSecretBlob")
            .field(&format_args!("{} chars", self.0.len()))
            .finish()
    }
}

/// Encrypts and decrypts local secrets with a store-held symmetric key.
pub struct LocalSecretProtector {
    store: Arc<dyn SecretKeyStore>,
    alias: String,
    nonce: LocalSecretNonce,
}

impl LocalSecretProtector {
    /// Creates a protector using the default key alias and nonce policy.
    #[must_use]
    pub fn new(store: Arc<dyn SecretKeyStore>) -> Self {
        Self {
            store,
            alias: LOCAL_SECRET_KEY_ALIAS.to_string(),
            nonce: LocalSecretNonce::default(),
        }
    }

    /// Uses `alias` for the symmetric key entry.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Sets the nonce policy for new blobs.
    #[must_use]
    pub const fn with_nonce(mut self, nonce: LocalSecretNonce) -> Self {
        self.nonce = nonce;
        self
    }

    /// Encrypts `secret`, creating the symmetric key on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if the key cannot be obtained, or
    /// [`ScaError::Encryption`] if encryption fails.
    pub fn protect(&self, secret: &SecretString) -> ScaResult<LocalSecretBlob> {
        let key = self.store.generate_or_get_symmetric_key(&self.alias)?;
        let plaintext = secret.expose_secret().as_bytes();

        let blob = match self.nonce {
            LocalSecretNonce::Random => {
                let mut nonce = [0u8; GCM_NONCE_SIZE];
                OsRng.fill_bytes(&mut nonce);
                let sealed = key
                    .gcm_seal(&nonce, plaintext)
                    .map_err(|_| ScaError::Encryption("local secret".to_string()))?;
                let mut out = Vec::with_capacity(GCM_NONCE_SIZE + sealed.len());
                out.extend_from_slice(&nonce);
                out.extend_from_slice(&sealed);
                out
            }
            LocalSecretNonce::FixedLegacy => key
                .gcm_seal(key.fixed_iv(), plaintext)
                .map_err(|_| ScaError::Encryption("local secret".to_string()))?,
        };
        Ok(LocalSecretBlob(base64_encode(&blob)))
    }

    /// Decrypts a blob produced by [`Self::protect`] under either nonce policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::DecryptionFailed`] for any malformed or tampered
    /// blob or when no key exists yet, or [`ScaError::KeyStore`] if the key
    /// cannot be read.
    pub fn reveal(&self, blob: &LocalSecretBlob) -> ScaResult<SecretString> {
        let key = self
            .store
            .get_symmetric_key(&self.alias)?
            .ok_or(ScaError::DecryptionFailed)?;
        let bytes = base64_decode(blob.as_str()).map_err(|_| ScaError::DecryptionFailed)?;

        let plaintext = open_random_nonce(&key, &bytes)
            .or_else(|| key.gcm_open(key.fixed_iv(), &bytes).ok())
            .map(Zeroizing::new)
            .ok_or(ScaError::DecryptionFailed)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| ScaError::DecryptionFailed)?;
        Ok(SecretString::from(text.to_owned()))
    }

    /// Deletes the symmetric key. Existing blobs become unreadable.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if deletion fails.
    pub fn forget(&self) -> ScaResult<()> {
        self.store.delete_entry(&self.alias)?;
        Ok(())
    }
}

fn open_random_nonce(key: &SymmetricKey, bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() < GCM_NONCE_SIZE + GCM_TAG_SIZE {
        return None;
    }
    let (nonce, sealed) = bytes.split_at(GCM_NONCE_SIZE);
    let nonce = <&[u8; GCM_NONCE_SIZE]>::try_from(nonce).ok()?;
    key.gcm_open(nonce, sealed).ok()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::keystore::MemoryKeyStore;

    fn protector(store: &Arc<MemoryKeyStore>) -> LocalSecretProtector {
        LocalSecretProtector::new(Arc::clone(store) as Arc<dyn SecretKeyStore>)
    }

    #[test_case(LocalSecretNonce::Random, ""; "random empty")]
    #[test_case(LocalSecretNonce::Random, "1234"; "random pin")]
    #[test_case(LocalSecretNonce::FixedLegacy, ""; "fixed empty")]
    #[test_case(LocalSecretNonce::FixedLegacy, "pass phrase ü"; "fixed unicode")]
    fn test_protect_reveal_round_trip(nonce: LocalSecretNonce, secret: &str) {
        let store = Arc::new(MemoryKeyStore::new());
        let protector = protector(&store).with_nonce(nonce);
        let blob = protector
            .protect(&SecretString::from(secret.to_string()))
            .unwrap();
        let revealed = protector.reveal(&blob).unwrap();
        assert_eq!(revealed.expose_secret(), secret);
    }

    #[test]
    fn test_random_nonce_blobs_differ() {
        let store = Arc::new(MemoryKeyStore::new());
        let protector = protector(&store);
        let secret = SecretString::from("1234".to_string());
        let first = protector.protect(&secret).unwrap();
        let second = protector.protect(&secret).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_fixed_iv_blob_readable_by_default_protector() {
        let store = Arc::new(MemoryKeyStore::new());
        let legacy = protector(&store).with_nonce(LocalSecretNonce::FixedLegacy);
        let blob = legacy
            .protect(&SecretString::from("0000".to_string()))
            .unwrap();
        let revealed = protector(&store).reveal(&blob).unwrap();
        assert_eq!(revealed.expose_secret(), "0000");
    }

    #[test]
    fn test_tampered_blob_fails() {
        let store = Arc::new(MemoryKeyStore::new());
        let protector = protector(&store);
        let blob = protector
            .protect(&SecretString::from("1234".to_string()))
            .unwrap();
        let mut bytes = base64_decode(blob.as_str()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let tampered = LocalSecretBlob::from(base64_encode(&bytes));
        assert!(matches!(
            protector.reveal(&tampered),
            Err(ScaError::DecryptionFailed)
        ));
        assert!(matches!(
            protector.reveal(&LocalSecretBlob::from("%%%".to_string())),
            Err(ScaError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_forget_makes_blobs_unreadable() {
        let store = Arc::new(MemoryKeyStore::new());
        let protector = protector(&store);
        let blob = protector
            .protect(&SecretString::from("1234".to_string()))
            .unwrap();
        protector.forget().unwrap();
        assert!(matches!(
            protector.reveal(&blob),
            Err(ScaError::DecryptionFailed)
        ));
        // revealing must not mint a replacement key
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_blob_debug_hides_content() {
        let blob = LocalSecretBlob::from("c2VjcmV0".to_string());
        assert_eq!(format!("{blob:?}"), "LocalSecretBlob(8 chars)");
    }

    #[test]
    fn test_nonce_policy_parses() {
        assert_eq!(
            "fixed-legacy".parse::<LocalSecretNonce>().unwrap(),
            LocalSecretNonce::FixedLegacy
        );
        assert_eq!(LocalSecretNonce::Random.to_string(), "random");
    }
}
