//! AES primitives: CBC/PKCS#7 for the wire protocol, GCM for local secrets.

use std::fmt;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::defaults::{AES_IV_SIZE, AES_KEY_SIZE, GCM_NONCE_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Encrypts `plaintext` with AES-256-CBC and PKCS#7 padding.
#[must_use]
pub fn aes_cbc_encrypt(
    key: &[u8; AES_KEY_SIZE],
    iv: &[u8; AES_IV_SIZE],
    plaintext: &[u8],
) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypts AES-256-CBC ciphertext and strips PKCS#7 padding.
///
/// Returns `None` if the ciphertext length or the padding is invalid.
#[must_use]
pub fn aes_cbc_decrypt(
    key: &[u8; AES_KEY_SIZE],
    iv: &[u8; AES_IV_SIZE],
    ciphertext: &[u8],
) -> Option<Vec<u8>> {
    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .ok()
}

/// Generates a random AES-256 key and CBC IV for one envelope.
#[must_use]
pub fn random_key_and_iv() -> (Zeroizing<[u8; AES_KEY_SIZE]>, [u8; AES_IV_SIZE]) {
    let mut key = Zeroizing::new([0u8; AES_KEY_SIZE]);
    let mut iv = [0u8; AES_IV_SIZE];
    OsRng.fill_bytes(&mut *key);
    OsRng.fill_bytes(&mut iv);
    (key, iv)
}

/// Device-bound symmetric key for local-secret protection.
///
/// Carries the fixed GCM IV that older clients paired with the key; newer
/// blobs use a random nonce and ignore it.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    key: [u8; AES_KEY_SIZE],
    fixed_iv: [u8; GCM_NONCE_SIZE],
}

impl SymmetricKey {
    /// Serialized length: key followed by the fixed IV.
    pub const ENCODED_LEN: usize = AES_KEY_SIZE + GCM_NONCE_SIZE;

    /// Generates a random key and fixed IV.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; AES_KEY_SIZE];
        let mut fixed_iv = [0u8; GCM_NONCE_SIZE];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut fixed_iv);
        Self { key, fixed_iv }
    }

    /// Builds a key from raw parts.
    #[must_use]
    pub const fn from_parts(key: [u8; AES_KEY_SIZE], fixed_iv: [u8; GCM_NONCE_SIZE]) -> Self {
        Self { key, fixed_iv }
    }

    /// Parses the `key || fixed_iv` encoding produced by [`Self::to_bytes`].
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut key = [0u8; AES_KEY_SIZE];
        let mut fixed_iv = [0u8; GCM_NONCE_SIZE];
        key.copy_from_slice(&bytes[..AES_KEY_SIZE]);
        fixed_iv.copy_from_slice(&bytes[AES_KEY_SIZE..]);
        Some(Self { key, fixed_iv })
    }

    /// Encodes the key as `key || fixed_iv`. Treat the output as secret.
    #[must_use]
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(Self::ENCODED_LEN));
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&self.fixed_iv);
        out
    }

    /// The fixed IV paired with this key.
    #[must_use]
    pub const fn fixed_iv(&self) -> &[u8; GCM_NONCE_SIZE] {
        &self.fixed_iv
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new((&self.key).into())
    }

    /// AES-256-GCM encrypts `plaintext` under `nonce` (128-bit tag appended).
    ///
    /// # Errors
    ///
    /// Returns the AEAD error if encryption fails.
    pub fn gcm_seal(
        &self,
        nonce: &[u8; GCM_NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, aes_gcm::Error> {
        self.cipher().encrypt(Nonce::from_slice(nonce), plaintext)
    }

    /// Opens AES-256-GCM ciphertext sealed with [`Self::gcm_seal`].
    ///
    /// # Errors
    ///
    /// Returns the AEAD error if authentication fails.
    pub fn gcm_open(
        &self,
        nonce: &[u8; GCM_NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, aes_gcm::Error> {
        self.cipher().decrypt(Nonce::from_slice(nonce), ciphertext)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
