//! Shared fixtures for unit tests.
//!
//! RSA generation is slow in debug builds, so tests share a small pool of
//! keys generated once per process.

#![allow(clippy::new_without_default)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use rsa::RsaPrivateKey;

use crate::crypto::{
    DecryptionFailed, EnvelopeCipher, HybridCryptoEngine, RsaKeyPair, SealedParts, SymmetricKey,
};
use crate::keystore::{KeyStoreError, KeyStoreResult, MemoryKeyStore, SecretKeyStore};

const POOL_KEY_BITS: usize = 2048;

fn key_pool() -> &'static [RsaKeyPair; 2] {
    static POOL: OnceLock<[RsaKeyPair; 2]> = OnceLock::new();
    POOL.get_or_init(|| {
        [
            RsaKeyPair::generate(POOL_KEY_BITS).expect("fixture key"),
            RsaKeyPair::generate(POOL_KEY_BITS).expect("fixture key"),
        ]
    })
}

/// A cached 2048-bit key pair.
pub fn fixture_key_pair() -> &'static RsaKeyPair {
    &key_pool()[0]
}

/// A second cached key pair, distinct from [`fixture_key_pair`].
pub fn other_key_pair() -> &'static RsaKeyPair {
    &key_pool()[1]
}

/// Memory store that hands out pooled keys instead of generating new ones.
///
/// Consecutive generations for the same store alternate between the two
/// fixture pairs, so a replacement always yields a different pair. Requests
/// for any other size fail like a backend that cannot generate them, unless
/// the store was built with [`FixtureKeyStore::ignoring_key_size`].
pub struct FixtureKeyStore {
    inner: MemoryKeyStore,
    next: AtomicUsize,
    requested_bits: Mutex<Vec<usize>>,
    enforce_key_size: bool,
}

impl FixtureKeyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryKeyStore::new(),
            next: AtomicUsize::new(0),
            requested_bits: Mutex::new(Vec::new()),
            enforce_key_size: true,
        }
    }

    /// A store that hands out 2048-bit pairs whatever size was asked for.
    pub fn ignoring_key_size() -> Self {
        Self {
            enforce_key_size: false,
            ..Self::new()
        }
    }

    /// Key sizes passed to generation, in call order.
    pub fn requested_bits(&self) -> Vec<usize> {
        self.requested_bits.lock().expect("requested bits").clone()
    }
}

impl SecretKeyStore for FixtureKeyStore {
    fn generate_asymmetric_key_pair(
        &self,
        alias: &str,
        bits: usize,
    ) -> KeyStoreResult<RsaKeyPair> {
        self.requested_bits.lock().expect("requested bits").push(bits);
        if self.enforce_key_size && bits != POOL_KEY_BITS {
            return Err(KeyStoreError::KeyGeneration(format!(
                "no {bits}-bit fixture key"
            )));
        }
        let index = self.next.fetch_add(1, Ordering::SeqCst) % key_pool().len();
        let pair = key_pool()[index].clone();
        self.inner.insert_key_pair(alias, pair.clone())?;
        Ok(pair)
    }

    fn get_asymmetric_key_pair(&self, alias: &str) -> KeyStoreResult<Option<RsaKeyPair>> {
        self.inner.get_asymmetric_key_pair(alias)
    }

    fn delete_entry(&self, alias: &str) -> KeyStoreResult<()> {
        self.inner.delete_entry(alias)
    }

    fn list_aliases(&self) -> KeyStoreResult<Vec<String>> {
        self.inner.list_aliases()
    }

    fn generate_or_get_symmetric_key(&self, alias: &str) -> KeyStoreResult<SymmetricKey> {
        self.inner.generate_or_get_symmetric_key(alias)
    }

    fn get_symmetric_key(&self, alias: &str) -> KeyStoreResult<Option<SymmetricKey>> {
        self.inner.get_symmetric_key(alias)
    }
}

/// Cipher that records how often it was asked to open an envelope.
#[derive(Default)]
pub struct CountingCipher {
    calls: AtomicUsize,
    opened: Mutex<Vec<String>>,
}

impl CountingCipher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ciphertexts seen, in call order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened").clone()
    }
}

impl EnvelopeCipher for CountingCipher {
    fn open_parts(
        &self,
        parts: &SealedParts,
        private_key: &RsaPrivateKey,
    ) -> Result<String, DecryptionFailed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.opened
            .lock()
            .expect("opened")
            .push(parts.ciphertext.clone());
        HybridCryptoEngine::new().open(parts, private_key)
    }
}
