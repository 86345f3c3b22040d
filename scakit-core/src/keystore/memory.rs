//! In-memory key store.
//!
//! Keys live only for the lifetime of the process. Used by tests and by
//! hosts that manage persistence themselves.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{check_alias, KeyStoreError, KeyStoreResult, SecretKeyStore};
use crate::crypto::{RsaKeyPair, SymmetricKey};

enum Entry {
    KeyPair(RsaKeyPair),
    Symmetric(SymmetricKey),
}

/// Process-local [`SecretKeyStore`].
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Stores an existing key pair under `alias`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias is invalid or the lock is poisoned.
    pub fn insert_key_pair(&self, alias: &str, pair: RsaKeyPair) -> KeyStoreResult<()> {
        check_alias(alias)?;
        self.write()?.insert(alias.to_string(), Entry::KeyPair(pair));
        Ok(())
    }

    /// Number of entries of either kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> KeyStoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store holds no entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> KeyStoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> KeyStoreResult<RwLockReadGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .read()
            .map_err(|e| KeyStoreError::Lock(format!("entries poisoned: {e}")))
    }

    fn write(&self) -> KeyStoreResult<RwLockWriteGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .write()
            .map_err(|e| KeyStoreError::Lock(format!("entries poisoned: {e}")))
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretKeyStore for MemoryKeyStore {
    fn generate_asymmetric_key_pair(
        &self,
        alias: &str,
        bits: usize,
    ) -> KeyStoreResult<RsaKeyPair> {
        check_alias(alias)?;
        let pair = RsaKeyPair::generate(bits)
            .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
        self.write()?
            .insert(alias.to_string(), Entry::KeyPair(pair.clone()));
        Ok(pair)
    }

    fn get_asymmetric_key_pair(&self, alias: &str) -> KeyStoreResult<Option<RsaKeyPair>> {
        match self.read()?.get(alias) {
            Some(Entry::KeyPair(pair)) => Ok(Some(pair.clone())),
            Some(Entry::Symmetric(_)) | None => Ok(None),
        }
    }

    fn delete_entry(&self, alias: &str) -> KeyStoreResult<()> {
        self.write()?.remove(alias);
        Ok(())
    }

    fn list_aliases(&self) -> KeyStoreResult<Vec<String>> {
        let mut aliases: Vec<String> = self
            .read()?
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::KeyPair(_)))
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        Ok(aliases)
    }

    fn generate_or_get_symmetric_key(&self, alias: &str) -> KeyStoreResult<SymmetricKey> {
        check_alias(alias)?;
        let mut entries = self.write()?;
        match entries.get(alias) {
            Some(Entry::Symmetric(key)) => Ok(key.clone()),
            Some(Entry::KeyPair(_)) => Err(KeyStoreError::corrupted(
                alias,
                "alias holds a key pair, not a symmetric key",
            )),
            None => {
                let key = SymmetricKey::generate();
                entries.insert(alias.to_string(), Entry::Symmetric(key.clone()));
                Ok(key)
            }
        }
    }

    fn get_symmetric_key(&self, alias: &str) -> KeyStoreResult<Option<SymmetricKey>> {
        match self.read()?.get(alias) {
            Some(Entry::Symmetric(key)) => Ok(Some(key.clone())),
            Some(Entry::KeyPair(_)) => Err(KeyStoreError::corrupted(
                alias,
                "alias holds a key pair, not a symmetric key",
            )),
            None => Ok(None),
        }
    }
}
