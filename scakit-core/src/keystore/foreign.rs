//! Key storage provided by the host platform.
//!
//! Mobile hosts persist entries in their secure storage (Android Keystore
//! wrapped blobs, iOS Keychain items) and expose them through
//! [`ForeignKeyStore`]. Key generation stays in Rust; the host only stores
//! opaque bytes:
//!
//! - key pairs as PKCS#8 DER
//! - symmetric keys as `key || fixed_iv`

use std::sync::{Arc, Mutex};

use super::{check_alias, KeyStoreError, KeyStoreResult, SecretKeyStore};
use crate::crypto::{RsaKeyPair, SymmetricKey};

/// Kind of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum KeyEntryKind {
    /// RSA key pair of a connection.
    KeyPair,
    /// Device-bound symmetric key.
    Symmetric,
}

/// Secure byte storage implemented by the host app.
///
/// Entries are addressed by alias and kind. Writes replace existing entries.
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait ForeignKeyStore: Send + Sync {
    /// Returns the entry's bytes, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform store fails.
    fn read_entry(
        &self,
        alias: String,
        kind: KeyEntryKind,
    ) -> Result<Option<Vec<u8>>, KeyStoreError>;

    /// Stores `bytes` under `alias`, replacing any previous entry of that kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform store fails.
    fn write_entry(
        &self,
        alias: String,
        kind: KeyEntryKind,
        bytes: Vec<u8>,
    ) -> Result<(), KeyStoreError>;

    /// Deletes all entries under `alias`. Missing aliases are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform store fails.
    fn delete_entry(&self, alias: String) -> Result<(), KeyStoreError>;

    /// Lists aliases holding an entry of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform store fails.
    fn list_aliases(&self, kind: KeyEntryKind) -> Result<Vec<String>, KeyStoreError>;
}

/// Adapts a [`ForeignKeyStore`] into a [`SecretKeyStore`].
pub struct ForeignKeyStoreAdapter {
    inner: Arc<dyn ForeignKeyStore>,
    create_lock: Mutex<()>,
}

impl ForeignKeyStoreAdapter {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn ForeignKeyStore>) -> Self {
        Self {
            inner,
            create_lock: Mutex::new(()),
        }
    }
}

impl SecretKeyStore for ForeignKeyStoreAdapter {
    fn generate_asymmetric_key_pair(
        &self,
        alias: &str,
        bits: usize,
    ) -> KeyStoreResult<RsaKeyPair> {
        check_alias(alias)?;
        let pair = RsaKeyPair::generate(bits)
            .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
        let der = pair
            .to_pkcs8_der()
            .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
        self.inner
            .write_entry(alias.to_string(), KeyEntryKind::KeyPair, der.to_vec())?;
        Ok(pair)
    }

    fn get_asymmetric_key_pair(&self, alias: &str) -> KeyStoreResult<Option<RsaKeyPair>> {
        let Some(der) = self
            .inner
            .read_entry(alias.to_string(), KeyEntryKind::KeyPair)?
        else {
            return Ok(None);
        };
        RsaKeyPair::from_pkcs8_der(&der)
            .map(Some)
            .map_err(|e| KeyStoreError::corrupted(alias, e.to_string()))
    }

    fn delete_entry(&self, alias: &str) -> KeyStoreResult<()> {
        self.inner.delete_entry(alias.to_string())
    }

    fn list_aliases(&self) -> KeyStoreResult<Vec<String>> {
        let mut aliases = self.inner.list_aliases(KeyEntryKind::KeyPair)?;
        aliases.sort();
        aliases.dedup();
        Ok(aliases)
    }

    fn generate_or_get_symmetric_key(&self, alias: &str) -> KeyStoreResult<SymmetricKey> {
        check_alias(alias)?;
        let _guard = self
            .create_lock
            .lock()
            .map_err(|e| KeyStoreError::Lock(format!("create lock poisoned: {e}")))?;

        if let Some(key) = self.get_symmetric_key(alias)? {
            return Ok(key);
        }
        let key = SymmetricKey::generate();
        self.inner
            .write_entry(alias.to_string(), KeyEntryKind::Symmetric, key.to_bytes().to_vec())?;
        Ok(key)
    }

    fn get_symmetric_key(&self, alias: &str) -> KeyStoreResult<Option<SymmetricKey>> {
        let Some(bytes) = self
            .inner
            .read_entry(alias.to_string(), KeyEntryKind::Symmetric)?
        else {
            return Ok(None);
        };
        SymmetricKey::from_bytes(&bytes)
            .map(Some)
            .ok_or_else(|| KeyStoreError::corrupted(alias, "unexpected symmetric key length"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::fixture_key_pair;

    /// Host store double keeping entries in a map.
    #[derive(Default)]
    struct HostStore {
        entries: Mutex<HashMap<(String, KeyEntryKind), Vec<u8>>>,
    }

    impl ForeignKeyStore for HostStore {
        fn read_entry(
            &self,
            alias: String,
            kind: KeyEntryKind,
        ) -> Result<Option<Vec<u8>>, KeyStoreError> {
            Ok(self.entries.lock().unwrap().get(&(alias, kind)).cloned())
        }

        fn write_entry(
            &self,
            alias: String,
            kind: KeyEntryKind,
            bytes: Vec<u8>,
        ) -> Result<(), KeyStoreError> {
            self.entries.lock().unwrap().insert((alias, kind), bytes);
            Ok(())
        }

        fn delete_entry(&self, alias: String) -> Result<(), KeyStoreError> {
            self.entries.lock().unwrap().retain(|(a, _), _| *a != alias);
            Ok(())
        }

        fn list_aliases(&self, kind: KeyEntryKind) -> Result<Vec<String>, KeyStoreError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .keys()
                .filter(|(_, k)| *k == kind)
                .map(|(alias, _)| alias.clone())
                .collect())
        }
    }

    fn adapter() -> (Arc<HostStore>, ForeignKeyStoreAdapter) {
        let host = Arc::new(HostStore::default());
        let adapter = ForeignKeyStoreAdapter::new(Arc::clone(&host) as Arc<dyn ForeignKeyStore>);
        (host, adapter)
    }

    #[test]
    fn test_reads_key_pair_written_by_host() {
        let (host, adapter) = adapter();
        let der = fixture_key_pair().to_pkcs8_der().unwrap();
        host.write_entry("conn".to_string(), KeyEntryKind::KeyPair, der.to_vec())
            .unwrap();

        let pair = adapter.get_asymmetric_key_pair("conn").unwrap().unwrap();
        assert_eq!(&pair, fixture_key_pair());
        assert_eq!(adapter.list_aliases().unwrap(), vec!["conn"]);
        assert!(adapter.get_asymmetric_key_pair("other").unwrap().is_none());
    }

    #[test]
    fn test_symmetric_key_created_once() {
        let (host, adapter) = adapter();
        assert!(adapter.get_symmetric_key("local").unwrap().is_none());
        assert!(host.entries.lock().unwrap().is_empty());

        let first = adapter.generate_or_get_symmetric_key("local").unwrap();
        let second = adapter.generate_or_get_symmetric_key("local").unwrap();
        assert_eq!(first, second);
        assert!(adapter.list_aliases().unwrap().is_empty());

        adapter.delete_entry("local").unwrap();
        assert!(host
            .read_entry("local".to_string(), KeyEntryKind::Symmetric)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_garbage_entries_are_corrupted() {
        let (host, adapter) = adapter();
        host.write_entry("conn".to_string(), KeyEntryKind::KeyPair, vec![1, 2, 3])
            .unwrap();
        host.write_entry("local".to_string(), KeyEntryKind::Symmetric, vec![0; 8])
            .unwrap();
        assert!(matches!(
            adapter.get_asymmetric_key_pair("conn"),
            Err(KeyStoreError::CorruptedEntry { .. })
        ));
        assert!(matches!(
            adapter.generate_or_get_symmetric_key("local"),
            Err(KeyStoreError::CorruptedEntry { .. })
        ));
    }
}
