//! Lifecycle of per-connection RSA key pairs.
//!
//! Every bank connection owns exactly one key pair, stored under the
//! connection GUID. Re-enrolling a connection replaces the pair: a new one
//! is generated over the old entry while the alias lock is held, so no
//! reader ever sees two pairs for one alias, and a failed generation leaves
//! the old pair in place.

mod lock;

use std::collections::BTreeSet;
use std::sync::Arc;

pub use lock::AliasLockManager;

use crate::config::EngineConfig;
use crate::connection::{Connection, ConnectionKeyContext};
use crate::crypto::encoding::parse_public_key;
use crate::crypto::RsaKeyPair;
use crate::error::{ScaError, ScaResult};
use crate::keystore::{KeyStoreError, SecretKeyStore};

/// Creates, looks up and deletes connection key pairs in a [`SecretKeyStore`].
pub struct KeyLifecycleManager {
    store: Arc<dyn SecretKeyStore>,
    locks: AliasLockManager,
    config: EngineConfig,
}

impl KeyLifecycleManager {
    /// Creates a manager over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::InvalidConfig`] if `config` does not validate.
    pub fn new(store: Arc<dyn SecretKeyStore>, config: EngineConfig) -> ScaResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            locks: AliasLockManager::new(),
            config,
        })
    }

    /// The configuration the manager was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying key store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn SecretKeyStore> {
        Arc::clone(&self.store)
    }

    /// Replaces any pair under `alias` with a freshly generated one of the
    /// configured size.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if generation fails, or
    /// [`ScaError::InvalidKeyMaterial`] if the store hands back a key below
    /// the configured size.
    pub fn create_or_replace_key_pair(&self, alias: &str) -> ScaResult<RsaKeyPair> {
        self.locks.with_alias_lock(alias, || {
            let pair = self
                .store
                .generate_asymmetric_key_pair(alias, self.config.rsa_key_bits)?;
            if pair.bits() < self.config.rsa_key_bits {
                // never keep an undersized pair around
                self.store.delete_entry(alias)?;
                return Err(ScaError::InvalidKeyMaterial(format!(
                    "key store generated a {}-bit key, expected {}",
                    pair.bits(),
                    self.config.rsa_key_bits
                )));
            }
            log::info!("created key pair for connection {alias}");
            Ok(pair)
        })
    }

    /// Whether a pair exists under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if the store fails, or
    /// [`ScaError::InvalidKeyMaterial`] if the stored pair is unreadable.
    pub fn key_pair_exists(&self, alias: &str) -> ScaResult<bool> {
        Ok(self.get_key_pair(alias)?.is_some())
    }

    /// Aliases of all stored pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if the store fails.
    pub fn list_aliases(&self) -> ScaResult<BTreeSet<String>> {
        Ok(self.store.list_aliases()?.into_iter().collect())
    }

    /// The pair under `alias`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if the store fails, or
    /// [`ScaError::InvalidKeyMaterial`] if the stored pair is unreadable.
    pub fn get_key_pair(&self, alias: &str) -> ScaResult<Option<RsaKeyPair>> {
        self.store
            .get_asymmetric_key_pair(alias)
            .map_err(|err| match err {
                KeyStoreError::CorruptedEntry { alias, reason } => ScaError::InvalidKeyMaterial(
                    format!("stored key pair for {alias} is unreadable: {reason}"),
                ),
                other => other.into(),
            })
    }

    /// The public half under `alias` as an SPKI PEM block.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] or [`ScaError::InvalidKeyMaterial`] on failure.
    pub fn public_key_pem(&self, alias: &str) -> ScaResult<Option<String>> {
        self.get_key_pair(alias)?
            .map(|pair| pair.public_key_pem())
            .transpose()
    }

    /// Deletes the pair under `alias`. Missing aliases are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if the store fails.
    pub fn delete_key_pair(&self, alias: &str) -> ScaResult<()> {
        self.locks.with_alias_lock(alias, || {
            self.store.delete_entry(alias)?;
            log::debug!("deleted key pair for connection {alias}");
            Ok(())
        })?;
        self.locks.release(alias)
    }

    /// Deletes every pair in `aliases`, stopping at the first store failure.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyStore`] if the store fails.
    pub fn delete_key_pairs<I, S>(&self, aliases: I) -> ScaResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        aliases
            .into_iter()
            .try_for_each(|alias| self.delete_key_pair(alias.as_ref()))
    }

    /// Builds the key context for a connection.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyNotAvailable`] if no pair is stored for the
    /// connection, or [`ScaError::InvalidKeyMaterial`] if the stored pair or
    /// the provider key cannot be parsed.
    pub fn resolve_connection_key_context(
        &self,
        connection: &Connection,
    ) -> ScaResult<ConnectionKeyContext> {
        let pair = self
            .get_key_pair(&connection.guid)?
            .ok_or_else(|| ScaError::KeyNotAvailable(connection.guid.clone()))?;
        let peer_public_key = connection
            .provider_public_key_pem
            .as_deref()
            .map(parse_public_key)
            .transpose()?;

        Ok(ConnectionKeyContext {
            connection_id: connection.guid.clone(),
            private_key: Some(pair.into_private_key()),
            peer_public_key,
        })
    }
}
