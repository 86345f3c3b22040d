//! Secure key storage abstraction.
//!
//! The engine depends on the platform's secure storage through
//! [`SecretKeyStore`]. Each platform provides its own backend:
//!
//! - Android / iOS: the host's Keystore or Keychain, reached through
//!   [`ForeignKeyStore`] and [`ForeignKeyStoreAdapter`]
//! - Desktop / CLI: [`FsKeyStore`], PEM files in an application directory
//! - Tests: [`MemoryKeyStore`]
//!
//! Key material only leaves the store transiently, for the duration of one
//! cryptographic operation.

mod error;
mod foreign;
#[cfg(not(target_arch = "wasm32"))]
pub mod fs;
pub mod memory;

pub use error::{KeyStoreError, KeyStoreResult};
pub use foreign::{ForeignKeyStore, ForeignKeyStoreAdapter, KeyEntryKind};
#[cfg(not(target_arch = "wasm32"))]
pub use fs::FsKeyStore;
pub use memory::MemoryKeyStore;

pub(crate) use error::check_alias;

use crate::crypto::{RsaKeyPair, SymmetricKey};

/// Alias-indexed storage for connection key pairs and device-bound symmetric keys.
///
/// An alias maps to at most one entry. Implementations must be safe to call
/// from any thread; serializing replacement of a single alias is the
/// caller's job (see [`crate::keys::AliasLockManager`]).
pub trait SecretKeyStore: Send + Sync {
    /// Generates a `bits`-bit RSA key pair and stores it under `alias`,
    /// replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if generation or persistence fails.
    fn generate_asymmetric_key_pair(
        &self,
        alias: &str,
        bits: usize,
    ) -> KeyStoreResult<RsaKeyPair>;

    /// Returns the key pair stored under `alias`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be read.
    fn get_asymmetric_key_pair(&self, alias: &str) -> KeyStoreResult<Option<RsaKeyPair>>;

    /// Deletes whatever is stored under `alias`. Deleting a missing alias succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to delete.
    fn delete_entry(&self, alias: &str) -> KeyStoreResult<()>;

    /// Lists the aliases that hold an asymmetric key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot enumerate entries.
    fn list_aliases(&self) -> KeyStoreResult<Vec<String>>;

    /// Returns the symmetric key under `alias`, generating it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be read or created.
    fn generate_or_get_symmetric_key(&self, alias: &str) -> KeyStoreResult<SymmetricKey>;

    /// Returns the symmetric key under `alias` without creating one.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be read.
    fn get_symmetric_key(&self, alias: &str) -> KeyStoreResult<Option<SymmetricKey>>;
}
