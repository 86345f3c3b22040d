//! `scakit-core` is the cryptographic core of a strong-customer-authentication
//! client.
//!
//! It manages one RSA key pair per bank connection, opens the hybrid
//! RSA + AES envelopes the bank's server sends (authorizations, consents,
//! action results), seals payloads going the other way, and protects short
//! local secrets such as passcodes.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use scakit_core::{Connection, EngineConfig, MemoryKeyStore, PayloadKind, ScaEngine};
//!
//! # fn main() -> Result<(), scakit_core::ScaError> {
//! let engine = ScaEngine::with_store(Arc::new(MemoryKeyStore::new()), EngineConfig::default())?;
//! let public_pem = engine.create_or_replace_key_pair("connection-guid")?;
//! // send `public_pem` to the bank during enrollment, then later:
//! # let envelope_json = "{}";
//! let payload = engine.decode(
//!     &Connection::new("connection-guid"),
//!     envelope_json,
//!     PayloadKind::Authorization,
//! )?;
//! # let _ = (public_pem, payload);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub use config::EngineConfig;

pub mod connection;
pub use connection::{Connection, ConnectionKeyContext};

pub mod crypto;
pub use crypto::{
    DecryptionFailed, EnvelopeCipher, HybridCryptoEngine, LocalSecretBlob, LocalSecretNonce,
    LocalSecretProtector, RsaKeyPair, SealedParts, SignedRequest, SymmetricKey,
};

pub mod decoder;
pub use decoder::PayloadDecoder;

pub mod defaults;

mod engine;
pub use engine::{EngineOptions, ScaEngine};

pub mod envelope;
pub use envelope::{EncryptedEnvelope, EnvelopeFormat};

mod error;
pub use error::{ScaError, ScaResult};

pub mod keys;
pub use keys::{AliasLockManager, KeyLifecycleManager};

pub mod keystore;
#[cfg(not(target_arch = "wasm32"))]
pub use keystore::FsKeyStore;
pub use keystore::{
    ForeignKeyStore, KeyEntryKind, KeyStoreError, KeyStoreResult, MemoryKeyStore, SecretKeyStore,
};

pub mod logger;

pub mod payload;
pub use payload::{
    ActionResultPayload, AuthorizationPayload, ConsentPayload, DecryptedPayload, EnvelopePayload,
    PayloadKind,
};

#[cfg(test)]
mod test_support;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("scakit_core");
