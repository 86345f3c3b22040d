//! High-level entry point tying key lifecycle, decoding, sealing and local
//! secret protection together.
//!
//! [`ScaEngine`] is what mobile hosts hold across the FFI boundary and what
//! the CLI drives. Payloads cross that boundary as JSON text.
//!
//! # Example (Kotlin)
//!
//! ```kotlin
//! val engine = ScaEngine(AndroidKeyStore(context), EngineOptions(2048u, EnvelopeFormat.V1, LocalSecretNonce.RANDOM))
//! val publicKeyPem = engine.createOrReplaceKeyPair(connection.guid)
//! // ... enroll with the bank, later:
//! val json = engine.decodeJson(connection, envelopeJson, PayloadKind.AUTHORIZATION)
//! ```

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::config::EngineConfig;
use crate::connection::Connection;
use crate::crypto::encoding::parse_public_key;
use crate::crypto::{
    sign_request, HybridCryptoEngine, LocalSecretBlob, LocalSecretNonce, LocalSecretProtector,
    SignedRequest,
};
use crate::decoder::PayloadDecoder;
use crate::envelope::{EncryptedEnvelope, EnvelopeFormat};
use crate::error::{ScaError, ScaResult};
use crate::keys::KeyLifecycleManager;
use crate::keystore::{ForeignKeyStore, ForeignKeyStoreAdapter, SecretKeyStore};
use crate::payload::{DecryptedPayload, PayloadKind};

/// Engine settings as passed by foreign callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EngineOptions {
    /// RSA modulus size for new key pairs; at least 2048.
    pub rsa_key_bits: u32,
    /// Envelope generation spoken by the server.
    pub envelope_format: EnvelopeFormat,
    /// Nonce policy for new local-secret blobs.
    pub local_secret_nonce: LocalSecretNonce,
}

impl From<EngineOptions> for EngineConfig {
    fn from(options: EngineOptions) -> Self {
        Self::default()
            .with_rsa_key_bits(options.rsa_key_bits as usize)
            .with_envelope_format(options.envelope_format)
            .with_local_secret_nonce(options.local_secret_nonce)
    }
}

/// The strong-customer-authentication engine.
#[cfg_attr(feature = "ffi", derive(uniffi::Object))]
pub struct ScaEngine {
    keys: KeyLifecycleManager,
    decoder: PayloadDecoder,
    sealer: HybridCryptoEngine,
    secrets: LocalSecretProtector,
    format: EnvelopeFormat,
}

impl ScaEngine {
    /// Builds an engine over any [`SecretKeyStore`].
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::InvalidConfig`] if `config` does not validate.
    pub fn with_store(store: Arc<dyn SecretKeyStore>, config: EngineConfig) -> ScaResult<Self> {
        let secrets =
            LocalSecretProtector::new(Arc::clone(&store)).with_nonce(config.local_secret_nonce);
        Ok(Self {
            keys: KeyLifecycleManager::new(store, config)?,
            decoder: PayloadDecoder::new(),
            sealer: HybridCryptoEngine::new(),
            secrets,
            format: config.envelope_format,
        })
    }

    /// The key lifecycle manager.
    #[must_use]
    pub const fn keys(&self) -> &KeyLifecycleManager {
        &self.keys
    }

    /// Decodes a wire envelope for `connection` into a typed payload.
    ///
    /// # Errors
    ///
    /// See [`PayloadDecoder::decode`]; additionally
    /// [`ScaError::KeyNotAvailable`] and [`ScaError::InvalidKeyMaterial`] from
    /// key resolution.
    pub fn decode(
        &self,
        connection: &Connection,
        envelope_json: &str,
        kind: PayloadKind,
    ) -> ScaResult<DecryptedPayload> {
        let envelope = EncryptedEnvelope::from_json(envelope_json, self.format)?;
        let context = self.keys.resolve_connection_key_context(connection)?;
        let payload = self.decoder.decode_kind(&envelope, &context, kind);
        match &payload {
            Ok(_) => log::debug!("decoded {kind} envelope {}", envelope.id),
            Err(err) => log::info!(
                "could not decode {kind} envelope {}: {}",
                envelope.id,
                err.kind()
            ),
        }
        payload
    }

    /// Seals `payload` for the provider of `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::InvalidKeyMaterial`] if the connection has no
    /// usable provider key, or [`ScaError::Encryption`] if sealing fails.
    pub fn seal<P: serde::Serialize>(
        &self,
        connection: &Connection,
        id: &str,
        payload: &P,
    ) -> ScaResult<EncryptedEnvelope> {
        let pem = connection
            .provider_public_key_pem
            .as_deref()
            .ok_or_else(|| {
                ScaError::InvalidKeyMaterial(format!(
                    "connection {} has no provider public key",
                    connection.guid
                ))
            })?;
        let peer = parse_public_key(pem)?;
        self.sealer
            .seal_envelope(id, &connection.guid, payload, &peer, self.format)
    }

    /// Signs `request` with the key pair stored under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::KeyNotAvailable`] if there is no such pair.
    pub fn sign(&self, alias: &str, request: &SignedRequest) -> ScaResult<String> {
        let pair = self
            .keys
            .get_key_pair(alias)?
            .ok_or_else(|| ScaError::KeyNotAvailable(alias.to_string()))?;
        sign_request(pair.private_key(), request)
    }

    /// Encrypts a local secret.
    ///
    /// # Errors
    ///
    /// See [`LocalSecretProtector::protect`].
    pub fn protect(&self, secret: &SecretString) -> ScaResult<LocalSecretBlob> {
        self.secrets.protect(secret)
    }

    /// Decrypts a local secret.
    ///
    /// # Errors
    ///
    /// See [`LocalSecretProtector::reveal`].
    pub fn reveal(&self, blob: &LocalSecretBlob) -> ScaResult<SecretString> {
        self.secrets.reveal(blob)
    }
}

#[cfg_attr(feature = "ffi", uniffi::export)]
impl ScaEngine {
    /// Builds an engine over a host-provided key store.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::InvalidConfig`] if `options` do not validate.
    #[cfg_attr(feature = "ffi", uniffi::constructor)]
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(
        store: Arc<dyn ForeignKeyStore>,
        options: EngineOptions,
    ) -> Result<Arc<Self>, ScaError> {
        let config = EngineConfig::from(options);
        let adapter = ForeignKeyStoreAdapter::new(store);
        Self::with_store(Arc::new(adapter), config).map(Arc::new)
    }

    /// Creates or replaces the key pair of `alias`, returning its public PEM.
    ///
    /// # Errors
    ///
    /// See [`KeyLifecycleManager::create_or_replace_key_pair`].
    pub fn create_or_replace_key_pair(&self, alias: &str) -> Result<String, ScaError> {
        self.keys.create_or_replace_key_pair(alias)?.public_key_pem()
    }

    /// Public PEM of the pair under `alias`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn public_key_pem(&self, alias: &str) -> Result<Option<String>, ScaError> {
        self.keys.public_key_pem(alias)
    }

    /// Whether a pair exists under `alias`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn key_pair_exists(&self, alias: &str) -> Result<bool, ScaError> {
        self.keys.key_pair_exists(alias)
    }

    /// All aliases with a stored pair, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_aliases(&self) -> Result<Vec<String>, ScaError> {
        Ok(self.keys.list_aliases()?.into_iter().collect())
    }

    /// Deletes the pairs of `aliases`; missing ones are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn delete_key_pairs(&self, aliases: Vec<String>) -> Result<(), ScaError> {
        self.keys.delete_key_pairs(aliases)
    }

    /// Decodes a wire envelope and returns the payload as JSON.
    ///
    /// # Errors
    ///
    /// See [`Self::decode`].
    #[allow(clippy::needless_pass_by_value)] // uniffi passes records and vectors by value
    pub fn decode_json(
        &self,
        connection: Connection,
        envelope_json: &str,
        kind: PayloadKind,
    ) -> Result<String, ScaError> {
        let payload = self.decode(&connection, envelope_json, kind)?;
        serde_json::to_string(&payload).map_err(|err| ScaError::MalformedPayload(err.to_string()))
    }

    /// Seals a JSON payload and returns the wire envelope as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::MalformedPayload`] if `payload_json` is not JSON,
    /// otherwise see [`Self::seal`].
    #[allow(clippy::needless_pass_by_value)]
    pub fn seal_json(
        &self,
        connection: Connection,
        id: &str,
        payload_json: &str,
    ) -> Result<String, ScaError> {
        let payload: serde_json::Value = serde_json::from_str(payload_json)
            .map_err(|err| ScaError::MalformedPayload(err.to_string()))?;
        self.seal(&connection, id, &payload)?.to_json()
    }

    /// Signs a request with the pair under `alias`; returns Base64.
    ///
    /// # Errors
    ///
    /// See [`Self::sign`].
    #[allow(clippy::needless_pass_by_value)]
    pub fn sign_request(
        &self,
        alias: &str,
        method: String,
        url: String,
        expires_at: i64,
        body: String,
    ) -> Result<String, ScaError> {
        self.sign(
            alias,
            &SignedRequest {
                method,
                url,
                expires_at,
                body,
            },
        )
    }

    /// Encrypts a passcode or other short secret for storage.
    ///
    /// # Errors
    ///
    /// See [`LocalSecretProtector::protect`].
    pub fn protect_local_secret(&self, secret: String) -> Result<String, ScaError> {
        Ok(self.protect(&SecretString::from(secret))?.into_string())
    }

    /// Decrypts a blob from [`Self::protect_local_secret`].
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::DecryptionFailed`] for any unreadable blob.
    pub fn reveal_local_secret(&self, blob: String) -> Result<String, ScaError> {
        let secret = self.reveal(&LocalSecretBlob::from(blob))?;
        Ok(secret.expose_secret().to_owned())
    }

    /// Deletes the local-secret key, e.g. on logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn forget_local_secret(&self) -> Result<(), ScaError> {
        self.secrets.forget()
    }
}
