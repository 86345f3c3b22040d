//! Turns encrypted envelopes into trusted, typed payloads.
//!
//! Decoding runs four steps and stops at the first failure:
//!
//! 1. shape check on the envelope, and that it names the context's
//!    connection, before any cryptography
//! 2. private key lookup in the connection context
//! 3. hybrid decryption
//! 4. JSON deserialization into the requested payload type, then enrichment
//!    with the envelope's out-of-band fields
//!
//! The decoder keeps no state and never retries.

use crate::connection::ConnectionKeyContext;
use crate::crypto::{EnvelopeCipher, HybridCryptoEngine};
use crate::envelope::EncryptedEnvelope;
use crate::error::{ScaError, ScaResult};
use crate::payload::{
    ActionResultPayload, AuthorizationPayload, ConsentPayload, DecryptedPayload, EnvelopePayload,
    PayloadKind,
};

/// Envelope decoder, generic over the cipher so tests can observe it.
#[derive(Debug, Clone, Default)]
pub struct PayloadDecoder<C = HybridCryptoEngine> {
    cipher: C,
}

impl PayloadDecoder<HybridCryptoEngine> {
    /// A decoder using [`HybridCryptoEngine`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cipher: HybridCryptoEngine::new(),
        }
    }
}

impl<C: EnvelopeCipher> PayloadDecoder<C> {
    /// A decoder using `cipher`.
    #[must_use]
    pub const fn with_cipher(cipher: C) -> Self {
        Self { cipher }
    }

    /// The cipher in use.
    #[must_use]
    pub const fn cipher(&self) -> &C {
        &self.cipher
    }

    /// Decodes `envelope` into `P`.
    ///
    /// # Errors
    ///
    /// - [`ScaError::MalformedEnvelope`] if the envelope is not well formed or
    ///   names a connection other than `context`'s
    /// - [`ScaError::KeyNotAvailable`] if `context` has no private key
    /// - [`ScaError::DecryptionFailed`] if decryption fails for any reason
    /// - [`ScaError::MalformedPayload`] if the plaintext is not a `P`
    pub fn decode<P: EnvelopePayload>(
        &self,
        envelope: &EncryptedEnvelope,
        context: &ConnectionKeyContext,
    ) -> ScaResult<P> {
        envelope.validate()?;
        if !envelope.connection_id.is_empty() && envelope.connection_id != context.connection_id {
            return Err(ScaError::MalformedEnvelope(format!(
                "envelope {} belongs to connection {}, not {}",
                envelope.id, envelope.connection_id, context.connection_id
            )));
        }
        let private_key = context
            .private_key
            .as_ref()
            .ok_or_else(|| ScaError::KeyNotAvailable(context.connection_id.clone()))?;

        let plaintext = self.cipher.open_parts(&envelope.sealed_parts(), private_key)?;
        let mut payload: P = serde_json::from_str(&plaintext).map_err(|err| {
            ScaError::MalformedPayload(format!("expected {} payload: {err}", P::KIND))
        })?;
        payload.enrich(envelope);
        Ok(payload)
    }

    /// Decodes `envelope` into the payload shape named by `kind`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::decode`].
    pub fn decode_kind(
        &self,
        envelope: &EncryptedEnvelope,
        context: &ConnectionKeyContext,
        kind: PayloadKind,
    ) -> ScaResult<DecryptedPayload> {
        Ok(match kind {
            PayloadKind::Authorization => self
                .decode::<AuthorizationPayload>(envelope, context)?
                .into(),
            PayloadKind::Consent => self.decode::<ConsentPayload>(envelope, context)?.into(),
            PayloadKind::Action => self.decode::<ActionResultPayload>(envelope, context)?.into(),
        })
    }

    /// Decodes a list of envelopes, dropping the ones that fail.
    ///
    /// Failures are logged with the envelope id and error kind only.
    pub fn decode_batch<'a, P, I>(&self, envelopes: I, context: &ConnectionKeyContext) -> Vec<P>
    where
        P: EnvelopePayload,
        I: IntoIterator<Item = &'a EncryptedEnvelope>,
    {
        envelopes
            .into_iter()
            .filter_map(|envelope| match self.decode::<P>(envelope, context) {
                Ok(payload) => Some(payload),
                Err(err) => {
                    log::warn!(
                        "skipping {} envelope {}: {}",
                        P::KIND,
                        envelope.id,
                        err.kind()
                    );
                    None
                }
            })
            .collect()
    }
}
