//! Engine configuration.

use crate::crypto::LocalSecretNonce;
use crate::defaults::{DEFAULT_RSA_KEY_BITS, MIN_RSA_KEY_BITS};
use crate::envelope::EnvelopeFormat;
use crate::error::{ScaError, ScaResult};

/// Tunables for key generation, the wire format and local-secret protection.
///
/// Constructed once at the composition root and handed to the key stores and
/// managers that need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// RSA modulus size for newly generated connection key pairs.
    pub rsa_key_bits: usize,
    /// Envelope shape spoken by the server this client talks to.
    pub envelope_format: EnvelopeFormat,
    /// Nonce policy for newly protected local secrets.
    pub local_secret_nonce: LocalSecretNonce,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            envelope_format: EnvelopeFormat::V1,
            local_secret_nonce: LocalSecretNonce::Random,
        }
    }
}

impl EngineConfig {
    /// Overrides the RSA modulus size.
    #[must_use]
    pub const fn with_rsa_key_bits(mut self, bits: usize) -> Self {
        self.rsa_key_bits = bits;
        self
    }

    /// Overrides the envelope format.
    #[must_use]
    pub const fn with_envelope_format(mut self, format: EnvelopeFormat) -> Self {
        self.envelope_format = format;
        self
    }

    /// Overrides the local-secret nonce policy.
    #[must_use]
    pub const fn with_local_secret_nonce(mut self, nonce: LocalSecretNonce) -> Self {
        self.local_secret_nonce = nonce;
        self
    }

    /// Checks the configuration for values the protocol cannot accept.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::InvalidConfig`] if the RSA modulus is smaller than
    /// [`MIN_RSA_KEY_BITS`] or not a multiple of 8.
    pub fn validate(&self) -> ScaResult<()> {
        if self.rsa_key_bits < MIN_RSA_KEY_BITS {
            return Err(ScaError::InvalidConfig(format!(
                "rsa_key_bits must be at least {MIN_RSA_KEY_BITS}, got {}",
                self.rsa_key_bits
            )));
        }
        if self.rsa_key_bits % 8 != 0 {
            return Err(ScaError::InvalidConfig(format!(
                "rsa_key_bits must be a multiple of 8, got {}",
                self.rsa_key_bits
            )));
        }
        Ok(())
    }
}
