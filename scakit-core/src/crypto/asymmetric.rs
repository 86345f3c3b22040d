//! RSA key pairs and PKCS#1 v1.5 key wrapping.

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use super::encoding::public_key_to_pem;
use crate::error::ScaResult;

/// An RSA key pair bound to one connection alias.
///
/// The private half is zeroized on drop by the `rsa` crate.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generates a fresh key pair with a modulus of `bits` bits.
    ///
    /// # Errors
    ///
    /// Returns the `rsa` error if generation fails.
    pub fn generate(bits: usize) -> Result<Self, rsa::Error> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)?;
        Ok(Self::from_private_key(private))
    }

    /// Wraps an existing private key, deriving its public half.
    #[must_use]
    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    /// Parses a PKCS#8 DER private key.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the bytes are not an RSA PKCS#8 key.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, rsa::pkcs8::Error> {
        RsaPrivateKey::from_pkcs8_der(der).map(Self::from_private_key)
    }

    /// Encodes the private key as PKCS#8 DER. Treat the output as secret.
    ///
    /// # Errors
    ///
    /// Returns the encoder error if the key cannot be serialized.
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>, rsa::pkcs8::Error> {
        let document = self.private.to_pkcs8_der()?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    /// The private half.
    #[must_use]
    pub const fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// The public half.
    #[must_use]
    pub const fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Consumes the pair, keeping only the private key.
    #[must_use]
    pub fn into_private_key(self) -> RsaPrivateKey {
        self.private
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.public.size() * 8
    }

    /// The public half as an SPKI PEM block, as sent to the server on enrollment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScaError::InvalidKeyMaterial`] if encoding fails.
    pub fn public_key_pem(&self) -> ScaResult<String> {
        public_key_to_pem(&self.public)
    }
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.bits())
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// RSA-encrypts a short secret (an AES key or IV) with PKCS#1 v1.5 padding.
///
/// # Errors
///
/// Returns the `rsa` error if the secret is too long for the modulus.
pub fn wrap_secret(public: &RsaPublicKey, secret: &[u8]) -> Result<Vec<u8>, rsa::Error> {
    public.encrypt(&mut OsRng, Pkcs1v15Encrypt, secret)
}

/// Reverses [`wrap_secret`], requiring the recovered secret to be `expected_len` bytes.
///
/// Returns `None` on any failure so callers cannot tell padding errors from
/// length mismatches.
#[must_use]
pub fn unwrap_secret(
    private: &RsaPrivateKey,
    wrapped: &[u8],
    expected_len: usize,
) -> Option<Zeroizing<Vec<u8>>> {
    let secret = Zeroizing::new(private.decrypt(Pkcs1v15Encrypt, wrapped).ok()?);
    (secret.len() == expected_len).then_some(secret)
}
