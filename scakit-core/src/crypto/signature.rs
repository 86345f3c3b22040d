//! Request signatures made with a connection's private key.
//!
//! The server authenticates confirm/deny calls by checking an RSA
//! PKCS#1 v1.5 SHA-256 signature over
//! `"{method}|{url}|{expires_at}|{body}"`.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::encoding::{base64_decode, base64_encode};
use crate::error::{ScaError, ScaResult};

/// The request fields covered by a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    /// Lowercase HTTP method, e.g. `put`.
    pub method: String,
    /// Absolute request URL.
    pub url: String,
    /// Expiry as Unix seconds.
    pub expires_at: i64,
    /// Raw request body; empty for body-less requests.
    #[serde(default)]
    pub body: String,
}

impl SignedRequest {
    /// The exact byte string that is signed.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.method.to_lowercase(),
            self.url,
            self.expires_at,
            self.body
        )
    }
}

/// Signs `request` and returns the Base64 signature.
///
/// # Errors
///
/// Returns [`ScaError::Encryption`] if signing fails.
pub fn sign_request(private_key: &RsaPrivateKey, request: &SignedRequest) -> ScaResult<String> {
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key
        .try_sign(request.canonical().as_bytes())
        .map_err(|err| ScaError::Encryption(format!("signing request: {err}")))?;
    Ok(base64_encode(&signature.to_bytes()))
}

/// Checks a Base64 signature produced by [`sign_request`].
///
/// Returns `false` for malformed or non-matching signatures.
#[must_use]
pub fn verify_request_signature(
    public_key: &RsaPublicKey,
    request: &SignedRequest,
    signature: &str,
) -> bool {
    let Ok(bytes) = base64_decode(signature) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
        return false;
    };
    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(request.canonical().as_bytes(), &signature)
        .is_ok()
}
