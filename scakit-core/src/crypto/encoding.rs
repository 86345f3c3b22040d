//! Base64 and PEM helpers for wire fields and exported keys.
//!
//! Public keys go to the server as `-----BEGIN PUBLIC KEY-----` (X.509 SPKI)
//! blocks with 64-column bodies. Provider keys arrive in several shapes, all
//! of which [`parse_public_key`] accepts:
//!
//! - `BEGIN PUBLIC KEY` (X.509 SPKI)
//! - `BEGIN RSA PUBLIC KEY` (PKCS#1)
//! - a header-less Base64 body of either of the above
//! - a legacy bare modulus, reconstructed with exponent 65537

use base64::{engine::general_purpose::STANDARD, Engine as _};
use pem::{EncodeConfig, LineEnding, Pem};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::defaults::{DEFAULT_PUBLIC_EXPONENT, MIN_RSA_KEY_BITS, PEM_LINE_WIDTH};
use crate::error::{ScaError, ScaResult};

const TAG_PUBLIC_KEY: &str = "PUBLIC KEY";
const TAG_RSA_PUBLIC_KEY: &str = "RSA PUBLIC KEY";
const TAG_PRIVATE_KEY: &str = "PRIVATE KEY";
const TAG_RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";

const MAX_BARE_MODULUS_BITS: usize = 8192;

/// Encodes bytes as standard Base64 without line breaks.
#[must_use]
pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encodes bytes as standard Base64 wrapped at 64 columns, lines joined by `\n`.
#[must_use]
pub fn base64_encode_wrapped(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / PEM_LINE_WIDTH);
    for (i, ch) in encoded.chars().enumerate() {
        if i > 0 && i % PEM_LINE_WIDTH == 0 {
            out.push('\n');
        }
        out.push(ch);
    }
    out
}

/// Decodes standard Base64, ignoring embedded ASCII whitespace.
///
/// # Errors
///
/// Returns the decoder error if the input is not canonical Base64.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if input.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(input)
    }
}

fn encode_pem(tag: &str, der: &[u8]) -> String {
    let block = Pem::new(tag, der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Serializes a public key as an X.509 SPKI PEM block.
///
/// # Errors
///
/// Returns [`ScaError::InvalidKeyMaterial`] if the key cannot be DER-encoded.
pub fn public_key_to_pem(key: &RsaPublicKey) -> ScaResult<String> {
    let der = key
        .to_public_key_der()
        .map_err(|err| ScaError::InvalidKeyMaterial(format!("public key encoding: {err}")))?;
    Ok(encode_pem(TAG_PUBLIC_KEY, der.as_bytes()))
}

/// Serializes a private key as a PKCS#8 PEM block. Treat the output as secret.
///
/// # Errors
///
/// Returns [`ScaError::InvalidKeyMaterial`] if the key cannot be DER-encoded.
pub fn private_key_to_pem(key: &RsaPrivateKey) -> ScaResult<Zeroizing<String>> {
    let der = key
        .to_pkcs8_der()
        .map_err(|err| ScaError::InvalidKeyMaterial(format!("private key encoding: {err}")))?;
    Ok(Zeroizing::new(encode_pem(TAG_PRIVATE_KEY, der.as_bytes())))
}

/// Parses a provider public key in any of the accepted forms.
///
/// # Errors
///
/// Returns [`ScaError::InvalidKeyMaterial`] if no form matches.
pub fn parse_public_key(input: &str) -> ScaResult<RsaPublicKey> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScaError::InvalidKeyMaterial("public key is empty".to_string()));
    }

    if trimmed.starts_with("-----BEGIN") {
        let block = pem::parse(trimmed)
            .map_err(|err| ScaError::InvalidKeyMaterial(format!("public key PEM: {err}")))?;
        let der = block.contents();
        return match block.tag() {
            TAG_PUBLIC_KEY => RsaPublicKey::from_public_key_der(der)
                .map_err(|err| ScaError::InvalidKeyMaterial(format!("SPKI public key: {err}"))),
            TAG_RSA_PUBLIC_KEY => pkcs1_or_bare_modulus(der),
            other => Err(ScaError::InvalidKeyMaterial(format!(
                "unsupported PEM block `{other}`"
            ))),
        };
    }

    let der = base64_decode(trimmed).map_err(|err| {
        ScaError::InvalidKeyMaterial(format!("public key body is not Base64: {err}"))
    })?;
    RsaPublicKey::from_public_key_der(&der).or_else(|_| pkcs1_or_bare_modulus(&der))
}

fn pkcs1_or_bare_modulus(der: &[u8]) -> ScaResult<RsaPublicKey> {
    match RsaPublicKey::from_pkcs1_der(der) {
        Ok(key) => Ok(key),
        Err(_) if is_plausible_modulus(der) => public_key_from_bare_modulus(der),
        Err(err) => Err(ScaError::InvalidKeyMaterial(format!("PKCS#1 public key: {err}"))),
    }
}

/// Whether `bytes` can be a bare big-endian modulus rather than broken DER.
///
/// DER structures start with a SEQUENCE tag (`0x30`); a full-width modulus
/// has its top bit set, optionally behind one zero byte.
fn is_plausible_modulus(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(&[0]).unwrap_or(bytes);
    let bits = bytes.len() * 8;
    bytes.first().is_some_and(|first| first & 0x80 != 0)
        && (MIN_RSA_KEY_BITS..=MAX_BARE_MODULUS_BITS).contains(&bits)
}

/// Rebuilds a key from a big-endian modulus with the default exponent.
fn public_key_from_bare_modulus(modulus: &[u8]) -> ScaResult<RsaPublicKey> {
    let n = BigUint::from_bytes_be(modulus);
    if n.bits() < MIN_RSA_KEY_BITS {
        return Err(ScaError::InvalidKeyMaterial(format!(
            "modulus too short: {} bits",
            n.bits()
        )));
    }
    RsaPublicKey::new(n, BigUint::from(DEFAULT_PUBLIC_EXPONENT))
        .map_err(|err| ScaError::InvalidKeyMaterial(format!("bare modulus: {err}")))
}

/// Parses a PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`) PEM block.
///
/// # Errors
///
/// Returns [`ScaError::InvalidKeyMaterial`] if the block is not an RSA private key.
pub fn parse_private_key(input: &str) -> ScaResult<RsaPrivateKey> {
    let block = pem::parse(input.trim())
        .map_err(|err| ScaError::InvalidKeyMaterial(format!("private key PEM: {err}")))?;
    match block.tag() {
        TAG_PRIVATE_KEY => RsaPrivateKey::from_pkcs8_der(block.contents())
            .map_err(|err| ScaError::InvalidKeyMaterial(format!("PKCS#8 private key: {err}"))),
        TAG_RSA_PRIVATE_KEY => RsaPrivateKey::from_pkcs1_der(block.contents())
            .map_err(|err| ScaError::InvalidKeyMaterial(format!("PKCS#1 private key: {err}"))),
        other => Err(ScaError::InvalidKeyMaterial(format!(
            "unsupported PEM block `{other}`"
        ))),
    }
}
