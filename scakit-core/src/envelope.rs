//! Encrypted envelopes as exchanged with the server.
//!
//! Two wire generations exist. Both carry the same three Base64 fields
//! (`key`, `iv`, `data`) and differ in the surrounding metadata:
//!
//! ```text
//! V1: {"id", "connection_id", "key", "iv", "data", "algorithm"?}
//! V2: {"id", "connection_id", "status"?, "key", "iv", "data"}
//! ```
//!
//! V2 servers may send numeric identifiers; they are normalized to strings.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::crypto::SealedParts;
use crate::defaults::DEFAULT_ENVELOPE_ALGORITHM;
use crate::error::{ScaError, ScaResult};

/// Server protocol generation of an envelope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// First generation, optional `algorithm` tag.
    #[default]
    V1,
    /// Second generation, algorithm implied and `status` out of band.
    V2,
}

/// A hybrid-encrypted payload plus the metadata that travels beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Server-assigned identifier of the authorization, consent or action.
    pub id: String,
    /// Connection the payload belongs to; selects the private key.
    pub connection_id: String,
    /// Base64 RSA-wrapped AES key.
    pub wrapped_key: String,
    /// Base64 RSA-wrapped AES IV.
    pub wrapped_iv: String,
    /// Base64 AES-CBC ciphertext.
    pub ciphertext: String,
    /// Algorithm tag, V1 only. `None` means the default.
    pub algorithm: Option<String>,
    /// Out-of-band status, V2 only.
    pub status: Option<String>,
    /// Wire generation the envelope was read from or will be written as.
    pub format: EnvelopeFormat,
}

#[derive(Serialize, Deserialize)]
struct WireV1 {
    #[serde(default)]
    id: String,
    #[serde(default)]
    connection_id: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    iv: String,
    #[serde(default)]
    data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    algorithm: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireV2 {
    #[serde(default, deserialize_with = "string_or_number")]
    id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default)]
    key: String,
    #[serde(default)]
    iv: String,
    #[serde(default)]
    data: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

impl EncryptedEnvelope {
    /// Builds an envelope from freshly sealed parts.
    #[must_use]
    pub fn from_parts(
        id: &str,
        connection_id: &str,
        parts: SealedParts,
        format: EnvelopeFormat,
    ) -> Self {
        Self {
            id: id.to_string(),
            connection_id: connection_id.to_string(),
            wrapped_key: parts.wrapped_key,
            wrapped_iv: parts.wrapped_iv,
            ciphertext: parts.ciphertext,
            algorithm: None,
            status: None,
            format,
        }
    }

    /// Parses a wire envelope of the given generation.
    ///
    /// Missing crypto fields parse as empty and are caught by [`Self::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::MalformedEnvelope`] if the input is not a JSON
    /// object of the expected shape.
    pub fn from_json(json: &str, format: EnvelopeFormat) -> ScaResult<Self> {
        let malformed = |err: serde_json::Error| ScaError::MalformedEnvelope(err.to_string());
        Ok(match format {
            EnvelopeFormat::V1 => {
                let wire: WireV1 = serde_json::from_str(json).map_err(malformed)?;
                Self {
                    id: wire.id,
                    connection_id: wire.connection_id,
                    wrapped_key: wire.key,
                    wrapped_iv: wire.iv,
                    ciphertext: wire.data,
                    algorithm: wire.algorithm,
                    status: None,
                    format,
                }
            }
            EnvelopeFormat::V2 => {
                let wire: WireV2 = serde_json::from_str(json).map_err(malformed)?;
                Self {
                    id: wire.id,
                    connection_id: wire.connection_id,
                    wrapped_key: wire.key,
                    wrapped_iv: wire.iv,
                    ciphertext: wire.data,
                    algorithm: None,
                    status: wire.status,
                    format,
                }
            }
        })
    }

    /// Serializes the envelope in its own wire generation.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::MalformedEnvelope`] if serialization fails.
    pub fn to_json(&self) -> ScaResult<String> {
        let result = match self.format {
            EnvelopeFormat::V1 => serde_json::to_string(&WireV1 {
                id: self.id.clone(),
                connection_id: self.connection_id.clone(),
                key: self.wrapped_key.clone(),
                iv: self.wrapped_iv.clone(),
                data: self.ciphertext.clone(),
                algorithm: self.algorithm.clone(),
            }),
            EnvelopeFormat::V2 => serde_json::to_string(&WireV2 {
                id: self.id.clone(),
                connection_id: self.connection_id.clone(),
                status: self.status.clone(),
                key: self.wrapped_key.clone(),
                iv: self.wrapped_iv.clone(),
                data: self.ciphertext.clone(),
            }),
        };
        result.map_err(|err| ScaError::MalformedEnvelope(err.to_string()))
    }

    /// Checks the envelope is well formed before any cryptography runs.
    ///
    /// # Errors
    ///
    /// Returns [`ScaError::MalformedEnvelope`] if `key`, `iv` or `data` is
    /// empty, or if an algorithm tag is present but empty or unsupported.
    pub fn validate(&self) -> ScaResult<()> {
        for (name, value) in [
            ("key", &self.wrapped_key),
            ("iv", &self.wrapped_iv),
            ("data", &self.ciphertext),
        ] {
            if value.trim().is_empty() {
                return Err(ScaError::MalformedEnvelope(format!("empty `{name}`")));
            }
        }
        match self.algorithm.as_deref().map(str::trim) {
            None => Ok(()),
            Some("") => Err(ScaError::MalformedEnvelope("empty `algorithm`".to_string())),
            Some(tag) if tag.eq_ignore_ascii_case(DEFAULT_ENVELOPE_ALGORITHM) => Ok(()),
            Some(tag) => Err(ScaError::MalformedEnvelope(format!(
                "unsupported algorithm `{tag}`"
            ))),
        }
    }

    /// The algorithm this envelope was sealed with.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        self.algorithm
            .as_deref()
            .unwrap_or(DEFAULT_ENVELOPE_ALGORITHM)
    }

    /// The three crypto fields.
    #[must_use]
    pub fn sealed_parts(&self) -> SealedParts {
        SealedParts {
            wrapped_key: self.wrapped_key.clone(),
            wrapped_iv: self.wrapped_iv.clone(),
            ciphertext: self.ciphertext.clone(),
        }
    }
}
