//! Connection metadata and the key context resolved for it.

use std::fmt;

use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// A bank connection as known to the host app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Connection {
    /// Connection GUID, also the key store alias of its key pair.
    pub guid: String,
    /// The provider's public key as received at enrollment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_public_key_pem: Option<String>,
}

impl Connection {
    /// A connection with no provider key.
    #[must_use]
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            provider_public_key_pem: None,
        }
    }

    /// Attaches the provider's public key PEM.
    #[must_use]
    pub fn with_provider_key(mut self, pem: impl Into<String>) -> Self {
        self.provider_public_key_pem = Some(pem.into());
        self
    }
}

/// Keys needed to talk to one connection. Built per operation and never stored.
#[derive(Clone)]
pub struct ConnectionKeyContext {
    /// Connection GUID.
    pub connection_id: String,
    /// Our private key for the connection.
    pub private_key: Option<RsaPrivateKey>,
    /// The provider's public key, used to seal outgoing payloads.
    pub peer_public_key: Option<RsaPublicKey>,
}

impl ConnectionKeyContext {
    /// A context carrying only a private key.
    #[must_use]
    pub fn with_private_key(connection_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            connection_id: connection_id.into(),
            private_key: Some(private_key),
            peer_public_key: None,
        }
    }
}

impl fmt::Debug for ConnectionKeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionKeyContext")
            .field("connection_id", &self.connection_id)
            .field("has_private_key", &self.private_key.is_some())
            .field("has_peer_public_key", &self.peer_public_key.is_some())
            .finish()
    }
}
