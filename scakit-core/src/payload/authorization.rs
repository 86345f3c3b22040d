use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overlay, EnvelopePayload, PayloadKind};
use crate::envelope::EncryptedEnvelope;

/// A pending authorization (payment, login, ...) the user must confirm or deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPayload {
    /// Server identifier; taken from the envelope when not in the plaintext.
    #[serde(default)]
    pub id: String,
    /// Connection the authorization belongs to.
    #[serde(default)]
    pub connection_id: String,
    /// Short headline, e.g. "Payment confirmation".
    pub title: String,
    /// Human-readable details shown before confirming.
    pub description: String,
    /// Code echoed back to the server with the user's decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
    /// When the server created the authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// After this instant the authorization can no longer be confirmed.
    pub expires_at: DateTime<Utc>,
    /// Lifecycle status, delivered out of band by newer servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl AuthorizationPayload {
    /// Whether the authorization has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl EnvelopePayload for AuthorizationPayload {
    const KIND: PayloadKind = PayloadKind::Authorization;

    fn enrich(&mut self, envelope: &EncryptedEnvelope) {
        overlay(&mut self.id, &envelope.id);
        overlay(&mut self.connection_id, &envelope.connection_id);
        if envelope.status.is_some() {
            self.status.clone_from(&envelope.status);
        }
    }
}
