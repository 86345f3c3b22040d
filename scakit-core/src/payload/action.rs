use serde::{Deserialize, Serialize};

use super::{overlay, EnvelopePayload, PayloadKind};
use crate::envelope::EncryptedEnvelope;

/// Outcome of an instant action (e.g. a QR-code login) submitted to the server.
///
/// When `authorization_id` is set the action spawned an authorization the
/// user must confirm next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResultPayload {
    /// Action identifier.
    #[serde(default)]
    pub id: String,
    /// Whether the server accepted the action.
    pub success: bool,
    /// Connection that handled the action.
    #[serde(default)]
    pub connection_id: String,
    /// Authorization created by the action, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_id: Option<String>,
    /// Out-of-band status from the envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl EnvelopePayload for ActionResultPayload {
    const KIND: PayloadKind = PayloadKind::Action;

    fn enrich(&mut self, envelope: &EncryptedEnvelope) {
        overlay(&mut self.id, &envelope.id);
        overlay(&mut self.connection_id, &envelope.connection_id);
        if envelope.status.is_some() {
            self.status.clone_from(&envelope.status);
        }
    }
}
