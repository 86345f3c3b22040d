//! Typed payloads recovered from encrypted envelopes.
//!
//! The caller knows which endpoint it called and therefore which payload
//! shape to expect; [`PayloadKind`] names that choice at runtime.

mod action;
mod authorization;
mod consent;

pub use action::ActionResultPayload;
pub use authorization::AuthorizationPayload;
pub use consent::{ConsentAccount, ConsentPayload, ConsentSharedData};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::envelope::EncryptedEnvelope;

/// Payload shapes the server sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// A pending authorization (payment, login) awaiting confirmation.
    Authorization,
    /// A consent granted to a third party.
    Consent,
    /// The outcome of an instant action.
    #[strum(to_string = "action", serialize = "action_result")]
    Action,
}

/// A payload that can be decrypted out of an envelope.
pub trait EnvelopePayload: DeserializeOwned + Serialize {
    /// The kind this type decodes.
    const KIND: PayloadKind;

    /// Copies out-of-band envelope fields onto the decoded payload.
    fn enrich(&mut self, envelope: &EncryptedEnvelope);
}

/// Any decrypted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum DecryptedPayload {
    /// See [`AuthorizationPayload`].
    Authorization(AuthorizationPayload),
    /// See [`ConsentPayload`].
    Consent(ConsentPayload),
    /// See [`ActionResultPayload`].
    ActionResult(ActionResultPayload),
}

impl DecryptedPayload {
    /// The payload kind.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::Authorization(_) => PayloadKind::Authorization,
            Self::Consent(_) => PayloadKind::Consent,
            Self::ActionResult(_) => PayloadKind::Action,
        }
    }

    /// Connection the payload belongs to.
    #[must_use]
    pub fn connection_id(&self) -> &str {
        match self {
            Self::Authorization(p) => &p.connection_id,
            Self::Consent(p) => &p.connection_id,
            Self::ActionResult(p) => &p.connection_id,
        }
    }
}

impl From<AuthorizationPayload> for DecryptedPayload {
    fn from(value: AuthorizationPayload) -> Self {
        Self::Authorization(value)
    }
}

impl From<ConsentPayload> for DecryptedPayload {
    fn from(value: ConsentPayload) -> Self {
        Self::Consent(value)
    }
}

impl From<ActionResultPayload> for DecryptedPayload {
    fn from(value: ActionResultPayload) -> Self {
        Self::ActionResult(value)
    }
}

/// Replaces `target` with `value` when the envelope actually carried one.
pub(crate) fn overlay(target: &mut String, value: &str) {
    if !value.is_empty() {
        value.clone_into(target);
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("authorization", PayloadKind::Authorization)]
    #[test_case("Consent", PayloadKind::Consent)]
    #[test_case("action", PayloadKind::Action)]
    #[test_case("action_result", PayloadKind::Action)]
    fn test_kind_parses(input: &str, expected: PayloadKind) {
        assert_eq!(input.parse::<PayloadKind>().unwrap(), expected);
    }

    #[test]
    fn test_overlay_keeps_value_when_envelope_is_silent() {
        let mut target = "inner".to_string();
        overlay(&mut target, "");
        assert_eq!(target, "inner");
        overlay(&mut target, "outer");
        assert_eq!(target, "outer");
    }
}
