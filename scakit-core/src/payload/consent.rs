use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overlay, EnvelopePayload, PayloadKind};
use crate::envelope::EncryptedEnvelope;

/// An account covered by a consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentAccount {
    /// Display name.
    pub name: String,
    /// Domestic account number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    /// UK sort code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_code: Option<String>,
    /// IBAN, when the bank exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
}

/// Which data categories the third party may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsentSharedData {
    /// Account balances.
    #[serde(default)]
    pub balance: bool,
    /// Transaction history.
    #[serde(default)]
    pub transactions: bool,
}

/// A consent granted to a third-party provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPayload {
    /// Server identifier of the consent.
    #[serde(default)]
    pub id: String,
    /// Connection the consent belongs to.
    #[serde(default)]
    pub connection_id: String,
    /// Name of the third party the consent was granted to.
    pub tpp_name: String,
    /// E.g. `aisp`, `pisp_future`.
    pub consent_type: String,
    /// Accounts the consent covers.
    #[serde(default)]
    pub accounts: Vec<ConsentAccount>,
    /// Shared data categories, if the consent restricts them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_data: Option<ConsentSharedData>,
    /// When the consent was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the consent lapses.
    pub expires_at: DateTime<Utc>,
}

impl EnvelopePayload for ConsentPayload {
    const KIND: PayloadKind = PayloadKind::Consent;

    fn enrich(&mut self, envelope: &EncryptedEnvelope) {
        overlay(&mut self.id, &envelope.id);
        overlay(&mut self.connection_id, &envelope.connection_id);
    }
}
