//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rsa::RsaPublicKey;
use scakit_core::crypto::encoding::parse_public_key;
use scakit_core::{
    EncryptedEnvelope, EngineConfig, EnvelopeFormat, FsKeyStore, HybridCryptoEngine,
    MemoryKeyStore, ScaEngine,
};
use serde_json::{json, Value};

/// Connection id shared by the integration tests.
pub const CONNECTION_ID: &str = "333";

/// An engine backed by an in-memory store.
pub fn memory_engine(format: EnvelopeFormat) -> ScaEngine {
    ScaEngine::with_store(
        Arc::new(MemoryKeyStore::new()),
        EngineConfig::default().with_envelope_format(format),
    )
    .unwrap()
}

/// An engine backed by a file store rooted at `root`.
pub fn fs_engine(root: &Path) -> ScaEngine {
    ScaEngine::with_store(
        Arc::new(FsKeyStore::open(root).unwrap()),
        EngineConfig::default(),
    )
    .unwrap()
}

/// Creates the connection key pair and returns its public half, as the
/// server would receive it at enrollment.
pub fn enroll(engine: &ScaEngine, connection_id: &str) -> RsaPublicKey {
    let pem = engine.create_or_replace_key_pair(connection_id).unwrap();
    parse_public_key(&pem).unwrap()
}

/// The authorization document a server would encrypt, with second precision
/// timestamps.
pub fn authorization_json() -> Value {
    json!({
        "id": "444",
        "connection_id": CONNECTION_ID,
        "title": "Payment confirmation",
        "description": "Transfer 100.00 EUR to ACME Ltd.",
        "authorization_code": "123456",
        "created_at": Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        "expires_at": Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap(),
    })
}

/// Seals `payload` the way the server does.
pub fn server_seal(
    payload: &Value,
    client_key: &RsaPublicKey,
    format: EnvelopeFormat,
) -> EncryptedEnvelope {
    HybridCryptoEngine::new()
        .seal_envelope("444", CONNECTION_ID, payload, client_key, format)
        .unwrap()
}
