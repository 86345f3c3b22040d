//! Envelope encrypt/decrypt round-trip tests.

mod common;

use chrono::{TimeZone, Utc};
use scakit_core::{
    AuthorizationPayload, Connection, ConnectionKeyContext, DecryptedPayload, EnvelopeFormat,
    PayloadDecoder, PayloadKind, ScaError,
};
use serde_json::json;

use common::{authorization_json, enroll, memory_engine, server_seal, CONNECTION_ID};

#[test]
fn test_authorization_round_trip_v1() {
    let engine = memory_engine(EnvelopeFormat::V1);
    let client_key = enroll(&engine, CONNECTION_ID);

    let envelope = server_seal(&authorization_json(), &client_key, EnvelopeFormat::V1);
    let wire = envelope.to_json().unwrap();
    assert!(wire.contains("\"key\""));

    let payload = engine
        .decode(&Connection::new(CONNECTION_ID), &wire, PayloadKind::Authorization)
        .unwrap();
    let DecryptedPayload::Authorization(authorization) = payload else {
        panic!("expected an authorization, got {payload:?}");
    };
    assert_eq!(
        authorization,
        AuthorizationPayload {
            id: "444".to_string(),
            connection_id: CONNECTION_ID.to_string(),
            title: "Payment confirmation".to_string(),
            description: "Transfer 100.00 EUR to ACME Ltd.".to_string(),
            authorization_code: Some("123456".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
            expires_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap(),
            status: None,
        }
    );
    assert!(authorization.is_expired_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap()));
    assert!(!authorization.is_expired_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 4, 59).unwrap()));
}

#[test]
fn test_v2_status_and_numeric_ids() {
    let engine = memory_engine(EnvelopeFormat::V2);
    let client_key = enroll(&engine, "7");

    let mut plaintext = authorization_json();
    plaintext["connection_id"] = json!("7");
    let envelope = server_seal(&plaintext, &client_key, EnvelopeFormat::V2);
    let wire = json!({
        "id": 444,
        "connection_id": 7,
        "status": "confirmed",
        "key": envelope.wrapped_key,
        "iv": envelope.wrapped_iv,
        "data": envelope.ciphertext,
    })
    .to_string();

    let payload = engine
        .decode(&Connection::new("7"), &wire, PayloadKind::Authorization)
        .unwrap();
    let DecryptedPayload::Authorization(authorization) = payload else {
        panic!("expected an authorization, got {payload:?}");
    };
    assert_eq!(authorization.id, "444");
    assert_eq!(authorization.connection_id, "7");
    assert_eq!(authorization.status.as_deref(), Some("confirmed"));
}

#[test]
fn test_action_result_through_decoder() {
    let engine = memory_engine(EnvelopeFormat::V1);
    let client_key = enroll(&engine, CONNECTION_ID);
    let envelope = server_seal(
        &json!({"success": true, "authorization_id": "555"}),
        &client_key,
        EnvelopeFormat::V1,
    );

    let pair = engine.keys().get_key_pair(CONNECTION_ID).unwrap().unwrap();
    let context = ConnectionKeyContext::with_private_key(CONNECTION_ID, pair.into_private_key());
    let payload = PayloadDecoder::new()
        .decode_kind(&envelope, &context, PayloadKind::Action)
        .unwrap();
    assert_eq!(payload.kind(), PayloadKind::Action);
    assert_eq!(payload.connection_id(), CONNECTION_ID);
}

#[test]
fn test_envelope_for_other_connection_is_opaque() {
    let engine = memory_engine(EnvelopeFormat::V1);
    enroll(&engine, CONNECTION_ID);
    let other_key = enroll(&engine, "other");

    let wire = server_seal(&authorization_json(), &other_key, EnvelopeFormat::V1)
        .to_json()
        .unwrap();
    let err = engine
        .decode(&Connection::new(CONNECTION_ID), &wire, PayloadKind::Authorization)
        .unwrap_err();
    assert!(matches!(err, ScaError::DecryptionFailed));
    assert!(err.is_opaque_to_user());
}

#[test]
fn test_envelope_addressed_to_another_connection_is_rejected() {
    let engine = memory_engine(EnvelopeFormat::V1);
    let client_key = enroll(&engine, CONNECTION_ID);
    enroll(&engine, "other");

    let wire = server_seal(&authorization_json(), &client_key, EnvelopeFormat::V1)
        .to_json()
        .unwrap();
    assert!(matches!(
        engine.decode(&Connection::new("other"), &wire, PayloadKind::Authorization),
        Err(ScaError::MalformedEnvelope(_))
    ));
}

#[test]
fn test_unknown_connection_and_malformed_input() {
    let engine = memory_engine(EnvelopeFormat::V1);
    let client_key = enroll(&engine, CONNECTION_ID);
    let wire = server_seal(&authorization_json(), &client_key, EnvelopeFormat::V1)
        .to_json()
        .unwrap();

    assert!(matches!(
        engine.decode(&Connection::new("missing"), &wire, PayloadKind::Authorization),
        Err(ScaError::KeyNotAvailable(guid)) if guid == "missing"
    ));
    assert!(matches!(
        engine.decode(&Connection::new(CONNECTION_ID), "{", PayloadKind::Authorization),
        Err(ScaError::MalformedEnvelope(_))
    ));
    assert!(matches!(
        engine.decode(&Connection::new(CONNECTION_ID), &wire, PayloadKind::Consent),
        Err(ScaError::MalformedPayload(_))
    ));
}

#[test]
fn test_seal_for_provider_and_open_with_its_key() {
    let engine = memory_engine(EnvelopeFormat::V1);
    let provider = memory_engine(EnvelopeFormat::V1);
    enroll(&engine, CONNECTION_ID);
    let provider_pem = provider.create_or_replace_key_pair(CONNECTION_ID).unwrap();

    let connection = Connection::new(CONNECTION_ID).with_provider_key(provider_pem);
    let envelope = engine
        .seal(&connection, "999", &authorization_json())
        .unwrap();
    let payload = provider
        .decode(
            &Connection::new(CONNECTION_ID),
            &envelope.to_json().unwrap(),
            PayloadKind::Authorization,
        )
        .unwrap();
    // Envelope ids override the ids inside the plaintext.
    let DecryptedPayload::Authorization(authorization) = payload else {
        panic!("expected an authorization, got {payload:?}");
    };
    assert_eq!(authorization.id, "999");

    assert!(matches!(
        engine.seal(&Connection::new(CONNECTION_ID), "1", &authorization_json()),
        Err(ScaError::InvalidKeyMaterial(_))
    ));
}
