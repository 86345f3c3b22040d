//! File-backed key store integration tests.

#![cfg(not(target_arch = "wasm32"))]

mod common;

use scakit_core::crypto::encoding::parse_public_key;
use scakit_core::crypto::verify_request_signature;
use scakit_core::{Connection, EnvelopeFormat, LocalSecretBlob, PayloadKind, ScaError, SignedRequest};
use secrecy::{ExposeSecret, SecretString};

use common::{authorization_json, enroll, fs_engine, server_seal, CONNECTION_ID};

#[test]
fn test_keys_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let client_key = enroll(&fs_engine(dir.path()), CONNECTION_ID);
    let wire = server_seal(&authorization_json(), &client_key, EnvelopeFormat::V1)
        .to_json()
        .unwrap();

    let reopened = fs_engine(dir.path());
    assert!(reopened.key_pair_exists(CONNECTION_ID).unwrap());
    assert_eq!(reopened.list_aliases().unwrap(), vec![CONNECTION_ID.to_string()]);
    let payload = reopened
        .decode(&Connection::new(CONNECTION_ID), &wire, PayloadKind::Authorization)
        .unwrap();
    assert_eq!(payload.connection_id(), CONNECTION_ID);
}

#[test]
fn test_replacing_a_key_orphans_old_envelopes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fs_engine(dir.path());
    let old_key = enroll(&engine, CONNECTION_ID);
    let wire = server_seal(&authorization_json(), &old_key, EnvelopeFormat::V1)
        .to_json()
        .unwrap();

    let new_key = enroll(&engine, CONNECTION_ID);
    assert_ne!(old_key, new_key);
    assert!(matches!(
        engine.decode(&Connection::new(CONNECTION_ID), &wire, PayloadKind::Authorization),
        Err(ScaError::DecryptionFailed)
    ));
}

#[test]
fn test_delete_key_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fs_engine(dir.path());
    enroll(&engine, "a");
    enroll(&engine, "b");

    engine
        .delete_key_pairs(vec!["a".to_string(), "missing".to_string()])
        .unwrap();
    assert!(!engine.key_pair_exists("a").unwrap());
    assert!(engine.public_key_pem("a").unwrap().is_none());
    assert_eq!(fs_engine(dir.path()).list_aliases().unwrap(), vec!["b"]);
}

#[test]
fn test_local_secret_survives_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let blob = fs_engine(dir.path())
        .protect(&SecretString::from("2468".to_string()))
        .unwrap();

    let reopened = fs_engine(dir.path());
    let stored = LocalSecretBlob::from(blob.as_str().to_string());
    let revealed = reopened.reveal(&stored).unwrap();
    assert_eq!(revealed.expose_secret(), "2468");

    reopened.forget_local_secret().unwrap();
    assert!(matches!(
        fs_engine(dir.path()).reveal(&blob),
        Err(ScaError::DecryptionFailed)
    ));
}

#[test]
fn test_signed_request_verifies_against_enrolled_key() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fs_engine(dir.path());
    enroll(&engine, CONNECTION_ID);

    let signature = engine
        .sign_request(
            CONNECTION_ID,
            "PUT".to_string(),
            "https://bank.example/api/authenticator/v1/authorizations/444".to_string(),
            1_767_225_600,
            r#"{"data":{"confirm":true}}"#.to_string(),
        )
        .unwrap();

    let public_pem = engine.public_key_pem(CONNECTION_ID).unwrap().unwrap();
    let request = SignedRequest {
        method: "put".to_string(),
        url: "https://bank.example/api/authenticator/v1/authorizations/444".to_string(),
        expires_at: 1_767_225_600,
        body: r#"{"data":{"confirm":true}}"#.to_string(),
    };
    assert!(verify_request_signature(
        &parse_public_key(&public_pem).unwrap(),
        &request,
        &signature
    ));
}
