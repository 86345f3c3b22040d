use std::fs;
use std::io::{self, Read};
use std::path::Path;

use eyre::WrapErr;
use scakit_core::{Connection, LocalSecretBlob, ScaEngine};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::Command;

#[derive(Serialize)]
struct KeyInfo<'a> {
    alias: &'a str,
    public_key_pem: String,
}

/// Runs `command` and returns what should be printed.
pub(crate) fn run(engine: &ScaEngine, command: Command) -> eyre::Result<String> {
    match command {
        Command::Keygen { alias } => {
            let public_key_pem = engine.create_or_replace_key_pair(&alias)?;
            tracing::info!(%alias, "key pair created");
            Ok(serde_json::to_string_pretty(&KeyInfo {
                alias: &alias,
                public_key_pem,
            })?)
        }
        Command::PublicKey { alias } => engine
            .public_key_pem(&alias)?
            .ok_or_else(|| eyre::eyre!("no key pair for {alias}")),
        Command::List => Ok(serde_json::to_string_pretty(&engine.list_aliases()?)?),
        Command::Delete { aliases } => {
            let count = aliases.len();
            engine.delete_key_pairs(aliases)?;
            Ok(format!("deleted {count} key pair(s)"))
        }
        Command::Seal {
            provider_key,
            connection_id,
            id,
            input,
        } => {
            let pem = fs::read_to_string(&provider_key)
                .wrap_err_with(|| format!("reading {}", provider_key.display()))?;
            let payload = read_input(input.as_deref())?;
            let connection = Connection::new(connection_id).with_provider_key(pem);
            Ok(engine.seal_json(connection, &id, &payload)?)
        }
        Command::Open {
            connection_id,
            kind,
            input,
        } => {
            let envelope = read_input(input.as_deref())?;
            let payload = engine.decode(&Connection::new(connection_id), &envelope, kind)?;
            Ok(serde_json::to_string_pretty(&payload)?)
        }
        Command::Sign {
            alias,
            method,
            url,
            expires_at,
            body,
        } => Ok(engine.sign_request(&alias, method, url, expires_at, body)?),
        Command::Protect => {
            let secret = read_secret(io::stdin().lock())?;
            Ok(engine.protect(&secret)?.into_string())
        }
        Command::Reveal { blob } => {
            let secret = engine.reveal(&LocalSecretBlob::from(blob))?;
            Ok(secret.expose_secret().to_owned())
        }
        Command::Forget => {
            engine.forget_local_secret()?;
            Ok("local secret key deleted".to_string())
        }
    }
}

/// Reads a file, or stdin when `path` is `None` or `-`.
fn read_input(path: Option<&Path>) -> eyre::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .wrap_err("reading stdin")?;
            Ok(buf)
        }
    }
}

/// Reads one line and drops the line terminator.
fn read_secret<R: Read>(mut reader: R) -> eyre::Result<SecretString> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf).wrap_err("reading secret")?;
    let line = buf.lines().next().unwrap_or_default();
    Ok(SecretString::from(line.to_owned()))
}
