//! `scakit` developer CLI.
//!
//! Drives the same engine the mobile apps use, backed by a key store on disk,
//! so envelopes and signatures can be produced and inspected by hand.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use scakit_core::defaults::DEFAULT_RSA_KEY_BITS;
use scakit_core::{
    EngineConfig, EnvelopeFormat, FsKeyStore, LocalSecretNonce, PayloadKind, ScaEngine,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scakit", version, about = "SCAKit developer CLI")]
struct Cli {
    /// Key store directory. Defaults to `<data dir>/scakit`.
    #[arg(long, env = "SCAKIT_STORE_DIR", global = true)]
    store_dir: Option<PathBuf>,

    /// Envelope format spoken by the server (`v1` or `v2`).
    #[arg(long, env = "SCAKIT_FORMAT", default_value = "v1", global = true)]
    format: EnvelopeFormat,

    /// RSA modulus size for new connection keys.
    #[arg(long, env = "SCAKIT_RSA_KEY_BITS", default_value_t = DEFAULT_RSA_KEY_BITS, global = true)]
    key_bits: usize,

    /// Nonce policy for new local secrets (`random` or `fixed-legacy`).
    #[arg(long, env = "SCAKIT_LOCAL_SECRET_NONCE", default_value = "random", global = true)]
    local_secret_nonce: LocalSecretNonce,

    /// Log engine activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or replace the key pair of a connection and print its public key.
    Keygen {
        /// Connection GUID.
        alias: String,
    },
    /// Print the public key of a connection.
    PublicKey {
        /// Connection GUID.
        alias: String,
    },
    /// List connections with a stored key pair.
    List,
    /// Delete connection key pairs.
    Delete {
        /// Connection GUIDs.
        #[arg(required = true)]
        aliases: Vec<String>,
    },
    /// Seal a JSON payload for a provider and print the wire envelope.
    Seal {
        /// PEM file holding the provider's public key.
        #[arg(long)]
        provider_key: PathBuf,
        /// Connection GUID written into the envelope.
        #[arg(long)]
        connection_id: String,
        /// Envelope id.
        #[arg(long)]
        id: String,
        /// Payload file; stdin when omitted or `-`.
        input: Option<PathBuf>,
    },
    /// Open a wire envelope and print the decrypted payload.
    Open {
        /// Connection GUID whose key opens the envelope.
        #[arg(long)]
        connection_id: String,
        /// Expected payload shape.
        #[arg(long, default_value = "authorization")]
        kind: PayloadKind,
        /// Envelope file; stdin when omitted or `-`.
        input: Option<PathBuf>,
    },
    /// Sign a request with a connection key.
    Sign {
        /// Connection GUID.
        #[arg(long)]
        alias: String,
        /// HTTP method.
        #[arg(long)]
        method: String,
        /// Absolute request URL.
        #[arg(long)]
        url: String,
        /// Expiry as Unix seconds.
        #[arg(long)]
        expires_at: i64,
        /// Request body.
        #[arg(long, default_value = "")]
        body: String,
    },
    /// Encrypt a local secret read from stdin.
    Protect,
    /// Decrypt a local secret blob.
    Reveal {
        /// Base64 blob printed by `protect`.
        blob: String,
    },
    /// Delete the local-secret key.
    Forget,
}

impl Cli {
    fn store_dir(&self) -> eyre::Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("scakit"))
                .ok_or_else(|| eyre!("cannot determine a data directory, pass --store-dir")),
        }
    }

    fn engine(&self) -> eyre::Result<ScaEngine> {
        let root = self.store_dir()?;
        let store = FsKeyStore::open(&root)
            .wrap_err_with(|| format!("opening key store at {}", root.display()))?;
        let config = EngineConfig::default()
            .with_rsa_key_bits(self.key_bits)
            .with_envelope_format(self.format)
            .with_local_secret_nonce(self.local_secret_nonce);
        tracing::debug!(store = %root.display(), ?config, "engine ready");
        Ok(ScaEngine::with_store(Arc::new(store), config)?)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "scakit_core=debug,scakit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let engine = cli.engine()?;
    let output = commands::run(&engine, cli.command)?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scakit",
            "open",
            "--connection-id",
            "333",
            "--kind",
            "action_result",
            "--format",
            "V2",
            "--store-dir",
            "/tmp/scakit",
        ])
        .unwrap();
        assert_eq!(cli.format, EnvelopeFormat::V2);
        assert_eq!(cli.store_dir().unwrap(), PathBuf::from("/tmp/scakit"));
        assert!(matches!(
            cli.command,
            Command::Open {
                kind: PayloadKind::Action,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["scakit", "list", "--format", "v3"]).is_err());
    }

    #[test]
    fn test_delete_requires_an_alias() {
        assert!(Cli::try_parse_from(["scakit", "delete"]).is_err());
    }
}
