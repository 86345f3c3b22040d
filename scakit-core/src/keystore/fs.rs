//! File-backed key store for desktop hosts and the CLI.
//!
//! Layout under the store directory:
//!
//! ```text
//! <root>/keys/<hex(alias)>.pem      PKCS#8 PEM private key
//! <root>/secrets/<hex(alias)>.key   raw symmetric key || fixed IV
//! ```
//!
//! Aliases are hex-encoded so that any string is a valid file name. Writes
//! go to a dot-prefixed temporary file which is synced and then renamed
//! over the target.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{check_alias, KeyStoreError, KeyStoreResult, SecretKeyStore};
use crate::crypto::encoding::{parse_private_key, private_key_to_pem};
use crate::crypto::{RsaKeyPair, SymmetricKey};

const KEYS_DIR: &str = "keys";
const SECRETS_DIR: &str = "secrets";
const KEY_PAIR_EXT: &str = "pem";
const SYMMETRIC_EXT: &str = "key";

fn io_error(context: impl AsRef<str>, err: std::io::Error) -> KeyStoreError {
    KeyStoreError::Io(format!("{}: {err}", context.as_ref()))
}

/// [`SecretKeyStore`] persisting keys as files in a private directory.
pub struct FsKeyStore {
    root: PathBuf,
    // serializes get-or-create of symmetric keys within this process
    create_lock: Mutex<()>,
}

impl FsKeyStore {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Io`] if the directories cannot be created.
    pub fn open<P: AsRef<Path>>(root: P) -> KeyStoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [KEYS_DIR, SECRETS_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| {
                io_error(format!("failed to create '{}'", path.display()), e)
            })?;
        }
        Ok(Self {
            root,
            create_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_pair_path(&self, alias: &str) -> PathBuf {
        self.root
            .join(KEYS_DIR)
            .join(format!("{}.{KEY_PAIR_EXT}", hex::encode(alias)))
    }

    fn symmetric_path(&self, alias: &str) -> PathBuf {
        self.root
            .join(SECRETS_DIR)
            .join(format!("{}.{SYMMETRIC_EXT}", hex::encode(alias)))
    }

    fn read_optional(path: &Path) -> KeyStoreResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(format!("failed to read '{}'", path.display()), e)),
        }
    }

    fn remove_optional(path: &Path) -> KeyStoreResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(format!("failed to delete '{}'", path.display()), e)),
        }
    }

    fn write_atomic(path: &Path, data: &[u8]) -> KeyStoreResult<()> {
        let dir = path
            .parent()
            .ok_or_else(|| KeyStoreError::Io(format!("'{}' has no parent", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = dir.join(format!(".{file_name}.tmp"));

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path).map_err(|e| {
            io_error(format!("failed to create '{}'", temp_path.display()), e)
        })?;
        file.write_all(data)
            .and_then(|()| file.sync_all())
            .map_err(|e| io_error(format!("failed to write '{}'", temp_path.display()), e))?;
        drop(file);

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            io_error(
                format!("failed to rename '{}' to '{}'", temp_path.display(), path.display()),
                e,
            )
        })?;

        #[cfg(unix)]
        File::open(dir)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| io_error(format!("failed to sync '{}'", dir.display()), e))?;
        Ok(())
    }
}

impl SecretKeyStore for FsKeyStore {
    fn generate_asymmetric_key_pair(
        &self,
        alias: &str,
        bits: usize,
    ) -> KeyStoreResult<RsaKeyPair> {
        check_alias(alias)?;
        let pair = RsaKeyPair::generate(bits)
            .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
        let pem = private_key_to_pem(pair.private_key())
            .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
        Self::write_atomic(&self.key_pair_path(alias), pem.as_bytes())?;
        Ok(pair)
    }

    fn get_asymmetric_key_pair(&self, alias: &str) -> KeyStoreResult<Option<RsaKeyPair>> {
        let Some(data) = Self::read_optional(&self.key_pair_path(alias))? else {
            return Ok(None);
        };
        let pem = std::str::from_utf8(&data)
            .map_err(|_| KeyStoreError::corrupted(alias, "key file is not UTF-8"))?;
        let private = parse_private_key(pem)
            .map_err(|e| KeyStoreError::corrupted(alias, e.to_string()))?;
        Ok(Some(RsaKeyPair::from_private_key(private)))
    }

    fn delete_entry(&self, alias: &str) -> KeyStoreResult<()> {
        Self::remove_optional(&self.key_pair_path(alias))?;
        Self::remove_optional(&self.symmetric_path(alias))
    }

    fn list_aliases(&self) -> KeyStoreResult<Vec<String>> {
        let dir = self.root.join(KEYS_DIR);
        let entries = fs::read_dir(&dir)
            .map_err(|e| io_error(format!("failed to list '{}'", dir.display()), e))?;

        let mut aliases = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| io_error(format!("failed to list '{}'", dir.display()), e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(KEY_PAIR_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            // temp files and foreign names are not entries
            let Some(alias) = hex::decode(stem)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
            else {
                continue;
            };
            aliases.push(alias);
        }
        aliases.sort();
        Ok(aliases)
    }

    fn generate_or_get_symmetric_key(&self, alias: &str) -> KeyStoreResult<SymmetricKey> {
        check_alias(alias)?;
        let _guard = self
            .create_lock
            .lock()
            .map_err(|e| KeyStoreError::Lock(format!("create lock poisoned: {e}")))?;

        if let Some(key) = self.get_symmetric_key(alias)? {
            return Ok(key);
        }
        let key = SymmetricKey::generate();
        Self::write_atomic(&self.symmetric_path(alias), &key.to_bytes())?;
        Ok(key)
    }

    fn get_symmetric_key(&self, alias: &str) -> KeyStoreResult<Option<SymmetricKey>> {
        let Some(data) = Self::read_optional(&self.symmetric_path(alias))? else {
            return Ok(None);
        };
        SymmetricKey::from_bytes(&data)
            .map(Some)
            .ok_or_else(|| KeyStoreError::corrupted(alias, "unexpected symmetric key length"))
    }
}
