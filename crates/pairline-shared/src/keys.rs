//! Device identity keys and their durable store.
//!
//! Each installation carries a permanent identity key plus a rotating pair
//! of temporary keys. The three are persisted together as one JSON record
//! with base64 text fields; a partial record never hits disk because the
//! store writes a temp file and renames it over the old one.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{KEY_SIZE, KEY_TYPE_ED25519};
use crate::error::KeyStoreError;

/// The three identity keys of a device installation.
///
/// `permanent` is never rotated after creation. `temp` and `prev_temp`
/// rotate together: the previous key is retained one generation back so
/// in-flight protocol steps remain verifiable during rotation.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceKeys {
    pub permanent: [u8; KEY_SIZE],
    pub temp: [u8; KEY_SIZE],
    pub prev_temp: [u8; KEY_SIZE],
}

impl DeviceKeys {
    /// Generate three independent keys from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            permanent: random_key(),
            temp: random_key(),
            prev_temp: random_key(),
        }
    }

    /// Encoded public identity: base64 over a key-type tag plus the
    /// Ed25519 verifying key derived from the permanent key. Always 44
    /// characters of `[A-Za-z0-9+/]`.
    pub fn pubkey(&self) -> String {
        let verifying = SigningKey::from_bytes(&self.permanent).verifying_key();
        let mut tagged = [0u8; KEY_SIZE + 1];
        tagged[0] = KEY_TYPE_ED25519;
        tagged[1..].copy_from_slice(verifying.as_bytes());
        STANDARD.encode(tagged)
    }

    /// The same identity with freshly rotated temporary keys.
    pub fn with_rotated(&self, temp: [u8; KEY_SIZE], prev_temp: [u8; KEY_SIZE]) -> Self {
        Self {
            permanent: self.permanent,
            temp,
            prev_temp,
        }
    }
}

fn random_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    key
}

/// On-disk key record. No version field: absence or corruption are both
/// treated as "must regenerate".
#[derive(Serialize, Deserialize)]
struct StoredKeys {
    permanent_key: String,
    temp_key: String,
    prev_temp_key: String,
}

/// Durable store for the identity key record.
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record, or treat any failure as first run:
    /// generate three fresh keys, persist them, and return them. A missing
    /// file never fails the caller; only the write of the fresh record can.
    pub async fn load(&self) -> Result<DeviceKeys, KeyStoreError> {
        if let Some(keys) = self.try_read().await {
            return Ok(keys);
        }
        info!(path = %self.path.display(), "no usable key file, generating fresh device keys");
        let keys = DeviceKeys::generate();
        self.save(&keys).await?;
        Ok(keys)
    }

    /// Overwrite the persisted record with all three keys. A write failure
    /// is fatal to the caller: the on-disk identity can no longer be
    /// trusted to match the in-memory one.
    pub async fn save(&self, keys: &DeviceKeys) -> Result<(), KeyStoreError> {
        let record = StoredKeys {
            permanent_key: STANDARD.encode(keys.permanent),
            temp_key: STANDARD.encode(keys.temp),
            prev_temp_key: STANDARD.encode(keys.prev_temp),
        };
        let json = serde_json::to_string_pretty(&record)?;

        info!(path = %self.path.display(), "writing device keys");

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Temp file + rename, so a crash mid-write leaves the old record.
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn try_read(&self) -> Option<DeviceKeys> {
        let data = tokio::fs::read_to_string(&self.path).await.ok()?;
        let record: StoredKeys = serde_json::from_str(&data).ok()?;
        Some(DeviceKeys {
            permanent: decode_key(&record.permanent_key)?,
            temp: decode_key(&record.temp_key)?,
            prev_temp: decode_key(&record.prev_temp_key)?,
        })
    }
}

fn decode_key(field: &str) -> Option<[u8; KEY_SIZE]> {
    let bytes = STANDARD.decode(field).ok()?;
    bytes.try_into().ok()
}
