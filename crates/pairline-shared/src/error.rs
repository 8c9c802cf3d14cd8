use thiserror::Error;

/// Failures of the durable identity key store.
///
/// Only the save path surfaces these: a failed read is treated as first
/// run and answered by regenerating keys, but a failed write would
/// desynchronize the device identity from disk and is fatal.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("failed to write key file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize key record: {0}")]
    Serialize(#[from] serde_json::Error),
}
