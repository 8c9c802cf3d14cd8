//! # pairline-shared
//!
//! Types shared across the Pairline workspace: the device identity keys and
//! their on-disk store, the pairing code codec, and the correspondent model.

pub mod constants;
pub mod keys;
pub mod pairing_code;
pub mod types;

mod error;

pub use error::KeyStoreError;
pub use keys::{DeviceKeys, KeyStore};
pub use pairing_code::{PairingCode, PairingCodeError};
pub use types::{Correspondent, DeviceAddress, PairingState};
