/// Size of each identity key in bytes.
pub const KEY_SIZE: usize = 32;

/// Length of an encoded device public key in characters.
///
/// Base64 over 33 bytes (key-type tag + Ed25519 verifying key) is exactly
/// 44 characters with no padding, so the whole string stays inside the
/// pairing-code grammar's `[A-Za-z0-9+/]` charset.
pub const DEVICE_PUBKEY_LEN: usize = 44;

/// Key-type tag prepended to the verifying key before encoding.
pub const KEY_TYPE_ED25519: u8 = 0x01;

/// Placeholder display name for a correspondent whose reverse pairing
/// secret has not come back yet.
pub const UNCONFIRMED_NAME: &str = "New";
