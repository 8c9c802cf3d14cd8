use serde::{Deserialize, Serialize};

/// Local handle for a remote device, derived deterministically from its
/// encoded public key: `0` followed by 32 uppercase hex characters of the
/// blake3 hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceAddress(pub String);

impl DeviceAddress {
    /// Derive the address for an encoded device public key.
    pub fn from_pubkey(pubkey: &str) -> Self {
        let hash = blake3::hash(pubkey.as_bytes());
        let hex = hex::encode(&hash.as_bytes()[..16]).to_uppercase();
        Self(format!("0{hex}"))
    }

    pub fn short(&self) -> String {
        self.0[..9.min(self.0.len())].to_string()
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pairing state of a correspondent as known locally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PairingState {
    /// Invitation sent, reverse pairing secret not yet received.
    Unconfirmed,
    /// Mutual pairing confirmed.
    Paired,
}

/// A remote device identity as known locally.
///
/// The transport collaborator owns the persistent record; the core only
/// creates it, waits on confirmation, and reads the display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correspondent {
    pub address: DeviceAddress,
    /// Relay host the correspondent is reachable through.
    pub hub: String,
    pub name: String,
    pub state: PairingState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_shape() {
        let addr = DeviceAddress::from_pubkey("A".repeat(44).as_str());
        assert_eq!(addr.0.len(), 33);
        assert!(addr.0.starts_with('0'));
        assert!(addr.0[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_address_deterministic() {
        let a = DeviceAddress::from_pubkey("pubkey-one");
        let b = DeviceAddress::from_pubkey("pubkey-one");
        let c = DeviceAddress::from_pubkey("pubkey-two");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
