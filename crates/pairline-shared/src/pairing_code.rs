//! Pairing code codec.
//!
//! A pairing code is the human-transcribable string a device shares so a
//! counterpart can initiate pairing: `[scheme:]pubkey@hub_host#secret`.
//! Parsing is pure and happens entirely before any network interaction.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::constants::DEVICE_PUBKEY_LEN;

/// Structured fields of a valid pairing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCode {
    /// Encoded public key of the counterpart device (44 chars).
    pub pubkey: String,
    /// Relay host the counterpart is reachable through.
    pub hub_host: String,
    /// One-time secret proving the invitation's authenticity.
    pub secret: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairingCodeError {
    #[error("invalid pairing code")]
    InvalidFormat,

    #[error("invalid pubkey length")]
    InvalidPubkeyLength,
}

fn grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Optional scheme prefix is accepted and discarded. The match is
        // anchored at both ends.
        Regex::new(r"^(?:\w+:)?([\w/+]+)@([\w.:/-]+)#([\w/+-]+)$").expect("valid grammar")
    })
}

impl PairingCode {
    /// Parse and validate a hand-entered pairing code.
    ///
    /// The whole string must match the grammar (`InvalidFormat`), then the
    /// pubkey must be exactly 44 characters (`InvalidPubkeyLength`).
    pub fn parse(code: &str) -> Result<Self, PairingCodeError> {
        let captures = grammar()
            .captures(code)
            .ok_or(PairingCodeError::InvalidFormat)?;

        let pubkey = captures[1].to_string();
        if pubkey.len() != DEVICE_PUBKEY_LEN {
            return Err(PairingCodeError::InvalidPubkeyLength);
        }

        Ok(Self {
            pubkey,
            hub_host: captures[2].to_string(),
            secret: captures[3].to_string(),
        })
    }
}

impl FromStr for PairingCode {
    type Err = PairingCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.pubkey, self.hub_host, self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_pubkey() -> String {
        "A".repeat(DEVICE_PUBKEY_LEN)
    }

    #[test]
    fn test_valid_code() {
        let code = format!("{}@byteball.org/bb-test#0000", valid_pubkey());
        let parsed = PairingCode::parse(&code).unwrap();
        assert_eq!(parsed.pubkey, valid_pubkey());
        assert_eq!(parsed.hub_host, "byteball.org/bb-test");
        assert_eq!(parsed.secret, "0000");
    }

    #[test]
    fn test_scheme_prefix_ignored() {
        let code = format!("obyte:{}@hub.example.org:6611#s3cret", valid_pubkey());
        let parsed = PairingCode::parse(&code).unwrap();
        assert_eq!(parsed.hub_host, "hub.example.org:6611");
        assert_eq!(parsed.secret, "s3cret");
    }

    #[test]
    fn test_not_a_code() {
        assert_eq!(
            PairingCode::parse("not-a-code"),
            Err(PairingCodeError::InvalidFormat)
        );
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let code = format!("{}@hub#secret extra", valid_pubkey());
        assert_eq!(
            PairingCode::parse(&code),
            Err(PairingCodeError::InvalidFormat)
        );
    }

    #[test]
    fn test_missing_secret_rejected() {
        let code = format!("{}@hub", valid_pubkey());
        assert_eq!(
            PairingCode::parse(&code),
            Err(PairingCodeError::InvalidFormat)
        );
    }

    #[test]
    fn test_short_pubkey_rejected() {
        assert_eq!(
            PairingCode::parse("abc@byteball.org/bb-test#0000"),
            Err(PairingCodeError::InvalidPubkeyLength)
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let code = format!("{}@byteball.org/bb-test#0000", valid_pubkey());
        let parsed = PairingCode::parse(&code).unwrap();
        assert_eq!(parsed.to_string(), code);
    }
}
