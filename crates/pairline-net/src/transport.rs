//! The transport collaborator boundary.
//!
//! Everything below the pairing protocol — message delivery, the
//! correspondent address book, key registration — lives behind the
//! [`Transport`] trait. The handshake and the session router only ever
//! talk to this seam, so they run unchanged against the in-process hub,
//! a test fake, or a real network hub client.

use async_trait::async_trait;
use thiserror::Error;

use pairline_shared::constants::KEY_SIZE;
use pairline_shared::{Correspondent, DeviceAddress};

/// Opaque transport failures. The core surfaces these verbatim and never
/// reinterprets them; retries, if any, are the transport's business.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("unknown correspondent {0}")]
    UnknownCorrespondent(DeviceAddress),

    #[error("pairing rejected: {0}")]
    PairingRejected(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Kind tag of a device-to-device message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
        }
    }
}

/// Fresh wait-state for the symmetric half of a pairing: the secret this
/// device offers back so the counterpart can confirm the pairing too.
#[derive(Debug, Clone)]
pub struct ReversePairingInfo {
    pub secret: String,
}

/// Capability set consumed from the transport collaborator.
///
/// The device identity is supplied when the transport is constructed;
/// asynchronous signals (paired, text received, key rotation) arrive on
/// the [`crate::EventReceiver`] handed out alongside it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Encoded public key of this device.
    fn own_pubkey(&self) -> String;

    /// Replace the rotating temporary key pair held by the transport.
    async fn set_rotating_keys(
        &self,
        temp: [u8; KEY_SIZE],
        prev_temp: [u8; KEY_SIZE],
    ) -> Result<(), TransportError>;

    /// Set the display name announced to correspondents.
    async fn set_display_name(&self, name: &str) -> Result<(), TransportError>;

    /// Set the relay host this device is reachable through.
    async fn set_relay_host(&self, host: &str) -> Result<(), TransportError>;

    /// Create an unconfirmed correspondent entry so inbound messages have
    /// somewhere to route while the handshake completes. Returns the local
    /// device address handle.
    async fn register_unconfirmed_correspondent(
        &self,
        pubkey: &str,
        hub_host: &str,
        name: &str,
    ) -> Result<DeviceAddress, TransportError>;

    /// Begin waiting for a reverse pairing confirmation; returns the fresh
    /// secret to hand back to the counterpart.
    async fn begin_waiting_for_reverse_pairing(&self)
        -> Result<ReversePairingInfo, TransportError>;

    /// Deliver a pairing message carrying the received invitation secret
    /// and this device's reverse secret. One completion, no retry.
    async fn send_pairing_message(
        &self,
        hub_host: &str,
        pubkey: &str,
        secret: &str,
        reverse_secret: &str,
    ) -> Result<(), TransportError>;

    /// Fire-and-forget delivery of a typed message to a correspondent.
    async fn send_message(
        &self,
        to: &DeviceAddress,
        kind: MessageKind,
        payload: &str,
    ) -> Result<(), TransportError>;

    /// Look up a correspondent record by its local address.
    async fn correspondent(&self, address: &DeviceAddress) -> Result<Correspondent, TransportError>;
}
