//! Pairing handshake state machine.
//!
//! One invitation attempt per machine: the operator's pairing code has
//! already been parsed, and the machine walks the two-phase invitation
//! protocol against the transport. Success here only means the invitation
//! went out; pairing is final when the transport raises
//! [`crate::NetEvent::Paired`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use pairline_shared::constants::UNCONFIRMED_NAME;
use pairline_shared::DeviceAddress;

use crate::transport::{Transport, TransportError};

/// States of one invitation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingSelfCheck,
    RegisteringCorrespondent,
    WaitingForReversePairing,
    SendingInvitation,
    Completed,
    Failed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The counterpart pubkey is this device's own key. Never reaches the
    /// network.
    #[error("cannot pair with myself")]
    SelfPairingRejected,

    /// Opaque transport failure, surfaced verbatim.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Drives the two-phase invitation protocol.
pub struct PairingHandshake<T: Transport> {
    transport: Arc<T>,
    state: HandshakeState,
}

impl<T: Transport> PairingHandshake<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Accept an invitation from a counterpart device.
    ///
    /// Registers the correspondent (placeholder name, unconfirmed), begins
    /// waiting for the reverse pairing, then sends the invitation carrying
    /// both secrets. Returns the correspondent's device address; the
    /// unconfirmed record is kept even when the send fails, so the
    /// operator can retry by re-sending rather than re-registering.
    pub async fn accept_invitation(
        &mut self,
        hub_host: &str,
        pubkey: &str,
        secret: &str,
    ) -> Result<DeviceAddress, HandshakeError> {
        let result = self.run(hub_host, pubkey, secret).await;
        match &result {
            Ok(address) => {
                self.state = HandshakeState::Completed;
                info!(pubkey, address = %address, "invitation accepted");
            }
            Err(e) => {
                self.state = HandshakeState::Failed;
                warn!(pubkey, error = %e, "invitation failed");
            }
        }
        result
    }

    async fn run(
        &mut self,
        hub_host: &str,
        pubkey: &str,
        secret: &str,
    ) -> Result<DeviceAddress, HandshakeError> {
        self.state = HandshakeState::AwaitingSelfCheck;
        if pubkey == self.transport.own_pubkey() {
            return Err(HandshakeError::SelfPairingRejected);
        }

        // Register before sending anything, so inbound messages from the
        // counterpart can already be routed while the handshake completes.
        self.state = HandshakeState::RegisteringCorrespondent;
        let address = self
            .transport
            .register_unconfirmed_correspondent(pubkey, hub_host, UNCONFIRMED_NAME)
            .await?;

        self.state = HandshakeState::WaitingForReversePairing;
        let reverse = self.transport.begin_waiting_for_reverse_pairing().await?;

        self.state = HandshakeState::SendingInvitation;
        self.transport
            .send_pairing_message(hub_host, pubkey, secret, &reverse.secret)
            .await?;

        Ok(address)
    }
}
