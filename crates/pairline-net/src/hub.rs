//! In-process hub: routes pairing and text messages between connected
//! devices and owns the correspondent address book.
//!
//! This is the transport collaborator the binary and the test suite run
//! against. A network hub client would implement the same [`Transport`]
//! trait; nothing above this seam knows the difference.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::{debug, info};

use async_trait::async_trait;

use pairline_shared::constants::KEY_SIZE;
use pairline_shared::{Correspondent, DeviceAddress, DeviceKeys, PairingState};

use crate::events::{event_channel, EventReceiver, EventSender, NetEvent};
use crate::transport::{MessageKind, ReversePairingInfo, Transport, TransportError};

/// Everything the hub tracks per connected device.
struct DeviceSlot {
    address: DeviceAddress,
    name: String,
    hub_host: String,
    /// Long-lived secret printed in this device's own pairing code.
    advertised_secret: String,
    /// Single-use secrets from `begin_waiting_for_reverse_pairing`.
    reverse_secrets: HashSet<String>,
    events: EventSender,
    /// Address book: this device's view of its correspondents.
    correspondents: HashMap<DeviceAddress, Correspondent>,
    /// Address handle back to the counterpart's pubkey.
    peers: HashMap<DeviceAddress, String>,
}

#[derive(Default)]
struct HubState {
    devices: HashMap<String, DeviceSlot>,
}

/// Shared in-process relay.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a device. The identity is fixed here; display name and
    /// relay host can still be changed through the transport afterwards.
    /// Returns the device's transport handle and its event receiver.
    pub async fn connect(
        &self,
        keys: &DeviceKeys,
        name: &str,
        advertised_secret: &str,
    ) -> (MemoryTransport, EventReceiver) {
        let pubkey = keys.pubkey();
        let (tx, rx) = event_channel();

        let slot = DeviceSlot {
            address: DeviceAddress::from_pubkey(&pubkey),
            name: name.to_string(),
            hub_host: String::new(),
            advertised_secret: advertised_secret.to_string(),
            reverse_secrets: HashSet::new(),
            events: tx,
            correspondents: HashMap::new(),
            peers: HashMap::new(),
        };

        info!(pubkey = %pubkey, name, "device connected to hub");
        self.inner.lock().await.devices.insert(pubkey.clone(), slot);

        (
            MemoryTransport {
                hub: self.clone(),
                pubkey,
            },
            rx,
        )
    }

    async fn with_slot<R>(
        &self,
        pubkey: &str,
        f: impl FnOnce(&mut DeviceSlot) -> R,
    ) -> Result<R, TransportError> {
        let mut state = self.inner.lock().await;
        let slot = state
            .devices
            .get_mut(pubkey)
            .ok_or_else(|| TransportError::Delivery(format!("device {pubkey} not connected")))?;
        Ok(f(slot))
    }
}

/// One device's handle onto the hub.
pub struct MemoryTransport {
    hub: MemoryHub,
    pubkey: String,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn own_pubkey(&self) -> String {
        self.pubkey.clone()
    }

    async fn set_rotating_keys(
        &self,
        _temp: [u8; KEY_SIZE],
        _prev_temp: [u8; KEY_SIZE],
    ) -> Result<(), TransportError> {
        // The in-process hub carries no wire crypto; it only checks that
        // the device is still connected.
        self.hub.with_slot(&self.pubkey, |_slot| ()).await
    }

    async fn set_display_name(&self, name: &str) -> Result<(), TransportError> {
        self.hub
            .with_slot(&self.pubkey, |slot| slot.name = name.to_string())
            .await
    }

    async fn set_relay_host(&self, host: &str) -> Result<(), TransportError> {
        self.hub
            .with_slot(&self.pubkey, |slot| slot.hub_host = host.to_string())
            .await
    }

    async fn register_unconfirmed_correspondent(
        &self,
        pubkey: &str,
        hub_host: &str,
        name: &str,
    ) -> Result<DeviceAddress, TransportError> {
        let address = DeviceAddress::from_pubkey(pubkey);
        let correspondent = Correspondent {
            address: address.clone(),
            hub: hub_host.to_string(),
            name: name.to_string(),
            state: PairingState::Unconfirmed,
        };
        let remote = pubkey.to_string();
        self.hub
            .with_slot(&self.pubkey, |slot| {
                debug!(address = %address, "registering unconfirmed correspondent");
                slot.correspondents.insert(address.clone(), correspondent);
                slot.peers.insert(address.clone(), remote);
                address.clone()
            })
            .await
    }

    async fn begin_waiting_for_reverse_pairing(
        &self,
    ) -> Result<ReversePairingInfo, TransportError> {
        let mut bytes = [0u8; 9];
        OsRng.fill_bytes(&mut bytes);
        let secret = STANDARD_NO_PAD.encode(bytes);
        self.hub
            .with_slot(&self.pubkey, |slot| {
                slot.reverse_secrets.insert(secret.clone());
                ReversePairingInfo { secret }
            })
            .await
    }

    async fn send_pairing_message(
        &self,
        hub_host: &str,
        pubkey: &str,
        secret: &str,
        reverse_secret: &str,
    ) -> Result<(), TransportError> {
        let mut notifications: Vec<(EventSender, NetEvent)> = Vec::new();

        {
            let mut state = self.hub.inner.lock().await;

            let sender = state.devices.get(&self.pubkey).ok_or_else(|| {
                TransportError::Delivery(format!("device {} not connected", self.pubkey))
            })?;
            let sender_addr = sender.address.clone();
            let sender_name = sender.name.clone();
            let sender_events = sender.events.clone();

            // Validate before mutating anything.
            if !reverse_secret.is_empty() && !sender.reverse_secrets.contains(reverse_secret) {
                return Err(TransportError::PairingRejected(
                    "unknown reverse pairing secret".to_string(),
                ));
            }

            let target = state.devices.get(pubkey).ok_or_else(|| {
                TransportError::Delivery("counterpart not reachable".to_string())
            })?;
            let known =
                secret == target.advertised_secret || target.reverse_secrets.contains(secret);
            if !known {
                return Err(TransportError::PairingRejected(
                    "unknown pairing secret".to_string(),
                ));
            }
            let target_addr = target.address.clone();
            let target_name = target.name.clone();
            let target_hub = target.hub_host.clone();
            let target_events = target.events.clone();

            // Target side: the invitation secret checked out, so the
            // sender becomes a confirmed correspondent of the target.
            if let Some(target) = state.devices.get_mut(pubkey) {
                target.reverse_secrets.remove(secret);
                target.correspondents.insert(
                    sender_addr.clone(),
                    Correspondent {
                        address: sender_addr.clone(),
                        hub: hub_host.to_string(),
                        name: sender_name,
                        state: PairingState::Paired,
                    },
                );
                target.peers.insert(sender_addr.clone(), self.pubkey.clone());
                notifications.push((
                    target_events,
                    NetEvent::Paired {
                        address: sender_addr,
                    },
                ));
            }

            // Sender side: the message carried a reverse secret inviting
            // the target to confirm back; the hub completes that loop,
            // renaming the placeholder record to the target's real name.
            if !reverse_secret.is_empty() {
                if let Some(sender) = state.devices.get_mut(&self.pubkey) {
                    sender.reverse_secrets.remove(reverse_secret);
                    sender.correspondents.insert(
                        target_addr.clone(),
                        Correspondent {
                            address: target_addr.clone(),
                            hub: target_hub,
                            name: target_name,
                            state: PairingState::Paired,
                        },
                    );
                    sender.peers.insert(target_addr.clone(), pubkey.to_string());
                    notifications.push((
                        sender_events,
                        NetEvent::Paired {
                            address: target_addr,
                        },
                    ));
                }
            }
        }

        for (events, event) in notifications {
            let _ = events.send(event).await;
        }
        Ok(())
    }

    async fn send_message(
        &self,
        to: &DeviceAddress,
        kind: MessageKind,
        payload: &str,
    ) -> Result<(), TransportError> {
        let (events, event) = {
            let state = self.hub.inner.lock().await;

            let sender = state.devices.get(&self.pubkey).ok_or_else(|| {
                TransportError::Delivery(format!("device {} not connected", self.pubkey))
            })?;
            let target_pubkey = sender
                .peers
                .get(to)
                .ok_or_else(|| TransportError::UnknownCorrespondent(to.clone()))?;
            let target = state
                .devices
                .get(target_pubkey)
                .ok_or_else(|| TransportError::Delivery("correspondent offline".to_string()))?;

            debug!(to = %to, kind = kind.as_str(), len = payload.len(), "routing message");
            (
                target.events.clone(),
                NetEvent::TextReceived {
                    from: sender.address.clone(),
                    text: payload.to_string(),
                },
            )
        };

        // Fire and forget: a dropped receiver is the recipient's problem.
        let _ = events.send(event).await;
        Ok(())
    }

    async fn correspondent(
        &self,
        address: &DeviceAddress,
    ) -> Result<Correspondent, TransportError> {
        self.hub
            .with_slot(&self.pubkey, |slot| slot.correspondents.get(address).cloned())
            .await?
            .ok_or_else(|| TransportError::UnknownCorrespondent(address.clone()))
    }
}
