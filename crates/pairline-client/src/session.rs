//! Interactive chat session.
//!
//! [`Console`] is the one object that may touch the operator's terminal:
//! it owns the prompt string and the output stream. [`SessionRouter`]
//! reacts to two independent event sources — console input lines and
//! transport notifications — and activates the chat relay only once the
//! transport reports the pairing as confirmed.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{BufReader, Lines, Stdin};
use tracing::{debug, info, warn};

use pairline_net::{EventReceiver, MessageKind, NetEvent, Transport};
use pairline_shared::{DeviceAddress, DeviceKeys, KeyStore};

/// Terminal session handle: prompt plus output stream.
pub struct Console {
    prompt: String,
    out: Box<dyn Write + Send>,
}

impl Console {
    pub fn stdout(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            out: Box::new(std::io::stdout()),
        }
    }

    #[cfg(test)]
    fn with_writer(prompt: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            prompt: prompt.into(),
            out,
        }
    }

    /// Print a full line.
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    /// Print without a trailing newline and flush, e.g. for questions.
    pub fn ask(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
    }

    /// Redraw the input prompt.
    pub fn draw_prompt(&mut self) {
        let _ = write!(self.out, "{}", self.prompt);
        let _ = self.out.flush();
    }
}

/// Relays console input to the paired correspondent and inbound text to
/// the console. Also answers key-rotation notifications by persisting the
/// fresh key pair.
pub struct SessionRouter<T: Transport> {
    transport: Arc<T>,
    keystore: KeyStore,
    keys: DeviceKeys,
    console: Console,
    peer: Option<DeviceAddress>,
}

impl<T: Transport> SessionRouter<T> {
    pub fn new(transport: Arc<T>, keystore: KeyStore, keys: DeviceKeys, console: Console) -> Self {
        Self {
            transport,
            keystore,
            keys,
            console,
            peer: None,
        }
    }

    /// Run until stdin or the event channel closes.
    pub async fn run(
        mut self,
        mut lines: Lines<BufReader<Stdin>>,
        mut events: EventReceiver,
    ) -> Result<()> {
        self.console.draw_prompt();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.on_input_line(&line).await,
                        None => break,
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.on_event(event).await?,
                        None => break,
                    }
                }
            }
        }
        info!("session ended");
        Ok(())
    }

    /// One input line becomes exactly one outbound send; nothing is
    /// queued, and failures are the transport's concern.
    async fn on_input_line(&mut self, line: &str) {
        let Some(peer) = &self.peer else {
            debug!("ignoring input line before pairing");
            self.console.draw_prompt();
            return;
        };
        if let Err(e) = self
            .transport
            .send_message(peer, MessageKind::Text, line)
            .await
        {
            warn!(error = %e, "outbound send failed");
        }
        self.console.draw_prompt();
    }

    async fn on_event(&mut self, event: NetEvent) -> Result<()> {
        match event {
            NetEvent::Paired { address } => {
                let name = self.display_name(&address).await;
                info!(address = %address, name, "pairing confirmed");
                self.console.line(&format!("Paired with {name}"));
                self.console.draw_prompt();
                self.peer = Some(address);
            }
            NetEvent::TextReceived { from, text } => {
                let name = self.display_name(&from).await;
                self.console.line(&format!("{name}> {text}"));
                self.console.draw_prompt();
            }
            NetEvent::TempKeysRotated { temp, prev_temp } => {
                // Persisting the rotated pair may not fail silently: a
                // stale record would desynchronize the identity.
                self.keys = self.keys.with_rotated(temp, prev_temp);
                self.keystore.save(&self.keys).await?;
            }
        }
        Ok(())
    }

    async fn display_name(&self, address: &DeviceAddress) -> String {
        match self.transport.correspondent(address).await {
            Ok(correspondent) => correspondent.name,
            Err(_) => address.short(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pairline_net::{ReversePairingInfo, TransportError};
    use pairline_shared::constants::KEY_SIZE;
    use pairline_shared::{Correspondent, PairingState};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        sends: Mutex<Vec<(DeviceAddress, String)>>,
        names: Mutex<HashMap<DeviceAddress, String>>,
    }

    impl FakeTransport {
        fn with_name(address: &DeviceAddress, name: &str) -> Self {
            let transport = Self::default();
            transport
                .names
                .lock()
                .unwrap()
                .insert(address.clone(), name.to_string());
            transport
        }

        fn sends(&self) -> Vec<(DeviceAddress, String)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn own_pubkey(&self) -> String {
            "own".to_string()
        }

        async fn set_rotating_keys(
            &self,
            _temp: [u8; KEY_SIZE],
            _prev_temp: [u8; KEY_SIZE],
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn set_display_name(&self, _name: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn set_relay_host(&self, _host: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn register_unconfirmed_correspondent(
            &self,
            pubkey: &str,
            _hub_host: &str,
            _name: &str,
        ) -> Result<DeviceAddress, TransportError> {
            Ok(DeviceAddress::from_pubkey(pubkey))
        }

        async fn begin_waiting_for_reverse_pairing(
            &self,
        ) -> Result<ReversePairingInfo, TransportError> {
            Ok(ReversePairingInfo {
                secret: "reverse".to_string(),
            })
        }

        async fn send_pairing_message(
            &self,
            _hub_host: &str,
            _pubkey: &str,
            _secret: &str,
            _reverse_secret: &str,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_message(
            &self,
            to: &DeviceAddress,
            _kind: MessageKind,
            payload: &str,
        ) -> Result<(), TransportError> {
            self.sends
                .lock()
                .unwrap()
                .push((to.clone(), payload.to_string()));
            Ok(())
        }

        async fn correspondent(
            &self,
            address: &DeviceAddress,
        ) -> Result<Correspondent, TransportError> {
            self.names
                .lock()
                .unwrap()
                .get(address)
                .map(|name| Correspondent {
                    address: address.clone(),
                    hub: "hub".to_string(),
                    name: name.clone(),
                    state: PairingState::Paired,
                })
                .ok_or_else(|| TransportError::UnknownCorrespondent(address.clone()))
        }
    }

    fn router(
        transport: Arc<FakeTransport>,
        dir: &tempfile::TempDir,
        buf: &SharedBuf,
    ) -> SessionRouter<FakeTransport> {
        let console = Console::with_writer("me> ", Box::new(buf.clone()));
        let keystore = KeyStore::new(dir.path().join("keys.json"));
        SessionRouter::new(transport, keystore, DeviceKeys::generate(), console)
    }

    #[tokio::test]
    async fn test_input_ignored_before_pairing() {
        let dir = tempfile::tempdir().unwrap();
        let buf = SharedBuf::default();
        let transport = Arc::new(FakeTransport::default());
        let mut router = router(transport.clone(), &dir, &buf);

        router.on_input_line("hello?").await;
        assert!(transport.sends().is_empty());
    }

    #[tokio::test]
    async fn test_one_line_one_send_after_pairing() {
        let dir = tempfile::tempdir().unwrap();
        let buf = SharedBuf::default();
        let peer = DeviceAddress::from_pubkey("peer");
        let transport = Arc::new(FakeTransport::with_name(&peer, "Bob"));
        let mut router = router(transport.clone(), &dir, &buf);

        router
            .on_event(NetEvent::Paired {
                address: peer.clone(),
            })
            .await
            .unwrap();
        router.on_input_line("hello bob").await;

        assert_eq!(transport.sends(), vec![(peer, "hello bob".to_string())]);
    }

    #[tokio::test]
    async fn test_inbound_text_rendered_with_name() {
        let dir = tempfile::tempdir().unwrap();
        let buf = SharedBuf::default();
        let peer = DeviceAddress::from_pubkey("peer");
        let transport = Arc::new(FakeTransport::with_name(&peer, "Bob"));
        let mut router = router(transport.clone(), &dir, &buf);

        router
            .on_event(NetEvent::TextReceived {
                from: peer,
                text: "hi".to_string(),
            })
            .await
            .unwrap();

        assert!(buf.contents().contains("Bob> hi"));
    }

    #[tokio::test]
    async fn test_rotation_persists_keys() {
        let dir = tempfile::tempdir().unwrap();
        let buf = SharedBuf::default();
        let transport = Arc::new(FakeTransport::default());
        let mut router = router(transport, &dir, &buf);
        let permanent = router.keys.permanent;

        let temp = [7u8; KEY_SIZE];
        let prev_temp = [9u8; KEY_SIZE];
        router
            .on_event(NetEvent::TempKeysRotated { temp, prev_temp })
            .await
            .unwrap();

        let reloaded = KeyStore::new(dir.path().join("keys.json"))
            .load()
            .await
            .unwrap();
        assert_eq!(reloaded.permanent, permanent);
        assert_eq!(reloaded.temp, temp);
        assert_eq!(reloaded.prev_temp, prev_temp);
    }
}
