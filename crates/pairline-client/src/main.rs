//! Pairline client binary.
//!
//! Startup order matters: the identity keys must be loaded before the
//! device registers with the transport, and the operator is only asked
//! for a pairing code once registration is done. After a successful (or
//! skipped) invitation the process becomes a line-oriented two-way chat.

mod config;
mod logging;
mod session;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use pairline_net::{MemoryHub, PairingHandshake, Transport};
use pairline_shared::{KeyStore, PairingCode};

use config::ClientConfig;
use session::{Console, SessionRouter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::from_env();
    logging::init_file_logging(&config.log_path())?;
    info!(hub = %config.hub, name = %config.device_name, "starting");

    // A failed write here is fatal: the on-disk identity can no longer be
    // trusted. A missing or corrupt file is just a first run.
    let keystore = KeyStore::new(config.keys_path());
    let keys = keystore.load().await?;

    let hub = MemoryHub::new();
    let (transport, events) = hub
        .connect(&keys, &config.device_name, &config.pairing_secret)
        .await;
    let transport = Arc::new(transport);
    transport.set_rotating_keys(keys.temp, keys.prev_temp).await?;
    transport.set_display_name(&config.device_name).await?;
    transport.set_relay_host(&config.hub).await?;

    let my_pairing_code = PairingCode {
        pubkey: transport.own_pubkey(),
        hub_host: config.hub.clone(),
        secret: config.pairing_secret.clone(),
    };

    let mut console = Console::stdout(format!("{}> ", config.device_name));
    console.line(&format!("my device pubkey: {}", my_pairing_code.pubkey));
    console.line(&format!("my pairing code: {my_pairing_code}"));
    console.line("---------------");
    console.line(&format!(
        "diagnostic output goes to {}",
        config.log_path().display()
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handshake = PairingHandshake::new(transport.clone());
    loop {
        console.ask("Enter pairing code of the other device (empty to wait): ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            // Wait for the counterpart to pair with us instead.
            break;
        }
        let code = match PairingCode::parse(line) {
            Ok(code) => code,
            Err(e) => {
                console.line(&e.to_string());
                continue;
            }
        };
        match handshake
            .accept_invitation(&code.hub_host, &code.pubkey, &code.secret)
            .await
        {
            Ok(address) => {
                info!(address = %address, "invitation accepted");
                break;
            }
            Err(e) => {
                console.line(&e.to_string());
                continue;
            }
        }
    }

    let router = SessionRouter::new(transport, keystore, keys, console);
    router.run(lines, events).await
}
