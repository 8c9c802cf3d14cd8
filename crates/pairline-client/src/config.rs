//! Client configuration loaded from environment variables.
//!
//! All settings have compiled defaults so the client starts with zero
//! configuration.

use std::path::PathBuf;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay hub this device announces itself on.
    /// Env: `PAIRLINE_HUB`
    /// Default: `byteball.org/bb-test`
    pub hub: String,

    /// Display name announced to correspondents and used as the prompt.
    /// Env: `PAIRLINE_DEVICE_NAME`
    /// Default: `"Chatbot Client"`
    pub device_name: String,

    /// Directory holding the key file and the log file.
    /// Env: `PAIRLINE_DATA_DIR`
    /// Default: the platform app data dir for `pairline`.
    pub data_dir: PathBuf,

    /// File name of the persisted identity key record.
    /// Env: `PAIRLINE_KEYS_FILENAME`
    /// Default: `keys.json`
    pub keys_filename: String,

    /// File name diagnostic output is written to.
    /// Env: `PAIRLINE_LOG_FILENAME`
    /// Default: `log.txt`
    pub log_filename: String,

    /// Long-lived secret printed in this device's own pairing code.
    /// Not validated for entropy; `0000` is the historical default.
    /// Env: `PAIRLINE_PAIRING_SECRET`
    /// Default: `0000`
    pub pairing_secret: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hub: "byteball.org/bb-test".to_string(),
            device_name: "Chatbot Client".to_string(),
            data_dir: default_data_dir(),
            keys_filename: "keys.json".to_string(),
            log_filename: "log.txt".to_string(),
            pairing_secret: "0000".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(hub) = std::env::var("PAIRLINE_HUB") {
            config.hub = hub;
        }
        if let Ok(name) = std::env::var("PAIRLINE_DEVICE_NAME") {
            config.device_name = name;
        }
        if let Ok(dir) = std::env::var("PAIRLINE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("PAIRLINE_KEYS_FILENAME") {
            config.keys_filename = name;
        }
        if let Ok(name) = std::env::var("PAIRLINE_LOG_FILENAME") {
            config.log_filename = name;
        }
        if let Ok(secret) = std::env::var("PAIRLINE_PAIRING_SECRET") {
            if !secret.is_empty() {
                config.pairing_secret = secret;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn keys_path(&self) -> PathBuf {
        self.data_dir.join(&self.keys_filename)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_filename)
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "pairline")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.hub, "byteball.org/bb-test");
        assert_eq!(config.pairing_secret, "0000");
        assert_eq!(config.keys_path().file_name().unwrap(), "keys.json");
    }

    #[test]
    fn test_paths_join_data_dir() {
        let config = ClientConfig {
            data_dir: PathBuf::from("/tmp/pairline"),
            ..ClientConfig::default()
        };
        assert_eq!(config.keys_path(), PathBuf::from("/tmp/pairline/keys.json"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/pairline/log.txt"));
    }
}
