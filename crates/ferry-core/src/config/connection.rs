//! Remote endpoint connection configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the single remote endpoint.
///
/// Only the `"local"` connector ships with Ferry; the remaining fields are
/// carried for connector implementations that authenticate against a real
/// remote host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connector protocol name (e.g., `"local"`).
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Server hostname or IP.
    #[serde(default)]
    pub host: String,
    /// Connection port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username for authentication.
    #[serde(default)]
    pub username: String,
    /// Password for authentication (optional if using a key).
    #[serde(default)]
    pub password: String,
    /// Path to a private key file.
    #[serde(default)]
    pub private_key_path: Option<String>,
    /// Root directory served by the `"local"` connector.
    #[serde(default = "default_local_root")]
    pub local_root: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: String::new(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            private_key_path: None,
            local_root: default_local_root(),
        }
    }
}

fn default_protocol() -> String {
    "local".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_local_root() -> String {
    "data/remote".to_string()
}
