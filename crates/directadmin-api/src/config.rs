// Connection profile
//
// Serde-deserializable settings for one panel server, TOML-friendly so
// applications can keep profiles on disk.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::connection::Connection;
use crate::error::Error;
use crate::transport::TransportConfig;

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

/// Settings for one panel connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Panel base URL (e.g. `https://panel.example.com:2222`).
    pub url: String,

    /// Account to log in as. May already be in pipe format.
    pub username: String,

    /// Master password. Plaintext in config files; prefer injecting via env.
    pub password: SecretString,

    /// Verify the panel's TLS certificate.
    #[serde(default = "default_true")]
    pub verify_certificates: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ConnectionConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            verify_certificates: self.verify_certificates,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Open a [`Connection`] using these settings.
    pub fn open(&self) -> Result<Connection, Error> {
        Connection::new(
            &self.url,
            &self.username,
            self.password.clone(),
            self.transport(),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let cfg: ConnectionConfig = toml::from_str(
            r#"
            url = "https://panel.example.com:2222"
            username = "admin"
            password = "hunter2"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.url, "https://panel.example.com:2222");
        assert!(cfg.verify_certificates);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.transport().timeout, Duration::from_secs(30));
    }

    #[test]
    fn honours_overrides() {
        let cfg: ConnectionConfig = toml::from_str(
            r#"
            url = "https://10.0.0.1:2222"
            username = "admin|bob"
            password = "hunter2"
            verify_certificates = false
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert!(!cfg.verify_certificates);
        let conn = cfg.open().unwrap();
        assert_eq!(conn.authenticated_username(), "admin");
        assert_eq!(conn.username(), "bob");
    }
}
