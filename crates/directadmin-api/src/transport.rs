// Shared transport configuration for building reqwest::Client instances.
//
// The panel speaks plain HTTPS with basic auth; the only knobs that
// matter in practice are certificate verification (self-signed panels
// are everywhere) and the request timeout.

use std::time::Duration;

/// Transport settings for a panel connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Verify the panel's TLS certificate. Disable for self-signed setups.
    pub verify_certificates: bool,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("directadmin-rs/", env!("CARGO_PKG_VERSION")));

        if !self.verify_certificates {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?)
    }

    /// Disable certificate verification.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.verify_certificates = false;
        self
    }
}
