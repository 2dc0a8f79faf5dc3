//! HTTPS POST transport.

use std::time::Duration;

use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig};

use crate::constants;

/// A response that made it back from the server, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Sends a bodiless POST with the given headers.
pub trait HttpsTransport {
    fn post(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(constants::HTTP_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(constants::HTTP_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Blocking transport over a pooled [`ureq::Agent`]; connections are kept
/// alive between heartbeats.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .timeout_connect(Some(config.connect_timeout))
            // Non-2xx is a server verdict, not a transport failure.
            .http_status_as_error(false)
            .tls_config(
                TlsConfig::builder()
                    .root_certs(RootCerts::PlatformVerifier)
                    .build(),
            )
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl HttpsTransport for UreqTransport {
    fn post(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.post(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        match request.send_empty() {
            Ok(mut response) => {
                let status = response.status().as_u16();
                // Drain so the connection can go back to the pool.
                let body = response
                    .body_mut()
                    .with_config()
                    .limit(constants::MAX_RESPONSE_BYTES)
                    .read_to_vec()
                    .unwrap_or_default();
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::StatusCode(status)) => Ok(HttpResponse {
                status,
                body: Vec::new(),
            }),
            Err(e @ ureq::Error::Timeout(_)) => Err(TransportError::Timeout(e.to_string())),
            Err(e) => Err(TransportError::Request(e.to_string())),
        }
    }
}
