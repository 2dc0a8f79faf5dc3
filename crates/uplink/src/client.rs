//! Heartbeat readiness/validation state machine.
//!
//! Each call walks the gates in a fixed order and stops at the first one
//! that fails:
//!
//! 1. connectivity
//! 2. time readiness (cold-start sync attempt, staleness, rollback)
//! 3. credential validation (memoized)
//! 4. one HTTPS POST
//!
//! Earlier gates are cheaper and usually explain later failures, so a device
//! without a network never reports bad credentials.

use tracing::{debug, error, warn};

use crate::clock::{Clock, TimeSync};
use crate::config::UplinkConfig;
use crate::constants::{AUTHORIZATION_HEADER, DEVICE_ID_HEADER};
use crate::credentials::{CredentialCache, Lookup};
use crate::network::ConnectivityProbe;
use crate::status::StatusCode;
use crate::transport::HttpsTransport;

/// Mutable state carried between heartbeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    time_ready: bool,
    last_good_time: i64,
    credentials: CredentialCache,
}

impl ClientState {
    /// Whether the clock has been confirmed and is not stale.
    pub fn time_ready(&self) -> bool {
        self.time_ready
    }

    /// Epoch seconds at which time readiness was last confirmed.
    pub fn last_good_time(&self) -> i64 {
        self.last_good_time
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }
}

pub struct HeartbeatClient<P, C, S, T> {
    config: UplinkConfig,
    probe: P,
    clock: C,
    sync: S,
    transport: T,
    state: ClientState,
}

impl<P, C, S, T> HeartbeatClient<P, C, S, T>
where
    P: ConnectivityProbe,
    C: Clock,
    S: TimeSync,
    T: HttpsTransport,
{
    pub fn new(config: UplinkConfig, probe: P, clock: C, sync: S, transport: T) -> Self {
        Self {
            config,
            probe,
            clock,
            sync,
            transport,
            state: ClientState::default(),
        }
    }

    /// Send one heartbeat for `credentials` (`"<device_id>:<token>"`).
    ///
    /// Blocks for at most one network round trip. Never fails: every outcome,
    /// including transport faults, is a [`StatusCode`].
    pub fn send_heartbeat(&mut self, credentials: &str) -> StatusCode {
        if !self.probe.is_connected() {
            debug!("no network, skipping heartbeat");
            return StatusCode::NoNetwork;
        }

        if let Err(status) = self.check_time() {
            return status;
        }

        let (creds, lookup) = match self.state.credentials.resolve(credentials, &self.config) {
            Ok(resolved) => resolved,
            Err(status) => {
                error!(%status, "rejected credentials");
                return status;
            }
        };
        if lookup == Lookup::Parsed {
            debug!(device_id = creds.device_id(), "credentials validated");
        }

        let bearer = format!("Bearer {}", creds.token());
        let headers = [
            (DEVICE_ID_HEADER, creds.device_id()),
            (AUTHORIZATION_HEADER, bearer.as_str()),
        ];

        match self.transport.post(&self.config.endpoint, &headers) {
            Ok(response) if response.is_success() => StatusCode::Ok,
            Ok(response) => {
                error!(http_status = response.status, "server rejected heartbeat");
                StatusCode::ServerError
            }
            Err(e) => {
                error!(error = %e, "heartbeat request failed");
                StatusCode::TransportError
            }
        }
    }

    /// Time readiness gate.
    ///
    /// Only the cold-start branch attempts a sync. A stale or rolled-back
    /// clock revokes readiness and returns; the next call re-enters the
    /// cold-start branch.
    fn check_time(&mut self) -> Result<(), StatusCode> {
        let threshold = self.config.threshold_epoch;
        let mut now = self.clock.now();

        if !self.state.time_ready {
            if now < threshold {
                if let Err(e) = self.sync.try_sync() {
                    debug!(error = %e, "time sync attempt failed");
                }
                now = self.clock.now();
            }
            if now < threshold {
                warn!(now, threshold, "system time not yet valid");
                return Err(StatusCode::TimeNotReady);
            }

            self.state.time_ready = true;
            self.state.last_good_time = now;
            return Ok(());
        }

        let last = self.state.last_good_time;
        if now < last || now.saturating_sub(last) > self.config.stale_window() {
            warn!(now, last_good_time = last, "time sync stale or clock adjusted");
            self.state.time_ready = false;
            return Err(StatusCode::TimeNotReady);
        }
        Ok(())
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    /// Forget time readiness and cached credentials.
    pub fn reset(&mut self) {
        self.state = ClientState::default();
    }
}
