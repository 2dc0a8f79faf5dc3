//! Client thresholds and endpoint.

use serde::Deserialize;

use crate::constants;

/// Tunables for [`HeartbeatClient`](crate::HeartbeatClient).
///
/// Every field has a default, so a partial YAML/JSON document deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UplinkConfig {
    /// Heartbeat endpoint (POST).
    pub endpoint: String,
    /// Minimum plausible epoch; anything earlier is an unsynchronized clock.
    pub threshold_epoch: i64,
    /// Seconds after `last_good_time` before the clock must be re-verified.
    pub stale_window_secs: u64,
    pub min_device_id_len: usize,
    pub max_device_id_len: usize,
    pub min_token_len: usize,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::HEARTBEAT_URL.to_string(),
            threshold_epoch: constants::THRESHOLD_EPOCH,
            stale_window_secs: constants::STALE_WINDOW_SECS,
            min_device_id_len: constants::MIN_DEVICE_ID_LEN,
            max_device_id_len: constants::MAX_DEVICE_ID_LEN,
            min_token_len: constants::MIN_TOKEN_LEN,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("device ID bounds are inverted: min {min} > max {max}")]
    DeviceIdBounds { min: usize, max: usize },
}

impl UplinkConfig {
    /// Check the endpoint URL and length bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.endpoint).map_err(|e| ConfigError::Endpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "https" => {}
            "http" => {
                tracing::warn!(endpoint = %self.endpoint, "heartbeat endpoint is not using TLS");
            }
            other => {
                return Err(ConfigError::Endpoint {
                    endpoint: self.endpoint.clone(),
                    reason: format!("unsupported scheme {other:?}"),
                });
            }
        }
        if self.min_device_id_len > self.max_device_id_len {
            return Err(ConfigError::DeviceIdBounds {
                min: self.min_device_id_len,
                max: self.max_device_id_len,
            });
        }
        Ok(())
    }

    /// Staleness window as a signed delta, saturating for absurd values.
    pub(crate) fn stale_window(&self) -> i64 {
        i64::try_from(self.stale_window_secs).unwrap_or(i64::MAX)
    }
}
