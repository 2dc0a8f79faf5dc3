//! Agent configuration file (YAML).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use uplink::network::DEFAULT_ROUTE_TABLE;
use uplink::{AlwaysConnected, HostProbe, HostTimeSync, RouteProbe, TransportConfig, UplinkConfig};

use crate::error::{AgentError, AgentResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// `"<device_id>:<token>"`. CLI/env take precedence.
    pub credentials: Option<String>,
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Run on `TIME_NOT_READY`. `send` runs it inline on a cold start;
    /// `run` queues it as remediation only.
    pub sync_command: Option<String>,
    /// Run on `NO_NETWORK`.
    pub reconnect_command: Option<String>,
    pub connectivity: ConnectivityConfig,
    pub uplink: UplinkConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            interval_secs: 10,
            request_timeout_secs: uplink::constants::HTTP_TIMEOUT_SECS,
            connect_timeout_secs: uplink::constants::HTTP_CONNECT_TIMEOUT_SECS,
            sync_command: None,
            reconnect_command: None,
            connectivity: ConnectivityConfig::default(),
            uplink: UplinkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectivityConfig {
    pub mode: ConnectivityMode,
    /// Only count a default route on this interface (e.g. `wlan0`).
    pub interface: Option<String>,
    pub route_table: PathBuf,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            mode: ConnectivityMode::default(),
            interface: None,
            route_table: PathBuf::from(DEFAULT_ROUTE_TABLE),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityMode {
    #[default]
    Route,
    Always,
}

impl AgentConfig {
    /// Load from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> AgentResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> AgentResult<Self> {
        // An empty document means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.interval_secs == 0 {
            return Err(AgentError::Config("interval_secs must be greater than 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AgentError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        self.uplink.validate()?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe(&self) -> HostProbe {
        match self.connectivity.mode {
            ConnectivityMode::Route => HostProbe::Route(RouteProbe::new(
                self.connectivity.route_table.clone(),
                self.connectivity.interface.clone(),
            )),
            ConnectivityMode::Always => HostProbe::Always(AlwaysConnected),
        }
    }

    pub fn time_sync(&self) -> HostTimeSync {
        HostTimeSync::from_command(self.sync_command.as_deref())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_is_default() {
        let config = AgentConfig::from_yaml("").unwrap();
        assert_eq!(config.interval_secs, 10);
        assert_eq!(config.uplink, UplinkConfig::default());
        assert_eq!(config.connectivity.mode, ConnectivityMode::Route);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
credentials: "device-1234567890:secrettoken"
interval_secs: 5
request_timeout_secs: 15
connect_timeout_secs: 3
sync_command: "chronyc makestep"
reconnect_command: "nmcli radio wifi off && nmcli radio wifi on"
connectivity:
  mode: route
  interface: wlan0
  route_table: /tmp/route
uplink:
  endpoint: https://staging.example.com/api/v1/heartbeat
  stale_window_secs: 3600
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.credentials.as_deref(),
            Some("device-1234567890:secrettoken")
        );
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.transport().timeout, Duration::from_secs(15));
        assert_eq!(config.transport().connect_timeout, Duration::from_secs(3));
        assert_eq!(config.sync_command.as_deref(), Some("chronyc makestep"));
        assert_eq!(config.connectivity.interface.as_deref(), Some("wlan0"));
        assert_eq!(config.connectivity.route_table, PathBuf::from("/tmp/route"));
        assert_eq!(config.uplink.stale_window_secs, 3600);
        // Unspecified uplink fields keep their defaults.
        assert_eq!(config.uplink.threshold_epoch, 1_767_244_149);
        assert!(matches!(config.time_sync(), HostTimeSync::Command(_)));
        assert!(matches!(config.probe(), HostProbe::Route(_)));
    }

    #[test]
    fn always_mode_selects_always_probe() {
        let config = AgentConfig::from_yaml("connectivity:\n  mode: always\n").unwrap();
        assert!(matches!(config.probe(), HostProbe::Always(_)));
        assert!(matches!(config.time_sync(), HostTimeSync::Disabled(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = AgentConfig::from_yaml("intervall_secs: 5\n").unwrap_err();
        assert!(matches!(err, AgentError::Yaml(_)), "got: {err}");
    }

    #[test]
    fn rejects_zero_interval() {
        let err = AgentConfig::from_yaml("interval_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_secs"), "got: {err}");
    }

    #[test]
    fn rejects_bad_endpoint() {
        let err = AgentConfig::from_yaml("uplink:\n  endpoint: nope\n").unwrap_err();
        assert!(matches!(err, AgentError::Uplink(_)), "got: {err}");
    }

    #[test]
    fn load_without_path_is_default() {
        let config = AgentConfig::load(None).unwrap();
        assert_eq!(config.interval_secs, 10);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"interval_secs: 30\n").unwrap();

        let config = AgentConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.interval_secs, 30);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = AgentConfig::load(Some(Path::new("/nonexistent/uplink.yaml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/uplink.yaml"), "got: {err}");
    }
}
