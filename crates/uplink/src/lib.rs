//! Device-side heartbeat client for Qrystal Uplink.
//!
//! [`HeartbeatClient::send_heartbeat`] checks connectivity, clock readiness
//! and credentials before issuing a single HTTPS POST, and maps every outcome
//! to a stable [`StatusCode`]. The host environment is injected through the
//! [`ConnectivityProbe`], [`Clock`], [`TimeSync`] and [`HttpsTransport`]
//! traits; stock Linux implementations live in [`network`], [`clock`] and
//! [`transport`].
//!
//! ```no_run
//! use uplink::{
//!     HeartbeatClient, NoTimeSync, RouteProbe, StatusCode, SystemClock, UplinkConfig,
//!     UreqTransport,
//! };
//!
//! let mut client = HeartbeatClient::new(
//!     UplinkConfig::default(),
//!     RouteProbe::default(),
//!     SystemClock,
//!     NoTimeSync,
//!     UreqTransport::default(),
//! );
//! if client.send_heartbeat("device-1234567890:secrettoken") == StatusCode::Ok {
//!     println!("heartbeat sent");
//! }
//! ```

mod client;
pub mod clock;
mod config;
pub mod constants;
mod credentials;
pub mod network;
mod status;
pub mod task;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ClientState, HeartbeatClient};
pub use clock::{Clock, CommandTimeSync, HostTimeSync, NoTimeSync, SyncError, SystemClock, TimeSync};
pub use config::{ConfigError, UplinkConfig};
pub use credentials::{CredentialCache, Credentials, Lookup};
pub use network::{AlwaysConnected, ConnectivityProbe, HostProbe, RouteProbe};
pub use status::{StatusCode, UnknownStatusCode};
pub use task::{TaskError, UplinkHandle, UplinkTaskConfig, spawn_uplink};
pub use transport::{HttpResponse, HttpsTransport, TransportConfig, TransportError, UreqTransport};
