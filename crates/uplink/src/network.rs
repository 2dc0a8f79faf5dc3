//! Connectivity probes.
//!
//! The Linux probe reads the kernel routing table: a device whose WiFi (or
//! Ethernet) link is associated and configured has an `UP` default route.

use std::path::PathBuf;

/// Reports whether the device currently has a network uplink.
pub trait ConnectivityProbe {
    fn is_connected(&self) -> bool;
}

impl<F> ConnectivityProbe for F
where
    F: Fn() -> bool,
{
    fn is_connected(&self) -> bool {
        self()
    }
}

/// For hosts without a readable routing table.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

impl ConnectivityProbe for AlwaysConnected {
    fn is_connected(&self) -> bool {
        true
    }
}

pub const DEFAULT_ROUTE_TABLE: &str = "/proc/net/route";

const RTF_UP: u32 = 0x0001;

/// Connected iff the routing table holds an `UP` default route, optionally
/// on a specific interface.
#[derive(Debug, Clone)]
pub struct RouteProbe {
    table: PathBuf,
    interface: Option<String>,
}

impl RouteProbe {
    pub fn new(table: impl Into<PathBuf>, interface: Option<String>) -> Self {
        Self {
            table: table.into(),
            interface,
        }
    }
}

impl Default for RouteProbe {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE_TABLE, None)
    }
}

impl ConnectivityProbe for RouteProbe {
    fn is_connected(&self) -> bool {
        match std::fs::read_to_string(&self.table) {
            Ok(content) => has_default_route(&content, self.interface.as_deref()),
            Err(e) => {
                tracing::debug!(table = %self.table.display(), error = %e, "route table unreadable");
                false
            }
        }
    }
}

/// Parse `/proc/net/route` content and look for an `UP` default route.
fn has_default_route(content: &str, interface: Option<&str>) -> bool {
    // Format: "Iface\tDestination\tGateway\tFlags\t..." with hex fields.
    content.lines().skip(1).any(|line| {
        let mut fields = line.split_whitespace();
        let (Some(iface), Some(dest), Some(_gateway), Some(flags)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return false;
        };
        if interface.is_some_and(|wanted| wanted != iface) {
            return false;
        }
        let up = u32::from_str_radix(flags, 16).is_ok_and(|f| f & RTF_UP != 0);
        dest == "00000000" && up
    })
}

/// Probe selected by configuration.
#[derive(Debug, Clone)]
pub enum HostProbe {
    Route(RouteProbe),
    Always(AlwaysConnected),
}

impl ConnectivityProbe for HostProbe {
    fn is_connected(&self) -> bool {
        match self {
            Self::Route(probe) => probe.is_connected(),
            Self::Always(probe) => probe.is_connected(),
        }
    }
}
