//! Heartbeat outcome codes.
//!
//! The numeric values are a stable contract: callers on other SDKs and
//! firmware branch on them directly, so they must never be renumbered.

use std::fmt;

/// Result of a single [`send_heartbeat`](crate::HeartbeatClient::send_heartbeat) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// Heartbeat accepted.
    Ok = 0,
    /// Transport succeeded but the server answered with a non-2xx status.
    ServerError = 1,
    /// Connectivity probe reports not connected.
    NoNetwork = 2,
    /// Clock is not trustworthy yet (or went stale).
    TimeNotReady = 3,
    /// Credential string is malformed.
    InvalidCredentials = 4,
    /// Device ID length is out of bounds.
    InvalidDeviceId = 5,
    /// Token is too short.
    InvalidToken = 6,
    /// Request could not be sent or no response was received.
    TransportError = 7,
}

impl StatusCode {
    pub const ALL: [StatusCode; 8] = [
        StatusCode::Ok,
        StatusCode::ServerError,
        StatusCode::NoNetwork,
        StatusCode::TimeNotReady,
        StatusCode::InvalidCredentials,
        StatusCode::InvalidDeviceId,
        StatusCode::InvalidToken,
        StatusCode::TransportError,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }

    /// Stable identifier, e.g. `TIME_NOT_READY`.
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::ServerError => "SERVER_ERROR",
            StatusCode::NoNetwork => "NO_NETWORK",
            StatusCode::TimeNotReady => "TIME_NOT_READY",
            StatusCode::InvalidCredentials => "INVALID_CREDENTIALS",
            StatusCode::InvalidDeviceId => "INVALID_DEVICE_ID",
            StatusCode::InvalidToken => "INVALID_TOKEN",
            StatusCode::TransportError => "TRANSPORT_ERROR",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            StatusCode::Ok => "Success",
            StatusCode::ServerError => "Server error (check credentials)",
            StatusCode::NoNetwork => "Network not connected",
            StatusCode::TimeNotReady => "Time not synchronized",
            StatusCode::InvalidCredentials => "Invalid credentials format",
            StatusCode::InvalidDeviceId => "Invalid device ID length",
            StatusCode::InvalidToken => "Invalid token length",
            StatusCode::TransportError => "HTTP request failed",
        };
        f.write_str(msg)
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

/// Returned when converting a number that is not a known status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown status code: {0}")]
pub struct UnknownStatusCode(pub u8);

impl TryFrom<u8> for StatusCode {
    type Error = UnknownStatusCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        StatusCode::ALL
            .into_iter()
            .find(|s| s.code() == value)
            .ok_or(UnknownStatusCode(value))
    }
}
