//! Constants.

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Default heartbeat endpoint.
pub const HEARTBEAT_URL: &str = "https://on.uplink.qrystal.partners/api/v1/heartbeat";

/// Header carrying the raw device ID.
pub const DEVICE_ID_HEADER: &str = "X-Qrystal-Uplink-DID";

/// Header carrying `Bearer <token>`.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

// ---------------------------------------------------------------------------
// Time readiness
// ---------------------------------------------------------------------------

/// 2026-01-01 09:09:09 UTC+4. Device clocks that have never synced boot far
/// earlier than this.
pub const THRESHOLD_EPOCH: i64 = 1_767_244_149;

/// Seconds before a confirmed clock must be re-verified.
pub const STALE_WINDOW_SECS: u64 = 86_400;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Separator between device ID and token.
pub const CREDENTIALS_SEPARATOR: char = ':';

pub const MIN_DEVICE_ID_LEN: usize = 10;
pub const MAX_DEVICE_ID_LEN: usize = 40;
pub const MIN_TOKEN_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// HTTP request timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// HTTP connect timeout in seconds.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Upper bound on response bytes drained before the connection is reused.
pub const MAX_RESPONSE_BYTES: u64 = 64 * 1024;
