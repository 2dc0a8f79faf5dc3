//! Credential parsing and the single-entry credential cache.
//!
//! Credentials arrive as `"<device_id>:<token>"`. The heartbeat loop passes
//! the same string every few seconds, so the parsed form is memoized keyed by
//! raw string equality.

use std::fmt;

use crate::config::UplinkConfig;
use crate::constants::CREDENTIALS_SEPARATOR;
use crate::status::StatusCode;

/// A validated device ID / token pair.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    device_id: String,
    token: String,
}

impl Credentials {
    /// Parse and validate a raw credential string.
    ///
    /// The split happens at the first separator, so the token may contain `:`.
    /// Lengths are counted in characters.
    pub fn parse(raw: &str, config: &UplinkConfig) -> Result<Self, StatusCode> {
        let Some((device_id, token)) = raw.split_once(CREDENTIALS_SEPARATOR) else {
            return Err(StatusCode::InvalidCredentials);
        };
        if device_id.is_empty() {
            return Err(StatusCode::InvalidCredentials);
        }

        let id_len = device_id.chars().count();
        if !(config.min_device_id_len..=config.max_device_id_len).contains(&id_len) {
            return Err(StatusCode::InvalidDeviceId);
        }
        if token.chars().count() < config.min_token_len {
            return Err(StatusCode::InvalidToken);
        }

        Ok(Self {
            device_id: device_id.to_string(),
            token: token.to_string(),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keeps tokens out of logs and panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("device_id", &self.device_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// How [`CredentialCache::resolve`] produced its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Raw string matched the cache; nothing was parsed.
    Cached,
    /// Raw string was new, parsed, validated and committed.
    Parsed,
}

/// Last successfully validated credentials, keyed by the raw input.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialCache {
    raw: String,
    parsed: Credentials,
}

impl CredentialCache {
    /// Return the credentials for `raw`, parsing only if it differs from the
    /// cached string. On failure the previous entry is left untouched.
    pub fn resolve(
        &mut self,
        raw: &str,
        config: &UplinkConfig,
    ) -> Result<(&Credentials, Lookup), StatusCode> {
        if raw.is_empty() {
            return Err(StatusCode::InvalidCredentials);
        }
        if raw == self.raw {
            return Ok((&self.parsed, Lookup::Cached));
        }

        let parsed = Credentials::parse(raw, config)?;
        self.raw = raw.to_string();
        self.parsed = parsed;
        Ok((&self.parsed, Lookup::Parsed))
    }

    /// Raw string of the cached entry; empty when nothing is cached.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn device_id(&self) -> &str {
        self.parsed.device_id()
    }

    pub fn token(&self) -> &str {
        self.parsed.token()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCache")
            .field("device_id", &self.parsed.device_id)
            .finish_non_exhaustive()
    }
}
