//! TLS configuration for the relay connection.

use serde::{Deserialize, Serialize};

/// When to upgrade the relay connection with STARTTLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
    /// Always issue STARTTLS; a relay that refuses it cannot be used.
    ///
    /// Credentials are sent right after the upgrade, so this is the default.
    #[default]
    Required,

    /// Issue STARTTLS only when the relay advertises it.
    Opportunistic,

    /// Never use TLS.
    ///
    /// **WARNING**: credentials travel in plaintext. Only for local test relays.
    Disabled,
}

/// TLS settings for the relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TlsConfig {
    /// Default: `Required`
    #[serde(default)]
    pub policy: TlsPolicy,

    /// Whether to accept invalid TLS certificates (self-signed, expired, etc.).
    ///
    /// **SECURITY WARNING**: Setting this to `true` disables certificate
    /// validation and makes the connection vulnerable to man-in-the-middle
    /// attacks.
    ///
    /// Default: `false`
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl TlsConfig {
    /// Plaintext connection, for relays running on the loopback interface.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            policy: TlsPolicy::Disabled,
            accept_invalid_certs: false,
        }
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self.policy, TlsPolicy::Required)
    }

    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self.policy, TlsPolicy::Disabled)
    }
}
