//! Reconnect policy for transport failures.
//!
//! Some relays drop the session after a fixed number of messages. A transport
//! failure therefore rebuilds the connection and resends the same message,
//! up to a ceiling, instead of giving up on the batch straight away.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Consecutive transport failures tolerated for a single message.
    ///
    /// Reaching this count aborts the whole batch. Values below 1 are
    /// treated as 1.
    ///
    /// Default: 3
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Pause before reconnecting after a transport failure, in milliseconds.
    ///
    /// Default: 0
    #[serde(default = "defaults::reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            reconnect_delay_ms: defaults::reconnect_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Check if another attempt is allowed after `failures` transport failures
    /// on the same message.
    #[must_use]
    pub const fn should_retry(&self, failures: u32) -> bool {
        let ceiling = if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        };
        failures < ceiling
    }

    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

mod defaults {
    pub const fn max_attempts() -> u32 {
        3
    }

    pub const fn reconnect_delay_ms() -> u64 {
        0
    }
}
