//! Failure taxonomy for a dispatch run.
//!
//! [`SessionError`] is what a relay session reports for a single step. The
//! engine turns it into either a reconnect or a [`FatalError`]:
//!
//! - `Authentication` is always fatal
//! - `Transport` is retried until the reconnect ceiling is reached

use batchmail_smtp::client::ClientError;
use thiserror::Error;

use crate::report::DeliveryReport;

/// A failure reported by a relay session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The relay refused the credentials. Retrying with the same secret
    /// cannot succeed and risks locking the account.
    #[error("Authentication failed: [{code}] {detail}")]
    Authentication { code: u16, detail: String },

    /// The connection or the SMTP conversation broke down.
    #[error("Transport failure{}: {detail}", code.map(|c| format!(" [{c}]")).unwrap_or_default())]
    Transport { code: Option<u16>, detail: String },
}

impl SessionError {
    /// A transport failure that did not come with an SMTP reply code.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            code: None,
            detail: detail.into(),
        }
    }
}

/// Network, TLS and framing problems all mean the session is unusable.
impl From<ClientError> for SessionError {
    fn from(error: ClientError) -> Self {
        Self::transport(error.to_string())
    }
}

/// Why a dispatch run stopped before the end of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("Authentication failed while sending message {message_index}: [{code}] {detail}")]
    AuthenticationFailure {
        message_index: usize,
        code: u16,
        detail: String,
    },

    #[error(
        "Giving up on message {message_index} after {attempts} transport failures, last: {}{last_detail}",
        last_code.map(|c| format!("[{c}] ")).unwrap_or_default()
    )]
    TransportFailureExceeded {
        message_index: usize,
        attempts: u32,
        last_code: Option<u16>,
        last_detail: String,
    },
}

impl FatalError {
    /// Index of the message being processed when the run was aborted.
    #[must_use]
    pub const fn message_index(&self) -> usize {
        match self {
            Self::AuthenticationFailure { message_index, .. }
            | Self::TransportFailureExceeded { message_index, .. } => *message_index,
        }
    }
}

/// A fatal abort together with what had been delivered before it.
///
/// Messages counted in `report` stay sent; nothing is rolled back.
#[derive(Debug, Error)]
#[error("Dispatch aborted: {cause}")]
pub struct DispatchError {
    pub cause: FatalError,
    pub report: DeliveryReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_conversion_is_transport() {
        let error: SessionError = ClientError::ConnectionClosed.into();
        assert_eq!(
            error,
            SessionError::transport("Connection closed unexpectedly")
        );

        let error: SessionError = ClientError::Tls("Handshake failed".to_string()).into();
        assert!(matches!(error, SessionError::Transport { code: None, .. }));
    }

    #[test]
    fn test_session_error_display() {
        let error = SessionError::Transport {
            code: Some(421),
            detail: "Too many messages".to_string(),
        };
        assert_eq!(error.to_string(), "Transport failure [421]: Too many messages");
        assert_eq!(
            SessionError::transport("reset").to_string(),
            "Transport failure: reset"
        );
    }

    #[test]
    fn test_fatal_error_display() {
        let error = FatalError::TransportFailureExceeded {
            message_index: 4,
            attempts: 3,
            last_code: Some(451),
            last_detail: "Try again later".to_string(),
        };
        assert_eq!(error.message_index(), 4);
        assert_eq!(
            error.to_string(),
            "Giving up on message 4 after 3 transport failures, last: [451] Try again later"
        );

        let error = FatalError::AuthenticationFailure {
            message_index: 0,
            code: 535,
            detail: "Bad credentials".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Authentication failed while sending message 0: [535] Bad credentials"
        );
    }
}
