//! The seam between the dispatch engine and a relay.

use async_trait::async_trait;

use crate::{compose::OutgoingMessage, error::SessionError};

/// A recipient the relay declined while accepting the rest of the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefusedRecipient {
    pub address: String,
    pub code: u16,
    pub detail: String,
}

/// What the relay did with a submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Every recipient was accepted.
    Accepted,

    /// The connection is still fine but some or all recipients were refused.
    Rejected { refused: Vec<RefusedRecipient> },
}

/// Opens authenticated sessions to the relay.
#[async_trait]
pub trait Connector: Send {
    type Session: Session;

    /// Connects, secures and authenticates a new session.
    ///
    /// Nothing is retried here; the engine decides what a failure means.
    ///
    /// # Errors
    ///
    /// `SessionError::Authentication` when the credentials are refused,
    /// `SessionError::Transport` for anything else.
    async fn connect(&mut self) -> Result<Self::Session, SessionError>;
}

/// A connected and authenticated relay session.
///
/// A value of this type is always usable; a session that failed is closed
/// and dropped, never repaired.
#[async_trait]
pub trait Session: Send {
    /// Submits one message.
    ///
    /// # Errors
    ///
    /// A `SessionError` means the session can no longer be trusted.
    async fn submit(&mut self, message: &OutgoingMessage) -> Result<Submission, SessionError>;

    /// Ends the session. Never fails; problems are only logged.
    async fn close(self);
}
