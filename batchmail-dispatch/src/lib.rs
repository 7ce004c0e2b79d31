//! Sends an ordered batch of messages through one authenticated relay
//! session, reconnecting when the relay drops the connection.
//!
//! The [`DispatchEngine`] owns the session for the whole run and walks the
//! batch one message at a time:
//!
//! - a transport failure rebuilds the session and resends the same message,
//!   up to the [`RetryPolicy`](batchmail_common::config::RetryPolicy) ceiling
//! - a recipient rejection is recorded and the run moves on
//! - an authentication failure aborts the run immediately
//!
//! The relay is reached through the [`Connector`] / [`Session`] seam;
//! [`SmtpConnector`] is the production implementation.

mod compose;
mod engine;
mod error;
mod report;
mod session;
mod smtp;

pub use compose::{Envelope, OutgoingMessage, compose};
pub use engine::{DispatchEngine, DispatchOptions};
pub use error::{DispatchError, FatalError, SessionError};
pub use report::{DeliveryReport, MessageOutcome, MessageReport};
pub use session::{Connector, RefusedRecipient, Session, Submission};
pub use smtp::{SmtpConnector, SmtpSession};
