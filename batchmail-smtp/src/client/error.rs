use std::io;

use thiserror::Error;

/// Why the conversation with the relay could not continue.
///
/// A reply carrying a 4xx or 5xx code is not an error at this level; it is
/// returned as a regular [`Response`](super::Response) for the caller to
/// classify.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The relay sent something that is not an SMTP reply.
    #[error("Malformed SMTP reply: {0}")]
    Malformed(String),

    /// Certificate loading, name validation or the handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The relay hung up, or the connection was already consumed by a
    /// failed STARTTLS.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Reply is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
