//! Configuration sections shared by the loader and the dispatch engine.
//!
//! - [`timeouts`]: per-command timeouts for the SMTP client
//! - [`tls`]: STARTTLS policy and certificate validation
//! - [`retry`]: the reconnect ceiling applied to each message

pub mod retry;
pub mod timeouts;
pub mod tls;

pub use retry::RetryPolicy;
pub use timeouts::ClientTimeouts;
pub use tls::{TlsConfig, TlsPolicy};
