//! SMTP submission client.
//!
//! The client speaks just enough SMTP to hand messages to an authenticated
//! relay:
//!
//! - Plain TCP with an optional STARTTLS upgrade
//! - AUTH PLAIN and AUTH LOGIN
//! - MAIL / RCPT / DATA with dot-stuffing, RSET and QUIT
//!
//! Commands return the server [`Response`] whatever its code; interpreting a
//! 4xx or 5xx reply is left to the caller. Only network, TLS and framing
//! problems surface as [`ClientError`].
//!
//! # Example
//!
//! ```no_run
//! use batchmail_smtp::client::{Credentials, MessageBuilder, SmtpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = SmtpClient::connect("smtp.example.com:587", "smtp.example.com").await?;
//! client.read_greeting().await?;
//! client.ehlo("client.example.com").await?;
//! client.starttls().await?;
//! let ehlo = client.ehlo("client.example.com").await?;
//!
//! let credentials = Credentials::new("jane", "secret");
//! client.authenticate(&credentials, &ehlo.capabilities()).await?;
//!
//! let message = MessageBuilder::new()
//!     .from("jane@example.com")
//!     .to("john@example.com")
//!     .subject("Hello")
//!     .body("Hello John")
//!     .build();
//!
//! client.mail_from("jane@example.com").await?;
//! client.rcpt_to("john@example.com").await?;
//! client.data().await?;
//! client.send_data(&message).await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod error;
mod message;
mod response;
mod smtp_client;

pub use auth::{Credentials, Mechanism};
pub use error::{ClientError, Result};
pub use message::{MessageBuilder, encode_header_value};
pub use response::{Response, ResponseLine};
pub use smtp_client::SmtpClient;
