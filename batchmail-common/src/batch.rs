//! The validated form of a batch document.
//!
//! Both types are built once by the loader and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::{
    address::AddressList,
    config::{ClientTimeouts, RetryPolicy, TlsConfig},
};

/// Relay used when the batch document does not name one.
pub const DEFAULT_SMTP_HOST: &str = "smtp.univ-amu.fr";

/// Submission port used when the batch document does not name one.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Process-wide settings shared by every message of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub from_address: String,
    pub subject: String,
    /// Text placed before every message body.
    pub header: String,
    /// Text placed after every message body.
    pub footer: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// SMTP AUTH identity.
    pub user: String,
    pub cc: AddressList,
    pub bcc: AddressList,
    /// Name announced in EHLO.
    pub helo_name: String,
    pub tls: TlsConfig,
    pub timeouts: ClientTimeouts,
    pub retry: RetryPolicy,
}

impl Configuration {
    /// A configuration with every optional field at its default.
    pub fn new(
        from_address: impl Into<String>,
        subject: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            from_address: from_address.into(),
            subject: subject.into(),
            header: String::new(),
            footer: String::new(),
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            user: user.into(),
            cc: AddressList::default(),
            bcc: AddressList::default(),
            helo_name: "localhost".to_string(),
            tls: TlsConfig::default(),
            timeouts: ClientTimeouts::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// `host:port` of the relay.
    pub fn relay_address(&self) -> String {
        format!("{}:{}", self.smtp_host, self.smtp_port)
    }

    /// The text actually sent for `body`: header, body and footer on their
    /// own lines.
    pub fn wrap_body(&self, body: &str) -> String {
        format!("{}\n{}\n{}", self.header, body, self.footer)
    }
}

/// One personalised message of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSpec {
    pub to: AddressList,
    pub body: String,
}

impl MessageSpec {
    pub fn new(to: impl Into<AddressList>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
        }
    }
}
