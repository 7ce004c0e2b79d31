//! Plain-text message builder.
//!
//! Messages are single-part `text/plain; charset="utf-8"` bodies carried in
//! base64, so arbitrary text survives 7-bit relays untouched.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, Local};

/// Longest base64 line in the body (RFC 2045 section 6.8).
const BODY_LINE_LENGTH: usize = 76;

/// Bytes of header text per RFC 2047 encoded word, keeping each word under
/// the 75 character limit once encoded.
const ENCODED_WORD_BYTES: usize = 45;

/// Builder for constructing plain-text email messages.
///
/// # Examples
///
/// ```
/// use batchmail_smtp::client::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .subject("Hello")
///     .body("This is the message body")
///     .build();
///
/// assert!(message.contains("Subject: Hello\r\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    subject: Option<String>,
    date: Option<DateTime<FixedOffset>>,
    body: Option<String>,
}

impl MessageBuilder {
    /// Creates a new empty message builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From header.
    #[must_use]
    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(email.into());
        self
    }

    /// Adds a recipient to the To header.
    #[must_use]
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.to.push(email.into());
        self
    }

    /// Adds multiple recipients to the To header.
    #[must_use]
    pub fn to_multiple(mut self, emails: &[impl AsRef<str>]) -> Self {
        self.to
            .extend(emails.iter().map(|email| email.as_ref().to_string()));
        self
    }

    /// Adds multiple recipients to the Cc header.
    #[must_use]
    pub fn cc_multiple(mut self, emails: &[impl AsRef<str>]) -> Self {
        self.cc
            .extend(emails.iter().map(|email| email.as_ref().to_string()));
        self
    }

    /// Sets the Subject header. Non-ASCII text is RFC 2047 encoded.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the Date header. Defaults to the time of [`build`](Self::build).
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the message body content.
    #[must_use]
    pub fn body(mut self, content: impl Into<String>) -> Self {
        self.body = Some(content.into());
        self
    }

    /// Renders the message with CRLF line endings.
    #[must_use]
    pub fn build(self) -> String {
        let date = self.date.unwrap_or_else(|| Local::now().fixed_offset());
        let mut message = String::with_capacity(1024);

        push_header(&mut message, "Date", &date.to_rfc2822());

        if let Some(from) = &self.from {
            push_header(&mut message, "From", &single_line(from));
        }

        if !self.to.is_empty() {
            push_header(&mut message, "To", &single_line(&self.to.join(",")));
        }

        if !self.cc.is_empty() {
            push_header(&mut message, "Cc", &single_line(&self.cc.join(",")));
        }

        if let Some(subject) = &self.subject {
            push_header(&mut message, "Subject", &encode_header_value(subject));
        }

        push_header(&mut message, "MIME-Version", "1.0");
        push_header(&mut message, "Content-Type", "text/plain; charset=\"utf-8\"");
        push_header(&mut message, "Content-Transfer-Encoding", "base64");

        message.push_str("\r\n");

        let encoded = STANDARD.encode(self.body.unwrap_or_default());
        for chunk in encoded.as_bytes().chunks(BODY_LINE_LENGTH) {
            // base64 output is pure ASCII
            message.push_str(std::str::from_utf8(chunk).unwrap_or_default());
            message.push_str("\r\n");
        }

        message
    }
}

fn push_header(message: &mut String, name: &str, value: &str) {
    message.push_str(name);
    message.push_str(": ");
    message.push_str(value);
    message.push_str("\r\n");
}

/// Joins the lines of a caller-supplied header value with single spaces, so
/// the value can never end the header block or start a header of its own.
fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Encodes a header value as RFC 2047 `B` encoded words when it is not plain
/// ASCII. Long values are split into several words on folded lines, never
/// inside a UTF-8 sequence.
///
/// Line breaks in `value` are replaced by spaces first.
pub fn encode_header_value(value: &str) -> String {
    let value = single_line(value);
    if value.is_ascii() {
        return value;
    }

    let mut words = Vec::new();
    let mut start = 0;
    while start < value.len() {
        let mut end = (start + ENCODED_WORD_BYTES).min(value.len());
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        words.push(format!("=?utf-8?b?{}?=", STANDARD.encode(&value[start..end])));
        start = end;
    }

    words.join("\r\n ")
}
