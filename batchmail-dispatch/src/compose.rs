use batchmail_common::{Configuration, MessageSpec, address::mailbox};
use batchmail_smtp::client::MessageBuilder;

/// SMTP envelope of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: String,
    /// To, Cc and Bcc mailboxes, in that order, without duplicates.
    pub recipients: Vec<String>,
}

/// A fully rendered message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub envelope: Envelope,
    pub content: String,
    /// Plain text of the body before transfer encoding.
    pub text: String,
}

impl OutgoingMessage {
    /// The rendered headers followed by the readable body, for logging.
    pub fn preview(&self) -> String {
        let headers = self
            .content
            .split_once("\r\n\r\n")
            .map_or(self.content.as_str(), |(headers, _)| headers);
        format!("{headers}\r\n\r\n{}", self.text)
    }
}

/// Renders `spec` with the batch-wide settings of `config`.
///
/// Bcc addresses only reach the envelope, never the headers.
pub fn compose(config: &Configuration, spec: &MessageSpec) -> OutgoingMessage {
    let text = config.wrap_body(&spec.body);
    let content = MessageBuilder::new()
        .from(config.from_address.as_str())
        .to_multiple(spec.to.as_slice())
        .cc_multiple(config.cc.as_slice())
        .subject(config.subject.as_str())
        .body(text.as_str())
        .build();

    let mut recipients: Vec<String> = Vec::new();
    for address in spec
        .to
        .mailboxes()
        .chain(config.cc.mailboxes())
        .chain(config.bcc.mailboxes())
    {
        if !recipients.iter().any(|r| r.eq_ignore_ascii_case(address)) {
            recipients.push(address.to_string());
        }
    }

    OutgoingMessage {
        envelope: Envelope {
            sender: mailbox(&config.from_address).to_string(),
            recipients,
        },
        content,
        text,
    }
}
