//! Reads a batch document.
//!
//! The document is multi-document YAML: the first document configures the
//! run, every following document is one message.
//!
//! ```yaml
//! from: Lecturer <lecturer@example.com>
//! subject: Exam results
//! header: Hello,
//! footer: Regards
//! ---
//! to: student0@example.com
//! body: You passed.
//! ---
//! to: [student1@example.com, parent1@example.com]
//! body: You passed too.
//! ```

use std::path::Path;

use batchmail_common::{
    AddressList, ConfigError, Configuration, MessageSpec,
    batch::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT},
    config::{ClientTimeouts, RetryPolicy, TlsConfig},
    tracing::debug,
};
use serde::Deserialize;

use crate::credentials;

/// A validated batch document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub config: Configuration,
    pub messages: Vec<MessageSpec>,
}

#[derive(Debug, Deserialize)]
struct RawConfiguration {
    #[serde(alias = "from_address")]
    from: Option<String>,
    subject: Option<String>,
    header: Option<String>,
    footer: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    user: Option<String>,
    cc: Option<AddressList>,
    bcc: Option<AddressList>,
    helo_name: Option<String>,
    #[serde(default)]
    tls: TlsConfig,
    #[serde(default)]
    timeouts: ClientTimeouts,
    #[serde(default)]
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    to: Option<AddressList>,
    body: Option<String>,
}

/// Reads and validates the batch document at `path`.
///
/// `from_override` replaces the `from` key of the document.
///
/// # Errors
///
/// `NotFound` when `path` does not exist, `Io` when it cannot be read, and
/// whatever [`parse_batch`] reports for its contents.
pub fn load_batch(path: &Path, from_override: Option<&str>) -> Result<Batch, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let batch = parse_batch(&text, from_override)?;
    debug!(
        path = %path.display(),
        messages = batch.messages.len(),
        "Loaded batch document"
    );

    Ok(batch)
}

/// Validates a batch document held in memory.
///
/// Empty documents at the end (a trailing `---`) are skipped. Messages are
/// numbered from 0 in document order, the same numbering the delivery report
/// uses, so an empty document between two messages is rejected rather than
/// silently shifting that numbering.
///
/// # Errors
///
/// `Parse` when the text is not YAML or a document is not a mapping of the
/// expected shape; `Validation` when a required value is missing, a message
/// document is empty, or a header value spans several lines.
pub fn parse_batch(text: &str, from_override: Option<&str>) -> Result<Batch, ConfigError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        documents.push(value);
    }

    let mut documents = documents.into_iter();
    let config = match documents.next() {
        None | Some(serde_yaml::Value::Null) => {
            return Err(ConfigError::validation(
                "The first document must hold the configuration",
            ));
        }
        Some(value) => serde_yaml::from_value::<RawConfiguration>(value)
            .map_err(|e| ConfigError::Parse(format!("Configuration: {e}")))?,
    };
    let config = validate_configuration(config, from_override)?;

    let mut documents: Vec<_> = documents.collect();
    while documents.last().is_some_and(serde_yaml::Value::is_null) {
        documents.pop();
    }

    let messages = documents
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            if value.is_null() {
                return Err(ConfigError::validation(format!(
                    "Message {index}: document is empty"
                )));
            }
            let raw = serde_yaml::from_value::<RawMessage>(value)
                .map_err(|e| ConfigError::Parse(format!("Message {index}: {e}")))?;
            validate_message(index, raw)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Batch { config, messages })
}

/// Header values are written on one line; a line break would end the header
/// early and let the rest of the value pose as another header.
fn single_line(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.contains(['\r', '\n']) {
        return Err(ConfigError::validation(format!(
            "Field \"{field}\" must not contain line breaks"
        )));
    }
    Ok(())
}

fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::validation(format!("Field \"{field}\" is required")))
}

fn validate_configuration(
    raw: RawConfiguration,
    from_override: Option<&str>,
) -> Result<Configuration, ConfigError> {
    let from_address = required(from_override.map(str::to_string).or(raw.from), "from")?;
    let subject = required(raw.subject, "subject")?;
    let user = required(raw.user.or_else(credentials::login_name), "user")?;
    let cc = raw.cc.unwrap_or_default();
    let bcc = raw.bcc.unwrap_or_default();

    single_line(&from_address, "from")?;
    single_line(&subject, "subject")?;
    for address in cc.iter() {
        single_line(address, "cc")?;
    }
    for address in bcc.iter() {
        single_line(address, "bcc")?;
    }

    if raw.smtp_port == Some(0) {
        return Err(ConfigError::validation("Field \"smtp_port\" must not be 0"));
    }

    Ok(Configuration {
        from_address,
        subject,
        header: raw.header.unwrap_or_default(),
        footer: raw.footer.unwrap_or_default(),
        smtp_host: raw
            .smtp_host
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        smtp_port: raw.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
        user,
        cc,
        bcc,
        helo_name: raw.helo_name.unwrap_or_else(local_hostname),
        tls: raw.tls,
        timeouts: raw.timeouts,
        retry: raw.retry,
    })
}

fn validate_message(index: usize, raw: RawMessage) -> Result<MessageSpec, ConfigError> {
    let to = raw.to.ok_or_else(|| {
        ConfigError::validation(format!("Message {index}: field \"to\" is required"))
    })?;
    if to.is_empty() || to.iter().any(|address| address.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Message {index}: field \"to\" must name at least one address"
        )));
    }
    if to.iter().any(|address| address.contains(['\r', '\n'])) {
        return Err(ConfigError::validation(format!(
            "Message {index}: field \"to\" must not contain line breaks"
        )));
    }

    let body = raw.body.ok_or_else(|| {
        ConfigError::validation(format!("Message {index}: field \"body\" is required"))
    })?;

    Ok(MessageSpec { to, body })
}

fn local_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
