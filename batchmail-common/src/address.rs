use std::{
    fmt::{self, Display},
    ops::Deref,
};

use serde::{Deserialize, Deserializer, Serialize};

/// The batch document accepts either a single address or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// An ordered list of mailbox strings as written in the batch document.
///
/// Addresses are kept verbatim (`Jane <jane@example.com>` stays as is) so
/// they can be placed in headers unchanged; [`AddressList::mailboxes`] yields
/// the bare `local@domain` form the SMTP envelope needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AddressList(pub Vec<String>);

impl<'de> Deserialize<'de> for AddressList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(address) => Self(vec![address]),
            OneOrMany::Many(addresses) => Self(addresses),
        })
    }
}

impl From<Vec<String>> for AddressList {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<&str> for AddressList {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl Deref for AddressList {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl AddressList {
    /// Bare envelope addresses, in order.
    pub fn mailboxes(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|address| mailbox(address))
    }
}

/// Strips a display name, returning what sits between `<` and `>` if present.
pub fn mailbox(address: &str) -> &str {
    let trimmed = address.trim();
    match (trimmed.rfind('<'), trimmed.rfind('>')) {
        (Some(start), Some(end)) if start < end => trimmed[start + 1..end].trim(),
        _ => trimmed,
    }
}
