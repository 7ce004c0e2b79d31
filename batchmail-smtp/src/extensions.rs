use core::fmt::{self, Display};

use crate::client::{Mechanism, Response};

/// SMTP service extensions a relay advertised in its EHLO reply.
///
/// Only the extensions the submission client acts on are tracked; anything
/// else in the reply is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// STARTTLS (RFC 3207).
    pub starttls: bool,

    /// AUTH (RFC 4954) mechanisms we know how to drive, in the order
    /// advertised.
    pub auth: Vec<Mechanism>,
}

impl Capabilities {
    /// Reads the keyword lines of an EHLO reply. The first line is the
    /// server's greeting and never carries an extension.
    pub fn from_ehlo(response: &Response) -> Self {
        let mut capabilities = Self::default();

        for line in response.lines.iter().skip(1) {
            let mut words = line.split_whitespace();
            let Some(keyword) = words.next() else {
                continue;
            };

            match keyword.to_ascii_uppercase().as_str() {
                "STARTTLS" => capabilities.starttls = true,
                // Some older relays still announce `AUTH=PLAIN LOGIN`
                kw if kw == "AUTH" || kw.starts_with("AUTH=") => {
                    let first = kw.strip_prefix("AUTH=").filter(|rest| !rest.is_empty());
                    for name in first.into_iter().chain(words) {
                        if let Ok(mechanism) = name.parse::<Mechanism>()
                            && !capabilities.auth.contains(&mechanism)
                        {
                            capabilities.auth.push(mechanism);
                        }
                    }
                }
                _ => {}
            }
        }

        capabilities
    }

    /// The mechanism to authenticate with: PLAIN when offered, then LOGIN,
    /// and PLAIN when the relay advertised nothing we understand.
    pub fn preferred_mechanism(&self) -> Mechanism {
        if self.auth.contains(&Mechanism::Plain) {
            Mechanism::Plain
        } else if self.auth.contains(&Mechanism::Login) {
            Mechanism::Login
        } else {
            Mechanism::Plain
        }
    }
}

impl Display for Capabilities {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.starttls {
            parts.push("STARTTLS".to_string());
        }
        if !self.auth.is_empty() {
            let names = self
                .auth
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            parts.push(format!("AUTH {names}"));
        }
        fmt.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ehlo(lines: &[&str]) -> Response {
        Response::new(250, lines.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_parses_common_keywords() {
        let caps = ehlo(&[
            "smtp.example.com Hello",
            "SIZE 35882577",
            "8BITMIME",
            "STARTTLS",
            "AUTH LOGIN PLAIN XOAUTH2",
        ])
        .capabilities();

        assert!(caps.starttls);
        assert_eq!(caps.auth, vec![Mechanism::Login, Mechanism::Plain]);
        assert_eq!(caps.preferred_mechanism(), Mechanism::Plain);
    }

    #[test]
    fn test_greeting_line_is_not_a_keyword() {
        let caps = ehlo(&["STARTTLS"]).capabilities();
        assert!(!caps.starttls);
    }

    #[test]
    fn test_legacy_auth_equals_form() {
        let caps = ehlo(&["relay", "AUTH=LOGIN"]).capabilities();
        assert_eq!(caps.auth, vec![Mechanism::Login]);
        assert_eq!(caps.preferred_mechanism(), Mechanism::Login);
    }

    #[test]
    fn test_no_auth_falls_back_to_plain() {
        let caps = ehlo(&["relay", "SIZE"]).capabilities();
        assert!(caps.auth.is_empty());
        assert_eq!(caps.preferred_mechanism(), Mechanism::Plain);
    }

    #[test]
    fn test_display_lists_known_extensions() {
        let caps = ehlo(&["relay", "STARTTLS", "AUTH PLAIN", "SIZE 100"]).capabilities();
        assert_eq!(caps.to_string(), "STARTTLS, AUTH PLAIN");
    }
}
