//! Relay sessions over SMTP.
//!
//! [`SmtpConnector::connect`] runs the whole session setup:
//! 1. Connects to the relay and reads the greeting
//! 2. Sends EHLO
//! 3. Upgrades with STARTTLS according to the TLS policy, then repeats EHLO
//! 4. Authenticates with the configured credentials
//!
//! [`SmtpSession::submit`] then runs one MAIL / RCPT / DATA transaction per
//! message on that connection.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use batchmail_common::{
    Configuration,
    config::{ClientTimeouts, TlsConfig},
    tracing::{debug, info, warn},
};
use batchmail_smtp::client::{self, Credentials, Response, SmtpClient};

use crate::{
    compose::OutgoingMessage,
    error::SessionError,
    session::{Connector, RefusedRecipient, Session, Submission},
};

/// Runs one client step under `duration`.
async fn timed<T>(
    duration: Duration,
    step: &str,
    future: impl Future<Output = client::Result<T>>,
) -> Result<T, SessionError> {
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| SessionError::transport(format!("{step} timed out after {duration:?}")))?
        .map_err(SessionError::from)
}

/// A reply that breaks the session when it is not the expected class.
fn unexpected(step: &str, response: &Response) -> SessionError {
    SessionError::Transport {
        code: Some(response.code),
        detail: format!("Server rejected {step}: {}", response.message()),
    }
}

/// Opens authenticated SMTP sessions to the configured relay.
pub struct SmtpConnector {
    address: String,
    server_name: String,
    helo_name: String,
    tls: TlsConfig,
    timeouts: ClientTimeouts,
    credentials: Credentials,
}

impl SmtpConnector {
    pub fn new(config: &Configuration, password: impl Into<String>) -> Self {
        Self {
            address: config.relay_address(),
            server_name: config.smtp_host.clone(),
            helo_name: config.helo_name.clone(),
            tls: config.tls,
            timeouts: config.timeouts.clone(),
            credentials: Credentials::new(config.user.clone(), password),
        }
    }

    async fn ehlo(&self, client: &mut SmtpClient) -> Result<Response, SessionError> {
        let response = timed(self.timeouts.ehlo(), "EHLO", client.ehlo(&self.helo_name)).await?;
        if !response.is_success() {
            return Err(unexpected("EHLO", &response));
        }
        debug!(relay = %self.address, capabilities = %response.capabilities(), "EHLO accepted");
        Ok(response)
    }

    /// Issues STARTTLS when the policy asks for it and returns the EHLO reply
    /// valid for the rest of the session.
    async fn negotiate_tls(
        &self,
        client: &mut SmtpClient,
        ehlo: Response,
    ) -> Result<Response, SessionError> {
        if self.tls.is_disabled() {
            return Ok(ehlo);
        }

        if !ehlo.capabilities().starttls && !self.tls.is_required() {
            debug!(relay = %self.address, "Relay does not offer STARTTLS, continuing in plaintext");
            return Ok(ehlo);
        }

        let response = timed(self.timeouts.starttls(), "STARTTLS", client.starttls()).await?;
        if !response.is_success() {
            return Err(unexpected("STARTTLS", &response));
        }

        // Capabilities announced before the upgrade no longer apply (RFC 3207)
        self.ehlo(client).await
    }

    async fn authenticate(
        &self,
        client: &mut SmtpClient,
        ehlo: &Response,
    ) -> Result<(), SessionError> {
        let response = timed(
            self.timeouts.auth(),
            "AUTH",
            client.authenticate(&self.credentials, &ehlo.capabilities()),
        )
        .await?;

        // 503: already authenticated
        if response.code == 235 || response.code == 503 {
            return Ok(());
        }

        if response.is_permanent_error() {
            let _ = tokio::time::timeout(self.timeouts.quit(), client.quit()).await;
            return Err(SessionError::Authentication {
                code: response.code,
                detail: response.message(),
            });
        }

        Err(unexpected("AUTH", &response))
    }
}

#[async_trait]
impl Connector for SmtpConnector {
    type Session = SmtpSession;

    #[tracing::instrument(level = "debug", skip(self), fields(relay = %self.address, user = %self.credentials.user()))]
    async fn connect(&mut self) -> Result<SmtpSession, SessionError> {
        if self.tls.accept_invalid_certs {
            warn!(
                relay = %self.address,
                "SECURITY WARNING: TLS certificate validation is disabled for this connection"
            );
        }

        let mut client = timed(
            self.timeouts.connect(),
            "Connect",
            SmtpClient::connect(&self.address, self.server_name.clone()),
        )
        .await?
        .accept_invalid_certs(self.tls.accept_invalid_certs);

        let greeting = timed(self.timeouts.connect(), "Greeting", client.read_greeting()).await?;
        if !greeting.is_success() {
            return Err(unexpected("connection", &greeting));
        }

        let ehlo = self.ehlo(&mut client).await?;
        let ehlo = self.negotiate_tls(&mut client, ehlo).await?;
        info!(relay = %self.address, tls = client.is_tls(), "Connected to SMTP server");

        self.authenticate(&mut client, &ehlo).await?;
        info!(relay = %self.address, user = %self.credentials.user(), "Logged in to SMTP server");

        Ok(SmtpSession {
            client,
            timeouts: self.timeouts.clone(),
        })
    }
}

/// An authenticated SMTP connection.
pub struct SmtpSession {
    client: SmtpClient,
    timeouts: ClientTimeouts,
}

#[async_trait]
impl Session for SmtpSession {
    async fn submit(&mut self, message: &OutgoingMessage) -> Result<Submission, SessionError> {
        let envelope = &message.envelope;

        let response = timed(
            self.timeouts.mail_from(),
            "MAIL FROM",
            self.client.mail_from(&envelope.sender),
        )
        .await?;
        if response.code == 530 {
            return Err(SessionError::Authentication {
                code: response.code,
                detail: response.message(),
            });
        }
        if !response.is_success() {
            return Err(unexpected("MAIL FROM", &response));
        }

        let mut refused = Vec::new();
        for recipient in &envelope.recipients {
            let response = timed(
                self.timeouts.rcpt_to(),
                "RCPT TO",
                self.client.rcpt_to(recipient),
            )
            .await?;

            if response.is_closing() {
                return Err(unexpected("RCPT TO", &response));
            }
            if !response.is_success() {
                refused.push(RefusedRecipient {
                    address: recipient.clone(),
                    code: response.code,
                    detail: response.message(),
                });
            }
        }

        if refused.len() == envelope.recipients.len() {
            let response = timed(self.timeouts.mail_from(), "RSET", self.client.rset()).await?;
            if !response.is_success() {
                return Err(unexpected("RSET", &response));
            }
            return Ok(Submission::Rejected { refused });
        }

        let response = timed(self.timeouts.data(), "DATA", self.client.data()).await?;
        if !response.is_intermediate() {
            return Err(unexpected("DATA", &response));
        }

        let response = timed(
            self.timeouts.data(),
            "Message data",
            self.client.send_data(&message.content),
        )
        .await?;
        if !response.is_success() {
            return Err(unexpected("message data", &response));
        }

        if refused.is_empty() {
            Ok(Submission::Accepted)
        } else {
            Ok(Submission::Rejected { refused })
        }
    }

    async fn close(mut self) {
        match tokio::time::timeout(self.timeouts.quit(), self.client.quit()).await {
            Ok(Ok(_)) => debug!("SMTP session closed"),
            Ok(Err(e)) => debug!(error = %e, "QUIT failed, dropping connection"),
            Err(_) => debug!(timeout = ?self.timeouts.quit(), "QUIT timed out, dropping connection"),
        }
    }
}
