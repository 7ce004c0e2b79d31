//! The dispatch loop.

use batchmail_common::{
    Configuration, MessageSpec, internal,
    tracing::{debug, info, warn},
};

use crate::{
    compose::{OutgoingMessage, compose},
    error::{DispatchError, FatalError, SessionError},
    report::{DeliveryReport, MessageOutcome},
    session::{Connector, Session, Submission},
};

/// Switches that change how a run behaves without changing what it sends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Compose and report every message without touching the network.
    pub dry_run: bool,
    /// Log each composed message at `INFO` instead of `DEBUG`.
    pub verbose: bool,
}

/// Sends a batch in order through a single relay session.
///
/// At most one session is open at any time. It is opened on the first
/// message that needs it, replaced after a transport failure and closed
/// exactly once when the run ends, whatever the outcome.
pub struct DispatchEngine<C: Connector> {
    config: Configuration,
    connector: C,
    options: DispatchOptions,
    session: Option<C::Session>,
}

impl<C: Connector> DispatchEngine<C> {
    pub const fn new(config: Configuration, connector: C, options: DispatchOptions) -> Self {
        Self {
            config,
            connector,
            options,
            session: None,
        }
    }

    /// Sends every message of `messages`, in order.
    ///
    /// Rejected recipients are recorded and do not stop the run.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the relay refuses the credentials or
    /// when one message exhausts the reconnect ceiling. The error carries the
    /// report of everything delivered before the abort.
    #[tracing::instrument(skip_all, fields(total = messages.len(), dry_run = self.options.dry_run))]
    pub async fn dispatch(
        &mut self,
        messages: &[MessageSpec],
    ) -> Result<DeliveryReport, DispatchError> {
        let mut report = DeliveryReport::new(messages.len());
        let result = self.run(messages, &mut report).await;

        self.shutdown().await;

        match result {
            Ok(()) => {
                info!("{report}");
                Ok(report)
            }
            Err(cause) => {
                warn!(
                    message_index = cause.message_index(),
                    sent = report.sent,
                    "Dispatch aborted: {cause}"
                );
                Err(DispatchError { cause, report })
            }
        }
    }

    async fn run(
        &mut self,
        messages: &[MessageSpec],
        report: &mut DeliveryReport,
    ) -> Result<(), FatalError> {
        for (index, spec) in messages.iter().enumerate() {
            let message = compose(&self.config, spec);

            if self.options.verbose {
                internal!(level = INFO, "Message {}:\n{}", index, message.preview());
            } else {
                internal!(level = DEBUG, "Message {}:\n{}", index, message.preview());
            }

            if self.options.dry_run {
                report.record(index, MessageOutcome::Sent);
                continue;
            }

            let outcome = self.deliver(index, &message).await?;
            if let MessageOutcome::Rejected { refused } = &outcome {
                for recipient in refused {
                    warn!(
                        message_index = index,
                        recipient = %recipient.address,
                        code = recipient.code,
                        "Recipient refused: {}",
                        recipient.detail
                    );
                }
            }
            report.record(index, outcome);
        }

        Ok(())
    }

    /// Drives one message to a terminal outcome, reconnecting as the retry
    /// policy allows.
    async fn deliver(
        &mut self,
        index: usize,
        message: &OutgoingMessage,
    ) -> Result<MessageOutcome, FatalError> {
        let retry = self.config.retry.clone();
        let mut failures = 0u32;

        loop {
            match self.attempt(message).await {
                Ok(Submission::Accepted) => {
                    debug!(message_index = index, "Message accepted");
                    return Ok(MessageOutcome::Sent);
                }
                Ok(Submission::Rejected { refused }) => {
                    return Ok(MessageOutcome::Rejected { refused });
                }
                Err(SessionError::Authentication { code, detail }) => {
                    return Err(FatalError::AuthenticationFailure {
                        message_index: index,
                        code,
                        detail,
                    });
                }
                Err(SessionError::Transport { code, detail }) => {
                    failures += 1;

                    if let Some(session) = self.session.take() {
                        session.close().await;
                    }

                    if !retry.should_retry(failures) {
                        return Err(FatalError::TransportFailureExceeded {
                            message_index: index,
                            attempts: failures,
                            last_code: code,
                            last_detail: detail,
                        });
                    }

                    warn!(
                        message_index = index,
                        failures,
                        code = ?code,
                        "Transport failure, reconnecting: {detail}"
                    );

                    let delay = retry.reconnect_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    /// One submission over the current session, connecting first if needed.
    async fn attempt(&mut self, message: &OutgoingMessage) -> Result<Submission, SessionError> {
        self.ensure_connected().await?.submit(message).await
    }

    /// Returns the open session, opening one if there is none. Never retries.
    async fn ensure_connected(&mut self) -> Result<&mut C::Session, SessionError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.connector.connect().await?,
        };

        Ok(self.session.insert(session))
    }

    async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}
