use std::fmt;

use crate::session::RefusedRecipient;

/// Terminal outcome of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Sent,
    Rejected { refused: Vec<RefusedRecipient> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReport {
    pub index: usize,
    pub outcome: MessageOutcome,
}

/// Delivery accounting for one run.
///
/// `sent <= attempted <= total` always holds: a message is counted once it
/// reaches a terminal outcome, never per reconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages in the batch.
    pub total: usize,
    /// Messages that reached a terminal outcome.
    pub attempted: usize,
    /// Messages the relay accepted for every recipient.
    pub sent: usize,
    pub messages: Vec<MessageReport>,
}

impl DeliveryReport {
    pub(crate) const fn new(total: usize) -> Self {
        Self {
            total,
            attempted: 0,
            sent: 0,
            messages: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, index: usize, outcome: MessageOutcome) {
        self.attempted += 1;
        if outcome == MessageOutcome::Sent {
            self.sent += 1;
        }
        self.messages.push(MessageReport { index, outcome });
    }

    /// Messages with at least one refused recipient.
    pub fn rejected(&self) -> impl Iterator<Item = (usize, &[RefusedRecipient])> {
        self.messages
            .iter()
            .filter_map(|message| match &message.outcome {
                MessageOutcome::Rejected { refused } => Some((message.index, refused.as_slice())),
                MessageOutcome::Sent => None,
            })
    }
}

impl fmt::Display for DeliveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} e-mails sent", self.sent, self.total)
    }
}
