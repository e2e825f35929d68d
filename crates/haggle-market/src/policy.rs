//! Declared failure handling for secondary writes.
//!
//! Operations that touch more than one document have a primary write (the
//! chat, the message, the offer) and follow-up writes. Each follow-up has a
//! fixed policy: `Surface` returns the error to the caller, `BestEffort` logs
//! it at `warn` and lets the operation succeed.

use std::fmt;
use std::future::Future;

use tracing::warn;

use crate::error::{MarketError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    Surface,
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryWrite {
    /// Greeting sent by the buyer right after a chat is created
    SeedMessage,
    /// Reactivating an archived chat found by a new contact attempt
    ChatReactivation,
    /// Preview/timestamp/sender written after a message insert
    MessageSummary,
    /// Recipient unread counter bump after a message insert
    UnreadIncrement,
    DeliveryReceipt,
    /// Preview refresh after editing the newest message
    EditSummary,
    /// Current offer amount/status mirrored onto the chat
    OfferSummary,
    /// Chat message announcing an offer or its outcome
    OfferMessage,
}

impl SecondaryWrite {
    pub const fn policy(self) -> WritePolicy {
        match self {
            SecondaryWrite::MessageSummary | SecondaryWrite::ChatReactivation => {
                WritePolicy::Surface
            }
            SecondaryWrite::SeedMessage
            | SecondaryWrite::UnreadIncrement
            | SecondaryWrite::DeliveryReceipt
            | SecondaryWrite::EditSummary
            | SecondaryWrite::OfferSummary
            | SecondaryWrite::OfferMessage => WritePolicy::BestEffort,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SecondaryWrite::SeedMessage => "seed_message",
            SecondaryWrite::ChatReactivation => "chat_reactivation",
            SecondaryWrite::MessageSummary => "message_summary",
            SecondaryWrite::UnreadIncrement => "unread_increment",
            SecondaryWrite::DeliveryReceipt => "delivery_receipt",
            SecondaryWrite::EditSummary => "edit_summary",
            SecondaryWrite::OfferSummary => "offer_summary",
            SecondaryWrite::OfferMessage => "offer_message",
        }
    }

    /// Await `write` and apply this write's policy to a failure.
    ///
    /// `Ok(None)` means a best-effort write failed and was logged.
    pub async fn run<T, E, F>(self, write: F) -> Result<Option<T>>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<MarketError> + fmt::Display,
    {
        match write.await {
            Ok(value) => Ok(Some(value)),
            Err(e) => match self.policy() {
                WritePolicy::Surface => Err(e.into()),
                WritePolicy::BestEffort => {
                    warn!(write = self.name(), error = %e, "Best-effort write failed");
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haggle_persist::{PersistError, StoreOp};

    #[tokio::test]
    async fn test_best_effort_swallows_failure() {
        let outcome = SecondaryWrite::SeedMessage
            .run(async { Err::<(), _>(PersistError::Unavailable(StoreOp::InsertMessage)) })
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_surface_propagates_failure() {
        let outcome = SecondaryWrite::MessageSummary
            .run(async { Err::<(), _>(PersistError::Unavailable(StoreOp::UpdateChat)) })
            .await;
        assert!(matches!(outcome, Err(MarketError::Network(_))));
    }
}
