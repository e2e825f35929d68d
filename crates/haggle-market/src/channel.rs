use std::sync::Arc;

use futures::StreamExt;
use haggle_persist::{ChatPatch, MarketStore};
use haggle_types::{format_usd, Clock, MarketEvent, Message, MessageKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MarketError, Result};
use crate::events::EventBus;
use crate::policy::SecondaryWrite;
use crate::LiveQuery;

/// Content stored for image messages
pub const IMAGE_MESSAGE_CONTENT: &str = "Sent an image";

/// Sender id used for messages the system writes into a chat
pub const SYSTEM_SENDER_ID: &str = "system";

const PREVIEW_MAX_CHARS: usize = 100;

/// A message about to be sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDraft {
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub kind: MessageKind,
    #[serde(default)]
    pub offer_amount: Option<f64>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl MessageDraft {
    pub fn text(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            content: content.into(),
            kind: MessageKind::Text,
            offer_amount: None,
            image_ref: None,
        }
    }

    pub fn image(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Image,
            image_ref: Some(image_ref.into()),
            ..Self::text(sender_id, sender_name, IMAGE_MESSAGE_CONTENT)
        }
    }

    /// "Made an offer of $X.XX" unless a note is given
    pub fn offer(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        amount: f64,
        note: Option<&str>,
    ) -> Self {
        let content = match note.map(str::trim) {
            Some(note) if !note.is_empty() => note.to_string(),
            _ => format!("Made an offer of {}", format_usd(amount)),
        };
        Self {
            kind: MessageKind::Offer,
            offer_amount: Some(amount),
            ..Self::text(sender_id, sender_name, content)
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::System,
            ..Self::text(SYSTEM_SENDER_ID, "Haggle", content)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sender_id.trim().is_empty() {
            return Err(MarketError::validation("sender id is required"));
        }
        if self.content.trim().is_empty() {
            return Err(MarketError::validation("message content is empty"));
        }
        match self.kind {
            MessageKind::Offer => match self.offer_amount {
                Some(amount) if amount.is_finite() && amount > 0.0 => Ok(()),
                _ => Err(MarketError::validation(
                    "offer messages need a positive, finite amount",
                )),
            },
            MessageKind::Image if self.image_ref.as_deref().map_or(true, str::is_empty) => {
                Err(MarketError::validation("image messages need an image reference"))
            }
            _ => Ok(()),
        }
    }
}

/// Preview line stored on the chat for `message`
pub fn preview_of(message: &Message) -> String {
    let content = message.content.trim();
    if content.chars().count() <= PREVIEW_MAX_CHARS {
        return content.to_string();
    }
    let mut preview: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    preview.push('…');
    preview
}

/// Ordered message stream of one chat plus the writes that feed it
#[derive(Clone)]
pub struct MessageChannel {
    store: Arc<dyn MarketStore>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl MessageChannel {
    pub fn new(store: Arc<dyn MarketStore>, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            events,
            clock,
        }
    }

    /// Write a message, then the chat summary that describes it.
    ///
    /// The summary write is surfaced; the recipient's unread increment is best-effort.
    pub async fn send(&self, chat_id: &str, draft: MessageDraft) -> Result<Message> {
        draft.validate()?;
        let chat = self
            .store
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| MarketError::chat_not_found(chat_id))?;

        let sender_role = chat.role_of(&draft.sender_id);
        if sender_role.is_none() && draft.kind != MessageKind::System {
            return Err(MarketError::validation(format!(
                "{} is not a participant of chat {}",
                draft.sender_id, chat_id
            )));
        }

        let message = Message::new(
            chat_id,
            draft.sender_id,
            draft.sender_name,
            draft.content,
            draft.kind,
            self.clock.now(),
        )
        .with_offer_amount(draft.offer_amount)
        .with_image_ref(draft.image_ref);

        let stored = self.store.insert_message(message).await?;
        let preview = preview_of(&stored);

        let summary = ChatPatch::last_message(preview.clone(), &stored);
        SecondaryWrite::MessageSummary
            .run(self.store.update_chat(chat_id, summary))
            .await?;

        if let Some(role) = sender_role {
            SecondaryWrite::UnreadIncrement
                .run(self.store.increment_unread(chat_id, role.other()))
                .await?;

            self.events.publish(MarketEvent::NewMessage {
                chat_id: chat_id.to_string(),
                message_id: stored.id.clone(),
                sender_id: stored.sender_id.clone(),
                recipient_id: chat.participant_id(role.other()).to_string(),
                preview,
            });
        }

        info!(chat_id, message_id = %stored.id, kind = ?stored.kind, "Message sent");
        Ok(stored)
    }

    pub async fn send_text(
        &self,
        chat_id: &str,
        sender_id: &str,
        sender_name: &str,
        content: &str,
    ) -> Result<Message> {
        self.send(chat_id, MessageDraft::text(sender_id, sender_name, content))
            .await
    }

    pub async fn send_image(
        &self,
        chat_id: &str,
        sender_id: &str,
        sender_name: &str,
        image_ref: &str,
    ) -> Result<Message> {
        self.send(chat_id, MessageDraft::image(sender_id, sender_name, image_ref))
            .await
    }

    pub async fn send_offer_message(
        &self,
        chat_id: &str,
        sender_id: &str,
        sender_name: &str,
        amount: f64,
        note: Option<&str>,
    ) -> Result<Message> {
        self.send(chat_id, MessageDraft::offer(sender_id, sender_name, amount, note))
            .await
    }

    pub async fn send_system(&self, chat_id: &str, content: &str) -> Result<Message> {
        self.send(chat_id, MessageDraft::system(content)).await
    }

    /// Current messages, oldest first
    pub async fn messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let mut messages = self.store.get_messages(chat_id).await?;
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    /// Live message list of a chat, re-sorted by timestamp on every change.
    ///
    /// Drop the stream to unsubscribe.
    pub async fn observe(&self, chat_id: &str) -> Result<LiveQuery<Vec<Message>>> {
        debug!(chat_id, "Observing messages");
        let feed = self.store.subscribe_messages(chat_id).await?;
        Ok(Box::pin(feed.map(|snapshot| {
            snapshot
                .map(|mut messages| {
                    messages.sort_by_key(|m| m.timestamp);
                    messages
                })
                .map_err(MarketError::from)
        })))
    }

    /// Mark every incoming message as read, then zero the reader's unread count.
    ///
    /// Returns how many messages changed; repeating the call returns 0.
    pub async fn mark_read(&self, chat_id: &str, reader_id: &str) -> Result<u64> {
        let chat = self
            .store
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| MarketError::chat_not_found(chat_id))?;
        let role = chat.role_of(reader_id).ok_or_else(|| {
            MarketError::validation(format!(
                "{} is not a participant of chat {}",
                reader_id, chat_id
            ))
        })?;

        let count = self.store.mark_read(chat_id, reader_id).await?;
        self.store.reset_unread(chat_id, role).await?;

        if count > 0 {
            debug!(chat_id, reader_id, count, "Messages marked read");
            self.events.publish(MarketEvent::MessagesRead {
                chat_id: chat_id.to_string(),
                reader_id: reader_id.to_string(),
                count,
            });
        }
        Ok(count)
    }

    /// Advance the recipient's incoming `sent` messages to `delivered`.
    ///
    /// Delivery receipts are telemetry: a failed write is logged and reported as 0.
    pub async fn mark_delivered(&self, chat_id: &str, recipient_id: &str) -> Result<u64> {
        let count = SecondaryWrite::DeliveryReceipt
            .run(self.store.mark_delivered(chat_id, recipient_id))
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Replace the content of a text message. Only its sender may edit it.
    pub async fn edit(
        &self,
        chat_id: &str,
        message_id: &str,
        editor_id: &str,
        content: &str,
    ) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MarketError::validation("message content is empty"));
        }

        let original = self
            .store
            .get_message(chat_id, message_id)
            .await?
            .ok_or_else(|| MarketError::message_not_found(message_id))?;
        if original.sender_id != editor_id {
            return Err(MarketError::validation("only the sender can edit a message"));
        }
        if original.kind != MessageKind::Text {
            return Err(MarketError::invalid_state(format!(
                "{:?} messages cannot be edited",
                original.kind
            )));
        }

        let edited = self
            .store
            .edit_message(chat_id, message_id, content, self.clock.now())
            .await?
            .ok_or_else(|| MarketError::message_not_found(message_id))?;

        let is_latest = self
            .store
            .get_chat(chat_id)
            .await?
            .is_some_and(|chat| chat.last_message_id.as_deref() == Some(message_id));
        if is_latest {
            let patch = ChatPatch::last_message(preview_of(&edited), &edited);
            SecondaryWrite::EditSummary
                .run(self.store.update_chat(chat_id, patch))
                .await?;
        }

        info!(chat_id, message_id, "Message edited");
        Ok(edited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_offer_draft_content() {
        let draft = MessageDraft::offer("b", "Buyer", 80.0, None);
        assert_eq!(draft.content, "Made an offer of $80.00");

        let draft = MessageDraft::offer("b", "Buyer", 80.0, Some("  "));
        assert_eq!(draft.content, "Made an offer of $80.00");

        let draft = MessageDraft::offer("b", "Buyer", 80.0, Some("Cash today?"));
        assert_eq!(draft.content, "Cash today?");
    }

    #[test]
    fn test_draft_validation() {
        assert!(MessageDraft::text("b", "Buyer", "   ").validate().is_err());
        assert!(MessageDraft::offer("b", "Buyer", f64::NAN, None).validate().is_err());
        assert!(MessageDraft::offer("b", "Buyer", -5.0, None).validate().is_err());
        assert!(MessageDraft::image("b", "Buyer", "").validate().is_err());
        assert!(MessageDraft::image("b", "Buyer", "img/1.jpg").validate().is_ok());
    }

    #[test]
    fn test_preview_is_truncated() {
        let long = "x".repeat(150);
        let message = Message::new("c", "s", "S", long, MessageKind::Text, Utc::now());
        let preview = preview_of(&message);
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 1);
        assert!(preview.ends_with('…'));
    }
}
