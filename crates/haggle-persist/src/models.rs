use std::fmt;

use chrono::{DateTime, Utc};
use haggle_types::{Chat, Message, Offer, OfferStatus};
use serde::{Deserialize, Serialize};

/// Named store operations, used in errors and for fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    InsertChat,
    GetChat,
    ListChats,
    UpdateChat,
    IncrementUnread,
    ResetUnread,
    DeleteChat,
    InsertMessage,
    GetMessages,
    MarkRead,
    MarkDelivered,
    EditMessage,
    InsertOffer,
    GetOffer,
    UpdateOffer,
    ListOffers,
    Subscribe,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOp::InsertChat => "insert_chat",
            StoreOp::GetChat => "get_chat",
            StoreOp::ListChats => "list_chats",
            StoreOp::UpdateChat => "update_chat",
            StoreOp::IncrementUnread => "increment_unread",
            StoreOp::ResetUnread => "reset_unread",
            StoreOp::DeleteChat => "delete_chat",
            StoreOp::InsertMessage => "insert_message",
            StoreOp::GetMessages => "get_messages",
            StoreOp::MarkRead => "mark_read",
            StoreOp::MarkDelivered => "mark_delivered",
            StoreOp::EditMessage => "edit_message",
            StoreOp::InsertOffer => "insert_offer",
            StoreOp::GetOffer => "get_offer",
            StoreOp::UpdateOffer => "update_offer",
            StoreOp::ListOffers => "list_offers",
            StoreOp::Subscribe => "subscribe",
        };
        f.write_str(name)
    }
}

/// Outcome of an insert keyed on (item, buyer, seller)
#[derive(Debug, Clone)]
pub enum ChatInsert {
    Inserted(Chat),
    Existing(Chat),
}

impl ChatInsert {
    pub fn chat(&self) -> &Chat {
        match self {
            ChatInsert::Inserted(chat) | ChatInsert::Existing(chat) => chat,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, ChatInsert::Inserted(_))
    }
}

/// Summary of the newest message, denormalized onto the chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub message_id: String,
    pub preview: String,
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
    pub sender_id: String,
}

impl LastMessage {
    /// Order of summaries: timestamp first, then insertion position on ties
    fn position(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.seq)
    }
}

/// Partial chat update. `None` leaves a field untouched.
///
/// `last_message` is applied only when its (timestamp, seq) is not older than
/// the stored one, so a late summary write cannot roll the preview back and an
/// older message sharing the newest timestamp cannot take the preview over.
#[derive(Debug, Clone, Default)]
pub struct ChatPatch {
    pub last_message: Option<LastMessage>,
    pub is_active: Option<bool>,
    pub current_offer_amount: Option<f64>,
    pub offer_status: Option<OfferStatus>,
}

impl ChatPatch {
    pub fn last_message(preview: impl Into<String>, message: &Message) -> Self {
        Self {
            last_message: Some(LastMessage {
                message_id: message.id.clone(),
                preview: preview.into(),
                timestamp: message.timestamp,
                seq: message.seq,
                sender_id: message.sender_id.clone(),
            }),
            ..Default::default()
        }
    }

    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Default::default()
        }
    }

    pub fn offer(amount: f64, status: OfferStatus) -> Self {
        Self {
            current_offer_amount: Some(amount),
            offer_status: Some(status),
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, chat: &mut Chat) {
        if let Some(last) = &self.last_message {
            if last.position() >= (chat.last_message_timestamp, chat.last_message_seq) {
                chat.last_message_id = Some(last.message_id.clone());
                chat.last_message_preview = last.preview.clone();
                chat.last_message_timestamp = last.timestamp;
                chat.last_message_seq = last.seq;
                chat.last_message_sender_id = last.sender_id.clone();
            }
        }
        if let Some(active) = self.is_active {
            chat.is_active = active;
        }
        if let Some(amount) = self.current_offer_amount {
            chat.current_offer_amount = Some(amount);
        }
        if let Some(status) = self.offer_status {
            chat.offer_status = Some(status);
        }
    }
}

/// Status transition applied to an offer by a compare-and-set update
#[derive(Debug, Clone)]
pub struct OfferPatch {
    pub status: OfferStatus,
    pub amount: Option<f64>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl OfferPatch {
    pub fn status(status: OfferStatus) -> Self {
        Self {
            status,
            amount: None,
            responded_at: None,
        }
    }

    pub fn responded(status: OfferStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            amount: None,
            responded_at: Some(at),
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub(crate) fn apply(&self, offer: &mut Offer) {
        offer.status = self.status;
        if let Some(amount) = self.amount {
            offer.amount = amount;
        }
        if let Some(at) = self.responded_at {
            offer.responded_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use haggle_types::{MessageKind, NewChat};

    fn chat(now: DateTime<Utc>) -> Chat {
        Chat::new(
            "c1",
            NewChat {
                item_id: "i".into(),
                item_title: "Lamp".into(),
                item_price: 20.0,
                buyer_id: "b".into(),
                buyer_name: "B".into(),
                seller_id: "s".into(),
                seller_name: "S".into(),
                item_image_ref: None,
            },
            now,
        )
    }

    fn message(sender_id: &str, at: DateTime<Utc>, seq: u64) -> Message {
        let mut message = Message::new("c1", sender_id, sender_id, "hi", MessageKind::Text, at);
        message.seq = seq;
        message
    }

    #[test]
    fn test_stale_last_message_is_ignored() {
        let now = Utc::now();
        let mut chat = chat(now);

        let newer = message("s", now + Duration::seconds(5), 2);
        let older = message("b", now + Duration::seconds(1), 1);
        ChatPatch::last_message("newer", &newer).apply(&mut chat);
        ChatPatch::last_message("older", &older).apply(&mut chat);

        assert_eq!(chat.last_message_preview, "newer");
        assert_eq!(chat.last_message_sender_id, "s");
        assert_eq!(chat.last_message_id.as_deref(), Some(newer.id.as_str()));
    }

    #[test]
    fn test_timestamp_tie_keeps_later_insert() {
        let now = Utc::now();
        let mut chat = chat(now);
        let first = message("b", now, 1);
        let second = message("s", now, 2);

        ChatPatch::last_message("second", &second).apply(&mut chat);
        ChatPatch::last_message("first (edited)", &first).apply(&mut chat);
        assert_eq!(chat.last_message_preview, "second");

        ChatPatch::last_message("second (edited)", &second).apply(&mut chat);
        assert_eq!(chat.last_message_preview, "second (edited)");
        assert_eq!(chat.last_message_seq, 2);
    }
}
