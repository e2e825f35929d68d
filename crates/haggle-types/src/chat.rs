use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::offer::OfferStatus;

/// Preview shown for a chat before its first message lands
pub const CHAT_STARTED_PREVIEW: &str = "Chat started";

/// Which side of a negotiation a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Buyer,
    Seller,
}

impl ParticipantRole {
    pub fn other(self) -> Self {
        match self {
            ParticipantRole::Buyer => ParticipantRole::Seller,
            ParticipantRole::Seller => ParticipantRole::Buyer,
        }
    }
}

/// Unread counters, one per participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    pub buyer: u32,
    pub seller: u32,
}

impl UnreadCounts {
    pub fn get(&self, role: ParticipantRole) -> u32 {
        match role {
            ParticipantRole::Buyer => self.buyer,
            ParticipantRole::Seller => self.seller,
        }
    }

    pub fn get_mut(&mut self, role: ParticipantRole) -> &mut u32 {
        match role {
            ParticipantRole::Buyer => &mut self.buyer,
            ParticipantRole::Seller => &mut self.seller,
        }
    }
}

/// Dedup key: at most one chat exists per (item, buyer, seller)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatKey {
    pub item_id: String,
    pub buyer_id: String,
    pub seller_id: String,
}

/// Input for opening a conversation about a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChat {
    pub item_id: String,
    pub item_title: String,
    pub item_price: f64,
    pub buyer_id: String,
    pub buyer_name: String,
    pub seller_id: String,
    pub seller_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_image_ref: Option<String>,
}

impl NewChat {
    pub fn key(&self) -> ChatKey {
        ChatKey {
            item_id: self.item_id.clone(),
            buyer_id: self.buyer_id.clone(),
            seller_id: self.seller_id.clone(),
        }
    }
}

/// A single buyer-seller conversation scoped to one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub item_id: String,
    pub item_title: String,
    /// Price of the listing when the chat was opened
    pub item_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_image_ref: Option<String>,
    pub buyer_id: String,
    pub buyer_name: String,
    pub seller_id: String,
    pub seller_name: String,
    pub last_message_preview: String,
    pub last_message_timestamp: DateTime<Utc>,
    pub last_message_sender_id: String,
    /// Id of the message the preview was taken from; `None` until the first message lands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
    /// `seq` of that message, breaks timestamp ties between summaries
    #[serde(default)]
    pub last_message_seq: u64,
    #[serde(default)]
    pub unread: UnreadCounts,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub current_offer_amount: Option<f64>,
    #[serde(default)]
    pub offer_status: Option<OfferStatus>,
}

impl Chat {
    pub fn new(id: impl Into<String>, new_chat: NewChat, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            last_message_sender_id: new_chat.buyer_id.clone(),
            item_id: new_chat.item_id,
            item_title: new_chat.item_title,
            item_price: new_chat.item_price,
            item_image_ref: new_chat.item_image_ref,
            buyer_id: new_chat.buyer_id,
            buyer_name: new_chat.buyer_name,
            seller_id: new_chat.seller_id,
            seller_name: new_chat.seller_name,
            last_message_preview: CHAT_STARTED_PREVIEW.to_string(),
            last_message_timestamp: now,
            last_message_id: None,
            last_message_seq: 0,
            unread: UnreadCounts::default(),
            is_active: true,
            created_at: now,
            current_offer_amount: None,
            offer_status: None,
        }
    }

    pub fn key(&self) -> ChatKey {
        ChatKey {
            item_id: self.item_id.clone(),
            buyer_id: self.buyer_id.clone(),
            seller_id: self.seller_id.clone(),
        }
    }

    pub fn role_of(&self, user_id: &str) -> Option<ParticipantRole> {
        if user_id == self.buyer_id {
            Some(ParticipantRole::Buyer)
        } else if user_id == self.seller_id {
            Some(ParticipantRole::Seller)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.role_of(user_id).is_some()
    }

    /// Unread count as seen by `viewer_id` (zero for outsiders)
    pub fn unread_for(&self, viewer_id: &str) -> u32 {
        self.role_of(viewer_id)
            .map(|role| self.unread.get(role))
            .unwrap_or(0)
    }

    pub fn participant_id(&self, role: ParticipantRole) -> &str {
        match role {
            ParticipantRole::Buyer => &self.buyer_id,
            ParticipantRole::Seller => &self.seller_id,
        }
    }

    pub fn counterpart_id(&self, viewer_id: &str) -> Option<&str> {
        self.role_of(viewer_id)
            .map(|role| self.participant_id(role.other()))
    }

    pub fn counterpart_name(&self, viewer_id: &str) -> Option<&str> {
        match self.role_of(viewer_id)? {
            ParticipantRole::Buyer => Some(&self.seller_name),
            ParticipantRole::Seller => Some(&self.buyer_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Chat {
        Chat::new(
            "chat-1",
            NewChat {
                item_id: "item123".to_string(),
                item_title: "Test Item".to_string(),
                item_price: 50.0,
                buyer_id: "buyer123".to_string(),
                buyer_name: "Jane Doe".to_string(),
                seller_id: "seller123".to_string(),
                seller_name: "John Doe".to_string(),
                item_image_ref: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_chat_initialization() {
        let chat = sample();
        assert_eq!(chat.last_message_preview, "Chat started");
        assert_eq!(chat.last_message_sender_id, "buyer123");
        assert_eq!(chat.unread, UnreadCounts::default());
        assert!(chat.is_active);
        assert!(chat.current_offer_amount.is_none());
    }

    #[test]
    fn test_roles_and_counterparts() {
        let mut chat = sample();
        chat.unread.seller = 3;

        assert_eq!(chat.role_of("buyer123"), Some(ParticipantRole::Buyer));
        assert_eq!(chat.role_of("stranger"), None);
        assert_eq!(chat.counterpart_name("buyer123"), Some("John Doe"));
        assert_eq!(chat.counterpart_id("seller123"), Some("buyer123"));
        assert_eq!(chat.unread_for("seller123"), 3);
        assert_eq!(chat.unread_for("buyer123"), 0);
        assert_eq!(chat.unread_for("stranger"), 0);
    }
}
