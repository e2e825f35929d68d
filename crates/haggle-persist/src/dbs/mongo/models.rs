use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use haggle_types::{
    Chat, Message, MessageKind, MessageStatus, Offer, OfferStatus, UnreadCounts,
};
use serde::{Deserialize, Serialize};

/// MongoDB chat document. Timestamps used in sorts are native BSON dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChat {
    #[serde(rename = "_id")]
    pub id: String,
    pub item_id: String,
    pub item_title: String,
    pub item_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_image_ref: Option<String>,
    pub buyer_id: String,
    pub buyer_name: String,
    pub seller_id: String,
    pub seller_name: String,
    pub last_message_preview: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub last_message_timestamp: DateTime<Utc>,
    pub last_message_sender_id: String,
    #[serde(default)]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub last_message_seq: i64,
    /// Counter handing out message `seq` values
    #[serde(default)]
    pub message_seq: i64,
    pub unread_buyer: i64,
    pub unread_seller: i64,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub current_offer_amount: Option<f64>,
    #[serde(default)]
    pub offer_status: Option<OfferStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub status: MessageStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub seq: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_amount: Option<f64>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOffer {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub item_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub proposed_by: String,
    pub amount: f64,
    pub original_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: OfferStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_offer_id: Option<String>,
}

fn counter_from_db(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn seq_to_db(seq: u64) -> i64 {
    i64::try_from(seq).unwrap_or(i64::MAX)
}

fn seq_from_db(seq: i64) -> u64 {
    u64::try_from(seq).unwrap_or(0)
}

// Conversions between domain and MongoDB-specific models

impl From<Chat> for MongoChat {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            item_id: chat.item_id,
            item_title: chat.item_title,
            item_price: chat.item_price,
            item_image_ref: chat.item_image_ref,
            buyer_id: chat.buyer_id,
            buyer_name: chat.buyer_name,
            seller_id: chat.seller_id,
            seller_name: chat.seller_name,
            last_message_preview: chat.last_message_preview,
            last_message_timestamp: chat.last_message_timestamp,
            last_message_sender_id: chat.last_message_sender_id,
            last_message_id: chat.last_message_id,
            last_message_seq: seq_to_db(chat.last_message_seq),
            message_seq: seq_to_db(chat.last_message_seq),
            unread_buyer: i64::from(chat.unread.buyer),
            unread_seller: i64::from(chat.unread.seller),
            is_active: chat.is_active,
            created_at: chat.created_at,
            current_offer_amount: chat.current_offer_amount,
            offer_status: chat.offer_status,
        }
    }
}

impl From<MongoChat> for Chat {
    fn from(chat: MongoChat) -> Self {
        Self {
            id: chat.id,
            item_id: chat.item_id,
            item_title: chat.item_title,
            item_price: chat.item_price,
            item_image_ref: chat.item_image_ref,
            buyer_id: chat.buyer_id,
            buyer_name: chat.buyer_name,
            seller_id: chat.seller_id,
            seller_name: chat.seller_name,
            last_message_preview: chat.last_message_preview,
            last_message_timestamp: chat.last_message_timestamp,
            last_message_sender_id: chat.last_message_sender_id,
            last_message_id: chat.last_message_id,
            last_message_seq: seq_from_db(chat.last_message_seq),
            unread: UnreadCounts {
                buyer: counter_from_db(chat.unread_buyer),
                seller: counter_from_db(chat.unread_seller),
            },
            is_active: chat.is_active,
            created_at: chat.created_at,
            current_offer_amount: chat.current_offer_amount,
            offer_status: chat.offer_status,
        }
    }
}

impl From<Message> for MongoMessage {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            chat_id: msg.chat_id,
            sender_id: msg.sender_id,
            sender_name: msg.sender_name,
            content: msg.content,
            kind: msg.kind,
            status: msg.status,
            timestamp: msg.timestamp,
            seq: seq_to_db(msg.seq),
            image_ref: msg.image_ref,
            offer_amount: msg.offer_amount,
            is_edited: msg.is_edited,
            edited_at: msg.edited_at,
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id,
            chat_id: msg.chat_id,
            sender_id: msg.sender_id,
            sender_name: msg.sender_name,
            content: msg.content,
            kind: msg.kind,
            status: msg.status,
            timestamp: msg.timestamp,
            seq: seq_from_db(msg.seq),
            image_ref: msg.image_ref,
            offer_amount: msg.offer_amount,
            is_edited: msg.is_edited,
            edited_at: msg.edited_at,
        }
    }
}

impl From<Offer> for MongoOffer {
    fn from(offer: Offer) -> Self {
        Self {
            id: offer.id,
            chat_id: offer.chat_id,
            item_id: offer.item_id,
            buyer_id: offer.buyer_id,
            seller_id: offer.seller_id,
            proposed_by: offer.proposed_by,
            amount: offer.amount,
            original_price: offer.original_price,
            message: offer.message,
            status: offer.status,
            created_at: offer.created_at,
            responded_at: offer.responded_at,
            expires_at: offer.expires_at,
            previous_offer_id: offer.previous_offer_id,
        }
    }
}

impl From<MongoOffer> for Offer {
    fn from(offer: MongoOffer) -> Self {
        Self {
            id: offer.id,
            chat_id: offer.chat_id,
            item_id: offer.item_id,
            buyer_id: offer.buyer_id,
            seller_id: offer.seller_id,
            proposed_by: offer.proposed_by,
            amount: offer.amount,
            original_price: offer.original_price,
            message: offer.message,
            status: offer.status,
            created_at: offer.created_at,
            responded_at: offer.responded_at,
            expires_at: offer.expires_at,
            previous_offer_id: offer.previous_offer_id,
        }
    }
}
