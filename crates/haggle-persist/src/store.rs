use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use haggle_types::{Chat, Message, Offer, OfferStatus, ParticipantRole};

use crate::error::Result;
use crate::models::{ChatInsert, ChatPatch, OfferPatch};

/// Live query result: a fresh snapshot on every change. Dropping it unsubscribes.
pub type ChangeFeed<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Document store operations for chats, their messages, and offers
///
/// The store is the single source of truth. Each call is atomic per document;
/// nothing here spans more than one chat, message batch, or offer.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Insert `chat` unless one already exists for its (item, buyer, seller) key
    async fn insert_chat_if_absent(&self, chat: Chat) -> Result<ChatInsert>;

    async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>>;

    /// Every chat (active or archived) where the participant is buyer or seller,
    /// newest `last_message_timestamp` first
    async fn list_chats_for(&self, participant_id: &str) -> Result<Vec<Chat>>;

    /// Returns the updated chat, or `None` if it does not exist
    async fn update_chat(&self, chat_id: &str, patch: ChatPatch) -> Result<Option<Chat>>;

    async fn increment_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()>;

    async fn reset_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()>;

    /// Remove a chat and all of its messages. Returns false if it did not exist.
    async fn delete_chat_cascade(&self, chat_id: &str) -> Result<bool>;

    /// Append a message. Its timestamp is raised to the chat's newest message
    /// timestamp if it would otherwise go backwards, and `seq` is set to the
    /// next insertion position in the chat. The stored copy is returned.
    async fn insert_message(&self, message: Message) -> Result<Message>;

    async fn get_message(&self, chat_id: &str, message_id: &str) -> Result<Option<Message>>;

    /// Messages of a chat ordered by timestamp ascending
    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>>;

    /// Batch: every message not sent by `reader_id` and not yet read becomes read.
    /// Returns how many changed.
    async fn mark_read(&self, chat_id: &str, reader_id: &str) -> Result<u64>;

    /// Batch: every `sent` message not sent by `recipient_id` becomes delivered
    async fn mark_delivered(&self, chat_id: &str, recipient_id: &str) -> Result<u64>;

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: &str,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Option<Message>>;

    /// Insert a pending offer; any other pending offer on the same chat is
    /// closed as countered first. Returns the offers that were superseded.
    async fn insert_offer(&self, offer: Offer, superseded_at: DateTime<Utc>) -> Result<Vec<Offer>>;

    async fn get_offer(&self, offer_id: &str) -> Result<Option<Offer>>;

    /// Compare-and-set: applies `patch` only while the offer is still in
    /// `expected`. `None` means it was missing or had already moved on.
    async fn update_offer_if(
        &self,
        offer_id: &str,
        expected: OfferStatus,
        patch: OfferPatch,
    ) -> Result<Option<Offer>>;

    /// Offers of a chat ordered by creation time ascending
    async fn offers_for_chat(&self, chat_id: &str) -> Result<Vec<Offer>>;

    async fn pending_offers(&self) -> Result<Vec<Offer>>;

    /// Live ordered message list of one chat
    async fn subscribe_messages(&self, chat_id: &str) -> Result<ChangeFeed<Vec<Message>>>;

    /// Live chat list of one participant, same ordering as `list_chats_for`
    async fn subscribe_chats(&self, participant_id: &str) -> Result<ChangeFeed<Vec<Chat>>>;
}
