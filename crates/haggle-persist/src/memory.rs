#[cfg(any(test, feature = "test-utils"))]
use std::collections::HashSet;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haggle_types::{Chat, Message, MessageStatus, Offer, OfferStatus, ParticipantRole};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::{PersistError, Result};
use crate::models::{ChatInsert, ChatPatch, OfferPatch, StoreOp};
use crate::store::{ChangeFeed, MarketStore};

const CHANGE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum Change {
    Messages { chat_id: String },
    Chats { buyer_id: String, seller_id: String },
}

impl Change {
    fn for_chat(chat: &Chat) -> Self {
        Change::Chats {
            buyer_id: chat.buyer_id.clone(),
            seller_id: chat.seller_id.clone(),
        }
    }
}

#[derive(Default)]
struct State {
    chats: HashMap<String, Chat>,
    messages: HashMap<String, Vec<Message>>,
    offers: Vec<Offer>,
}

struct Inner {
    state: RwLock<State>,
    changes: broadcast::Sender<Change>,
    #[cfg(any(test, feature = "test-utils"))]
    faults: std::sync::Mutex<HashSet<StoreOp>>,
}

/// In-process store with live change feeds
///
/// All documents sit behind one `RwLock`, which gives every operation the
/// per-document atomicity a hosted store provides. Cloning shares the data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                changes,
                #[cfg(any(test, feature = "test-utils"))]
                faults: std::sync::Mutex::new(HashSet::new()),
            }),
        }
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        #[cfg(any(test, feature = "test-utils"))]
        {
            let faults = self.inner.faults.lock().unwrap_or_else(|p| p.into_inner());
            if faults.contains(&op) {
                return Err(PersistError::Unavailable(op));
            }
        }
        let _ = op;
        Ok(())
    }

    fn publish(&self, change: Change) {
        // No subscribers is fine
        let _ = self.inner.changes.send(change);
    }

    async fn message_snapshot(&self, chat_id: &str) -> Vec<Message> {
        let state = self.inner.state.read().await;
        let mut messages = state.messages.get(chat_id).cloned().unwrap_or_default();
        messages.sort_by_key(|m| m.timestamp);
        messages
    }

    async fn chat_snapshot(&self, participant_id: &str) -> Vec<Chat> {
        let state = self.inner.state.read().await;
        let mut chats: Vec<Chat> = state
            .chats
            .values()
            .filter(|c| c.is_participant(participant_id))
            .cloned()
            .collect();
        chats.sort_by(|a, b| {
            b.last_message_timestamp
                .cmp(&a.last_message_timestamp)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        chats
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryStore {
    /// Make every call of `op` fail with `PersistError::Unavailable` until cleared
    pub fn inject_fault(&self, op: StoreOp) {
        self.inner.faults.lock().unwrap_or_else(|p| p.into_inner()).insert(op);
    }

    pub fn clear_fault(&self, op: StoreOp) {
        self.inner.faults.lock().unwrap_or_else(|p| p.into_inner()).remove(&op);
    }

    pub fn clear_faults(&self) {
        self.inner.faults.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub async fn chat_count(&self) -> usize {
        self.inner.state.read().await.chats.len()
    }

    pub async fn message_count(&self, chat_id: &str) -> usize {
        self.inner
            .state
            .read()
            .await
            .messages
            .get(chat_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Append a message verbatim, skipping timestamp clamping
    pub async fn insert_message_unchecked(&self, message: Message) {
        let chat_id = message.chat_id.clone();
        self.inner
            .state
            .write()
            .await
            .messages
            .entry(chat_id.clone())
            .or_default()
            .push(message);
        self.publish(Change::Messages { chat_id });
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn insert_chat_if_absent(&self, chat: Chat) -> Result<ChatInsert> {
        self.check(StoreOp::InsertChat)?;
        let key = chat.key();
        let mut state = self.inner.state.write().await;

        if let Some(existing) = state.chats.values().find(|c| c.key() == key) {
            return Ok(ChatInsert::Existing(existing.clone()));
        }

        state.chats.insert(chat.id.clone(), chat.clone());
        drop(state);

        debug!(chat_id = %chat.id, "Inserted chat");
        self.publish(Change::for_chat(&chat));
        Ok(ChatInsert::Inserted(chat))
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        self.check(StoreOp::GetChat)?;
        Ok(self.inner.state.read().await.chats.get(chat_id).cloned())
    }

    async fn list_chats_for(&self, participant_id: &str) -> Result<Vec<Chat>> {
        self.check(StoreOp::ListChats)?;
        Ok(self.chat_snapshot(participant_id).await)
    }

    async fn update_chat(&self, chat_id: &str, patch: ChatPatch) -> Result<Option<Chat>> {
        self.check(StoreOp::UpdateChat)?;
        let mut state = self.inner.state.write().await;
        let Some(chat) = state.chats.get_mut(chat_id) else {
            return Ok(None);
        };
        patch.apply(chat);
        let updated = chat.clone();
        drop(state);

        self.publish(Change::for_chat(&updated));
        Ok(Some(updated))
    }

    async fn increment_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()> {
        self.check(StoreOp::IncrementUnread)?;
        let mut state = self.inner.state.write().await;
        let Some(chat) = state.chats.get_mut(chat_id) else {
            debug!(chat_id, "Unread increment on missing chat ignored");
            return Ok(());
        };
        *chat.unread.get_mut(role) += 1;
        let change = Change::for_chat(chat);
        drop(state);

        self.publish(change);
        Ok(())
    }

    async fn reset_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()> {
        self.check(StoreOp::ResetUnread)?;
        let mut state = self.inner.state.write().await;
        let Some(chat) = state.chats.get_mut(chat_id) else {
            return Ok(());
        };
        let counter = chat.unread.get_mut(role);
        if *counter == 0 {
            return Ok(());
        }
        *counter = 0;
        let change = Change::for_chat(chat);
        drop(state);

        self.publish(change);
        Ok(())
    }

    async fn delete_chat_cascade(&self, chat_id: &str) -> Result<bool> {
        self.check(StoreOp::DeleteChat)?;
        let mut state = self.inner.state.write().await;
        let removed_messages = state.messages.remove(chat_id).map(|m| m.len()).unwrap_or(0);
        let Some(chat) = state.chats.remove(chat_id) else {
            return Ok(false);
        };
        drop(state);

        debug!(chat_id, removed_messages, "Deleted chat");
        self.publish(Change::Messages {
            chat_id: chat_id.to_string(),
        });
        self.publish(Change::for_chat(&chat));
        Ok(true)
    }

    async fn insert_message(&self, mut message: Message) -> Result<Message> {
        self.check(StoreOp::InsertMessage)?;
        let chat_id = message.chat_id.clone();
        let mut state = self.inner.state.write().await;
        let messages = state.messages.entry(chat_id.clone()).or_default();

        if let Some(latest) = messages.iter().map(|m| m.timestamp).max() {
            if message.timestamp < latest {
                message.timestamp = latest;
            }
        }
        message.seq = messages.last().map_or(0, |m| m.seq) + 1;
        messages.push(message.clone());
        drop(state);

        self.publish(Change::Messages { chat_id });
        Ok(message)
    }

    async fn get_message(&self, chat_id: &str, message_id: &str) -> Result<Option<Message>> {
        self.check(StoreOp::GetMessages)?;
        let state = self.inner.state.read().await;
        Ok(state
            .messages
            .get(chat_id)
            .and_then(|messages| messages.iter().find(|m| m.id == message_id))
            .cloned())
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.check(StoreOp::GetMessages)?;
        Ok(self.message_snapshot(chat_id).await)
    }

    async fn mark_read(&self, chat_id: &str, reader_id: &str) -> Result<u64> {
        self.check(StoreOp::MarkRead)?;
        let mut state = self.inner.state.write().await;
        let mut changed = 0u64;
        if let Some(messages) = state.messages.get_mut(chat_id) {
            for message in messages.iter_mut().filter(|m| m.sender_id != reader_id) {
                if message.advance_status(MessageStatus::Read) {
                    changed += 1;
                }
            }
        }
        drop(state);

        if changed > 0 {
            self.publish(Change::Messages {
                chat_id: chat_id.to_string(),
            });
        }
        Ok(changed)
    }

    async fn mark_delivered(&self, chat_id: &str, recipient_id: &str) -> Result<u64> {
        self.check(StoreOp::MarkDelivered)?;
        let mut state = self.inner.state.write().await;
        let mut changed = 0u64;
        if let Some(messages) = state.messages.get_mut(chat_id) {
            for message in messages.iter_mut().filter(|m| m.sender_id != recipient_id) {
                if message.advance_status(MessageStatus::Delivered) {
                    changed += 1;
                }
            }
        }
        drop(state);

        if changed > 0 {
            self.publish(Change::Messages {
                chat_id: chat_id.to_string(),
            });
        }
        Ok(changed)
    }

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: &str,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        self.check(StoreOp::EditMessage)?;
        let mut state = self.inner.state.write().await;
        let Some(message) = state
            .messages
            .get_mut(chat_id)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == message_id))
        else {
            return Ok(None);
        };
        message.content = content.to_string();
        message.is_edited = true;
        message.edited_at = Some(edited_at);
        let edited = message.clone();
        drop(state);

        self.publish(Change::Messages {
            chat_id: chat_id.to_string(),
        });
        Ok(Some(edited))
    }

    async fn insert_offer(&self, offer: Offer, superseded_at: DateTime<Utc>) -> Result<Vec<Offer>> {
        self.check(StoreOp::InsertOffer)?;
        let mut state = self.inner.state.write().await;
        let mut superseded = Vec::new();
        for existing in state
            .offers
            .iter_mut()
            .filter(|o| o.chat_id == offer.chat_id && o.status == OfferStatus::Pending)
        {
            OfferPatch::responded(OfferStatus::Countered, superseded_at).apply(existing);
            superseded.push(existing.clone());
        }
        state.offers.push(offer);
        Ok(superseded)
    }

    async fn get_offer(&self, offer_id: &str) -> Result<Option<Offer>> {
        self.check(StoreOp::GetOffer)?;
        let state = self.inner.state.read().await;
        Ok(state.offers.iter().find(|o| o.id == offer_id).cloned())
    }

    async fn update_offer_if(
        &self,
        offer_id: &str,
        expected: OfferStatus,
        patch: OfferPatch,
    ) -> Result<Option<Offer>> {
        self.check(StoreOp::UpdateOffer)?;
        let mut state = self.inner.state.write().await;
        let Some(offer) = state.offers.iter_mut().find(|o| o.id == offer_id) else {
            return Ok(None);
        };
        if offer.status != expected {
            return Ok(None);
        }
        patch.apply(offer);
        Ok(Some(offer.clone()))
    }

    async fn offers_for_chat(&self, chat_id: &str) -> Result<Vec<Offer>> {
        self.check(StoreOp::ListOffers)?;
        let state = self.inner.state.read().await;
        let mut offers: Vec<Offer> = state
            .offers
            .iter()
            .filter(|o| o.chat_id == chat_id)
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.created_at);
        Ok(offers)
    }

    async fn pending_offers(&self) -> Result<Vec<Offer>> {
        self.check(StoreOp::ListOffers)?;
        let state = self.inner.state.read().await;
        Ok(state
            .offers
            .iter()
            .filter(|o| o.status == OfferStatus::Pending)
            .cloned()
            .collect())
    }

    async fn subscribe_messages(&self, chat_id: &str) -> Result<ChangeFeed<Vec<Message>>> {
        self.check(StoreOp::Subscribe)?;
        let mut changes = self.inner.changes.subscribe();
        let store = self.clone();
        let chat_id = chat_id.to_string();

        let feed = async_stream::stream! {
            yield Ok(store.message_snapshot(&chat_id).await);
            loop {
                match changes.recv().await {
                    Ok(Change::Messages { chat_id: changed }) if changed == chat_id => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(chat_id = %chat_id, skipped, "Message feed lagged, resyncing");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        yield Err(PersistError::FeedClosed(chat_id.clone()));
                        break;
                    }
                }
                yield Ok(store.message_snapshot(&chat_id).await);
            }
        };
        Ok(Box::pin(feed))
    }

    async fn subscribe_chats(&self, participant_id: &str) -> Result<ChangeFeed<Vec<Chat>>> {
        self.check(StoreOp::Subscribe)?;
        let mut changes = self.inner.changes.subscribe();
        let store = self.clone();
        let participant_id = participant_id.to_string();

        let feed = async_stream::stream! {
            yield Ok(store.chat_snapshot(&participant_id).await);
            loop {
                match changes.recv().await {
                    Ok(Change::Chats { buyer_id, seller_id })
                        if buyer_id == participant_id || seller_id == participant_id => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(
                            participant_id = %participant_id,
                            skipped,
                            "Chat feed lagged, resyncing"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        yield Err(PersistError::FeedClosed(participant_id.clone()));
                        break;
                    }
                }
                yield Ok(store.chat_snapshot(&participant_id).await);
            }
        };
        Ok(Box::pin(feed))
    }
}
