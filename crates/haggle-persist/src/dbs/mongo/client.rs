use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use haggle_types::{Chat, Message, Offer, OfferStatus, ParticipantRole};
use mongodb::Client;
use tracing::{debug, info};

use crate::dbs::mongo::models::{MongoChat, MongoMessage, MongoOffer};
use crate::dbs::mongo::repositories::{
    MongoChatRepository, MongoMessageRepository, MongoOfferRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{ChatInsert, ChatPatch, OfferPatch};
use crate::store::{ChangeFeed, MarketStore};

/// `MarketStore` backed by MongoDB collections `chats`, `messages` and `offers`
///
/// Live feeds use change streams, which need a replica set or sharded cluster.
#[derive(Clone)]
pub struct MongoMarketStore {
    chat_repo: MongoChatRepository,
    message_repo: MongoMessageRepository,
    offer_repo: MongoOfferRepository,
}

impl MongoMarketStore {
    /// Connect to MongoDB and make sure the indexes the store relies on exist
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let store = Self {
            chat_repo: MongoChatRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
            offer_repo: MongoOfferRepository::new(&client, database),
        };

        store.chat_repo.ensure_indexes().await?;
        store.message_repo.ensure_indexes().await?;
        store.offer_repo.ensure_indexes().await?;

        info!(database, "Connected to MongoDB");
        Ok(store)
    }
}

#[async_trait]
impl MarketStore for MongoMarketStore {
    async fn insert_chat_if_absent(&self, chat: Chat) -> Result<ChatInsert> {
        let (stored, inserted) = self.chat_repo.insert_if_absent(chat.into()).await?;
        let chat: Chat = stored.into();
        if inserted {
            Ok(ChatInsert::Inserted(chat))
        } else {
            Ok(ChatInsert::Existing(chat))
        }
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        Ok(self.chat_repo.get(chat_id).await?.map(Chat::from))
    }

    async fn list_chats_for(&self, participant_id: &str) -> Result<Vec<Chat>> {
        let chats = self.chat_repo.list_for(participant_id).await?;
        Ok(chats.into_iter().map(Chat::from).collect())
    }

    async fn update_chat(&self, chat_id: &str, patch: ChatPatch) -> Result<Option<Chat>> {
        Ok(self.chat_repo.update(chat_id, &patch).await?.map(Chat::from))
    }

    async fn increment_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()> {
        self.chat_repo.increment_unread(chat_id, role).await
    }

    async fn reset_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()> {
        self.chat_repo.reset_unread(chat_id, role).await
    }

    async fn delete_chat_cascade(&self, chat_id: &str) -> Result<bool> {
        let removed_messages = self.message_repo.delete_for_chat(chat_id).await?;
        let existed = self.chat_repo.delete(chat_id).await?;
        debug!(chat_id, removed_messages, existed, "Deleted chat");
        Ok(existed)
    }

    async fn insert_message(&self, mut message: Message) -> Result<Message> {
        if let Some(latest) = self.message_repo.latest_timestamp(&message.chat_id).await? {
            if message.timestamp < latest {
                message.timestamp = latest;
            }
        }
        if let Some(seq) = self.chat_repo.next_message_seq(&message.chat_id).await? {
            message.seq = u64::try_from(seq).unwrap_or(0);
        }
        let stored: MongoMessage = message.clone().into();
        self.message_repo.save_message(&stored).await?;
        Ok(message)
    }

    async fn get_message(&self, chat_id: &str, message_id: &str) -> Result<Option<Message>> {
        Ok(self.message_repo.get(chat_id, message_id).await?.map(Message::from))
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let messages = self.message_repo.get_messages(chat_id).await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn mark_read(&self, chat_id: &str, reader_id: &str) -> Result<u64> {
        self.message_repo.mark_read(chat_id, reader_id).await
    }

    async fn mark_delivered(&self, chat_id: &str, recipient_id: &str) -> Result<u64> {
        self.message_repo.mark_delivered(chat_id, recipient_id).await
    }

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: &str,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        let edited = self
            .message_repo
            .edit(chat_id, message_id, content, edited_at)
            .await?;
        Ok(edited.map(Message::from))
    }

    async fn insert_offer(&self, offer: Offer, superseded_at: DateTime<Utc>) -> Result<Vec<Offer>> {
        let stored: MongoOffer = offer.into();
        let superseded = self.offer_repo.insert_superseding(&stored, superseded_at).await?;
        Ok(superseded.into_iter().map(Offer::from).collect())
    }

    async fn get_offer(&self, offer_id: &str) -> Result<Option<Offer>> {
        Ok(self.offer_repo.get(offer_id).await?.map(Offer::from))
    }

    async fn update_offer_if(
        &self,
        offer_id: &str,
        expected: OfferStatus,
        patch: OfferPatch,
    ) -> Result<Option<Offer>> {
        let updated = self.offer_repo.update_if(offer_id, expected, &patch).await?;
        Ok(updated.map(Offer::from))
    }

    async fn offers_for_chat(&self, chat_id: &str) -> Result<Vec<Offer>> {
        let offers = self.offer_repo.for_chat(chat_id).await?;
        Ok(offers.into_iter().map(Offer::from).collect())
    }

    async fn pending_offers(&self) -> Result<Vec<Offer>> {
        let offers = self.offer_repo.pending().await?;
        Ok(offers.into_iter().map(Offer::from).collect())
    }

    async fn subscribe_messages(&self, chat_id: &str) -> Result<ChangeFeed<Vec<Message>>> {
        let mut events = self.message_repo.watch_chat(chat_id).await?;
        let repo = self.message_repo.clone();
        let chat_id = chat_id.to_string();

        let feed = async_stream::stream! {
            let snapshot = |messages: Result<Vec<MongoMessage>>| {
                messages.map(|m| m.into_iter().map(Message::from).collect::<Vec<_>>())
            };
            yield snapshot(repo.get_messages(&chat_id).await);
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    yield Err(PersistError::from(e));
                    break;
                }
                yield snapshot(repo.get_messages(&chat_id).await);
            }
        };
        Ok(Box::pin(feed))
    }

    async fn subscribe_chats(&self, participant_id: &str) -> Result<ChangeFeed<Vec<Chat>>> {
        let mut events = self.chat_repo.watch_for(participant_id).await?;
        let repo = self.chat_repo.clone();
        let participant_id = participant_id.to_string();

        let feed = async_stream::stream! {
            let snapshot = |chats: Result<Vec<MongoChat>>| {
                chats.map(|c| c.into_iter().map(Chat::from).collect::<Vec<_>>())
            };
            yield snapshot(repo.list_for(&participant_id).await);
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    yield Err(PersistError::from(e));
                    break;
                }
                yield snapshot(repo.list_for(&participant_id).await);
            }
        };
        Ok(Box::pin(feed))
    }
}
