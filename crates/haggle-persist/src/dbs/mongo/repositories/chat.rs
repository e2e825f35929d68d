use futures::TryStreamExt;
use haggle_types::ParticipantRole;
use mongodb::bson::{doc, Document};
use mongodb::change_stream::event::ChangeStreamEvent;
use mongodb::change_stream::ChangeStream;
use mongodb::options::{FullDocumentType, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoChat;
use crate::error::Result;
use crate::models::ChatPatch;

fn unread_field(role: ParticipantRole) -> &'static str {
    match role {
        ParticipantRole::Buyer => "unread_buyer",
        ParticipantRole::Seller => "unread_seller",
    }
}

#[derive(Clone)]
pub struct MongoChatRepository {
    collection: Collection<MongoChat>,
}

impl MongoChatRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("chats");
        Self { collection }
    }

    /// Unique (item, buyer, seller) index backing chat dedup, plus the participant list indexes
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_key = IndexModel::builder()
            .keys(doc! { "item_id": 1, "buyer_id": 1, "seller_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_buyer = IndexModel::builder()
            .keys(doc! { "buyer_id": 1, "last_message_timestamp": -1 })
            .build();
        let by_seller = IndexModel::builder()
            .keys(doc! { "seller_id": 1, "last_message_timestamp": -1 })
            .build();

        self.collection
            .create_indexes(vec![unique_key, by_buyer, by_seller])
            .await?;
        Ok(())
    }

    /// Upsert with `$setOnInsert`: the returned flag is true when this call created the chat
    pub async fn insert_if_absent(&self, chat: MongoChat) -> Result<(MongoChat, bool)> {
        let filter = doc! {
            "item_id": chat.item_id.as_str(),
            "buyer_id": chat.buyer_id.as_str(),
            "seller_id": chat.seller_id.as_str(),
        };
        let update = doc! { "$setOnInsert": bson::to_document(&chat)? };

        let before = self
            .collection
            .find_one_and_update(filter, update)
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .await?;

        match before {
            Some(existing) => Ok((existing, false)),
            None => Ok((chat, true)),
        }
    }

    pub async fn get(&self, chat_id: &str) -> Result<Option<MongoChat>> {
        Ok(self.collection.find_one(doc! { "_id": chat_id }).await?)
    }

    pub async fn list_for(&self, participant_id: &str) -> Result<Vec<MongoChat>> {
        let filter = doc! {
            "$or": [ { "buyer_id": participant_id }, { "seller_id": participant_id } ]
        };
        let chats = self
            .collection
            .find(filter)
            .sort(doc! { "last_message_timestamp": -1, "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(chats)
    }

    /// Hand out the next message `seq` for a chat; `None` if the chat is gone
    pub async fn next_message_seq(&self, chat_id: &str) -> Result<Option<i64>> {
        let update = doc! { "$inc": { "message_seq": 1_i64 } };
        let chat = self
            .collection
            .find_one_and_update(doc! { "_id": chat_id }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(chat.map(|c| c.message_seq))
    }

    pub async fn update(&self, chat_id: &str, patch: &ChatPatch) -> Result<Option<MongoChat>> {
        if let Some(last) = &patch.last_message {
            let at = bson::DateTime::from_millis(last.timestamp.timestamp_millis());
            let seq = i64::try_from(last.seq).unwrap_or(i64::MAX);
            // Guarded on (timestamp, seq) so an older summary never overwrites a newer one
            let filter = doc! {
                "_id": chat_id,
                "$or": [
                    { "last_message_timestamp": { "$lt": at } },
                    { "last_message_timestamp": at, "last_message_seq": { "$lte": seq } },
                ],
            };
            let update = doc! {
                "$set": {
                    "last_message_id": last.message_id.as_str(),
                    "last_message_preview": last.preview.as_str(),
                    "last_message_timestamp": at,
                    "last_message_seq": seq,
                    "last_message_sender_id": last.sender_id.as_str(),
                }
            };
            self.collection.update_one(filter, update).await?;
        }

        let mut set = Document::new();
        if let Some(active) = patch.is_active {
            set.insert("is_active", active);
        }
        if let Some(amount) = patch.current_offer_amount {
            set.insert("current_offer_amount", amount);
        }
        if let Some(status) = patch.offer_status {
            set.insert("offer_status", status.as_str());
        }
        if !set.is_empty() {
            self.collection
                .update_one(doc! { "_id": chat_id }, doc! { "$set": set })
                .await?;
        }

        self.get(chat_id).await
    }

    pub async fn increment_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()> {
        let mut inc = Document::new();
        inc.insert(unread_field(role), 1_i64);
        let update = doc! { "$inc": inc };
        self.collection.update_one(doc! { "_id": chat_id }, update).await?;
        Ok(())
    }

    pub async fn reset_unread(&self, chat_id: &str, role: ParticipantRole) -> Result<()> {
        let mut set = Document::new();
        set.insert(unread_field(role), 0_i64);
        let update = doc! { "$set": set };
        self.collection.update_one(doc! { "_id": chat_id }, update).await?;
        Ok(())
    }

    pub async fn delete(&self, chat_id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": chat_id }).await?;
        Ok(result.deleted_count > 0)
    }

    /// Change stream over chats touching `participant_id` (deletes always pass through)
    pub async fn watch_for(
        &self,
        participant_id: &str,
    ) -> Result<ChangeStream<ChangeStreamEvent<MongoChat>>> {
        let pipeline = vec![doc! {
            "$match": {
                "$or": [
                    { "fullDocument.buyer_id": participant_id },
                    { "fullDocument.seller_id": participant_id },
                    { "operationType": "delete" },
                ]
            }
        }];
        let stream = self
            .collection
            .watch()
            .pipeline(pipeline)
            .full_document(FullDocumentType::UpdateLookup)
            .await?;
        Ok(stream)
    }
}
