use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use haggle_types::MessageStatus;
use mongodb::bson::doc;
use mongodb::change_stream::event::ChangeStreamEvent;
use mongodb::change_stream::ChangeStream;
use mongodb::options::{FullDocumentType, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let by_chat = IndexModel::builder()
            .keys(doc! { "chat_id": 1, "timestamp": 1 })
            .build();
        self.collection.create_index(by_chat).await?;
        Ok(())
    }

    /// Newest message timestamp in a chat
    pub async fn latest_timestamp(&self, chat_id: &str) -> Result<Option<DateTime<Utc>>> {
        let latest = self
            .collection
            .find_one(doc! { "chat_id": chat_id })
            .sort(doc! { "timestamp": -1 })
            .await?;
        Ok(latest.map(|m| m.timestamp))
    }

    pub async fn save_message(&self, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).await?;
        Ok(())
    }

    pub async fn get(&self, chat_id: &str, message_id: &str) -> Result<Option<MongoMessage>> {
        let filter = doc! { "_id": message_id, "chat_id": chat_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// Messages of a chat in timestamp order, insertion order on ties
    pub async fn get_messages(&self, chat_id: &str) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "chat_id": chat_id })
            .sort(doc! { "timestamp": 1, "seq": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn mark_read(&self, chat_id: &str, reader_id: &str) -> Result<u64> {
        let filter = doc! {
            "chat_id": chat_id,
            "sender_id": { "$ne": reader_id },
            "status": { "$ne": bson::to_bson(&MessageStatus::Read)? },
        };
        let update = doc! { "$set": { "status": bson::to_bson(&MessageStatus::Read)? } };
        let result = self.collection.update_many(filter, update).await?;
        Ok(result.modified_count)
    }

    pub async fn mark_delivered(&self, chat_id: &str, recipient_id: &str) -> Result<u64> {
        let filter = doc! {
            "chat_id": chat_id,
            "sender_id": { "$ne": recipient_id },
            "status": bson::to_bson(&MessageStatus::Sent)?,
        };
        let update = doc! { "$set": { "status": bson::to_bson(&MessageStatus::Delivered)? } };
        let result = self.collection.update_many(filter, update).await?;
        Ok(result.modified_count)
    }

    pub async fn edit(
        &self,
        chat_id: &str,
        message_id: &str,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Option<MongoMessage>> {
        let filter = doc! { "_id": message_id, "chat_id": chat_id };
        let update = doc! {
            "$set": {
                "content": content,
                "is_edited": true,
                "edited_at": bson::to_bson(&edited_at)?,
            }
        };
        let edited = self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(edited)
    }

    pub async fn delete_for_chat(&self, chat_id: &str) -> Result<u64> {
        let result = self.collection.delete_many(doc! { "chat_id": chat_id }).await?;
        Ok(result.deleted_count)
    }

    pub async fn watch_chat(
        &self,
        chat_id: &str,
    ) -> Result<ChangeStream<ChangeStreamEvent<MongoMessage>>> {
        let pipeline = vec![doc! {
            "$match": {
                "$or": [
                    { "fullDocument.chat_id": chat_id },
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
