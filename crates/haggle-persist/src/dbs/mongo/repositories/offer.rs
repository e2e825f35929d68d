use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use haggle_types::OfferStatus;
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoOffer;
use crate::error::Result;
use crate::models::OfferPatch;

#[derive(Clone)]
pub struct MongoOfferRepository {
    collection: Collection<MongoOffer>,
}

impl MongoOfferRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("offers");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let by_chat = IndexModel::builder()
            .keys(doc! { "chat_id": 1, "created_at": 1 })
            .build();
        let by_status = IndexModel::builder()
            .keys(doc! { "status": 1, "expires_at": 1 })
            .build();
        self.collection.create_indexes(vec![by_chat, by_status]).await?;
        Ok(())
    }

    /// Close every pending offer on the chat as countered, then insert the new one
    pub async fn insert_superseding(
        &self,
        offer: &MongoOffer,
        superseded_at: DateTime<Utc>,
    ) -> Result<Vec<MongoOffer>> {
        let filter = doc! {
            "chat_id": offer.chat_id.as_str(),
            "status": OfferStatus::Pending.as_str(),
        };
        let pending: Vec<MongoOffer> = self
            .collection
            .find(filter)
            .await?
            .try_collect()
            .await?;

        let mut superseded = Vec::with_capacity(pending.len());
        let patch = OfferPatch::responded(OfferStatus::Countered, superseded_at);
        for previous in pending {
            if let Some(updated) = self
                .update_if(&previous.id, OfferStatus::Pending, &patch)
                .await?
            {
                superseded.push(updated);
            }
        }

        self.collection.insert_one(offer).await?;
        Ok(superseded)
    }

    pub async fn get(&self, offer_id: &str) -> Result<Option<MongoOffer>> {
        Ok(self.collection.find_one(doc! { "_id": offer_id }).await?)
    }

    /// Conditional update on `status == expected`; returns the updated document
    pub async fn update_if(
        &self,
        offer_id: &str,
        expected: OfferStatus,
        patch: &OfferPatch,
    ) -> Result<Option<MongoOffer>> {
        let filter = doc! { "_id": offer_id, "status": expected.as_str() };

        let mut set = Document::new();
        set.insert("status", patch.status.as_str());
        if let Some(amount) = patch.amount {
            set.insert("amount", amount);
        }
        if let Some(at) = patch.responded_at {
            set.insert("responded_at", bson::to_bson(&at)?);
        }

        let updated = self
            .collection
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    pub async fn for_chat(&self, chat_id: &str) -> Result<Vec<MongoOffer>> {
        let offers = self
            .collection
            .find(doc! { "chat_id": chat_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(offers)
    }

    pub async fn pending(&self) -> Result<Vec<MongoOffer>> {
        let offers = self
            .collection
            .find(doc! { "status": OfferStatus::Pending.as_str() })
            .await?
            .try_collect()
            .await?;
        Ok(offers)
    }
}
