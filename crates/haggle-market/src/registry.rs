use std::sync::Arc;

use futures::StreamExt;
use haggle_persist::{ChatInsert, ChatPatch, MarketStore};
use haggle_types::{new_id, Chat, Clock, MarketEvent, NewChat};
use tracing::{debug, info};

use crate::channel::{MessageChannel, MessageDraft};
use crate::error::{MarketError, Result};
use crate::events::EventBus;
use crate::policy::SecondaryWrite;
use crate::LiveQuery;

/// Greeting the buyer sends when a chat is first opened
pub fn seed_message(item_title: &str) -> String {
    format!("Hi! I'm interested in your {}.", item_title)
}

/// Owns chat lifecycle: dedup by (item, buyer, seller), archive, delete, listings
#[derive(Clone)]
pub struct ChatRegistry {
    store: Arc<dyn MarketStore>,
    channel: MessageChannel,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl ChatRegistry {
    pub fn new(
        store: Arc<dyn MarketStore>,
        channel: MessageChannel,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            channel,
            events,
            clock,
        }
    }

    /// Return the chat for this (item, buyer, seller), creating it if needed.
    ///
    /// A new chat gets the buyer's greeting as its first message. The greeting
    /// is best-effort and is never sent again for an existing chat. An archived
    /// chat found here is reactivated.
    pub async fn create_or_get_chat(&self, new_chat: NewChat) -> Result<String> {
        validate_new_chat(&new_chat)?;
        let title = new_chat.item_title.clone();
        let candidate = Chat::new(new_id(), new_chat, self.clock.now());

        match self.store.insert_chat_if_absent(candidate).await? {
            ChatInsert::Existing(chat) => {
                if !chat.is_active {
                    SecondaryWrite::ChatReactivation
                        .run(self.store.update_chat(&chat.id, ChatPatch::active(true)))
                        .await?;
                    info!(chat_id = %chat.id, "Reactivated archived chat");
                }
                debug!(chat_id = %chat.id, "Chat already exists");
                Ok(chat.id)
            }
            ChatInsert::Inserted(chat) => {
                info!(chat_id = %chat.id, item_id = %chat.item_id, "Chat created");
                self.events.publish(MarketEvent::ChatCreated {
                    chat_id: chat.id.clone(),
                    item_id: chat.item_id.clone(),
                    buyer_id: chat.buyer_id.clone(),
                    seller_id: chat.seller_id.clone(),
                });

                let greeting =
                    MessageDraft::text(&chat.buyer_id, &chat.buyer_name, seed_message(&title));
                SecondaryWrite::SeedMessage
                    .run(self.channel.send(&chat.id, greeting))
                    .await?;
                Ok(chat.id)
            }
        }
    }

    pub async fn get(&self, chat_id: &str) -> Result<Chat> {
        self.store
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| MarketError::chat_not_found(chat_id))
    }

    /// Active chats of `viewer_id`, most recent message first
    pub async fn chats_for(&self, viewer_id: &str) -> Result<Vec<Chat>> {
        let chats = self.store.list_chats_for(viewer_id).await?;
        Ok(chats.into_iter().filter(|c| c.is_active).collect())
    }

    /// Live version of [`chats_for`](Self::chats_for). Drop the stream to unsubscribe.
    pub async fn observe_chats(&self, viewer_id: &str) -> Result<LiveQuery<Vec<Chat>>> {
        let feed = self.store.subscribe_chats(viewer_id).await?;
        Ok(Box::pin(feed.map(|snapshot| {
            snapshot
                .map(|chats| chats.into_iter().filter(|c| c.is_active).collect())
                .map_err(MarketError::from)
        })))
    }

    /// The viewer's active chat about `item_id`, if any
    pub async fn chat_for_item(&self, viewer_id: &str, item_id: &str) -> Result<Option<Chat>> {
        Ok(self
            .chats_for(viewer_id)
            .await?
            .into_iter()
            .find(|c| c.item_id == item_id))
    }

    /// Hide a chat from listings. Nothing is deleted.
    pub async fn archive(&self, chat_id: &str) -> Result<()> {
        self.store
            .update_chat(chat_id, ChatPatch::active(false))
            .await?
            .ok_or_else(|| MarketError::chat_not_found(chat_id))?;

        info!(chat_id, "Chat archived");
        self.events.publish(MarketEvent::ChatArchived {
            chat_id: chat_id.to_string(),
        });
        Ok(())
    }

    /// Remove a chat and its messages. Offers referencing it are left in place.
    pub async fn delete(&self, chat_id: &str) -> Result<()> {
        if !self.store.delete_chat_cascade(chat_id).await? {
            return Err(MarketError::chat_not_found(chat_id));
        }

        info!(chat_id, "Chat deleted");
        self.events.publish(MarketEvent::ChatDeleted {
            chat_id: chat_id.to_string(),
        });
        Ok(())
    }

    /// Sum of the viewer's unread counts over active chats
    pub async fn unread_total(&self, viewer_id: &str) -> Result<u32> {
        Ok(self
            .chats_for(viewer_id)
            .await?
            .iter()
            .map(|c| c.unread_for(viewer_id))
            .sum())
    }
}

fn validate_new_chat(new_chat: &NewChat) -> Result<()> {
    for (field, value) in [
        ("item_id", &new_chat.item_id),
        ("buyer_id", &new_chat.buyer_id),
        ("seller_id", &new_chat.seller_id),
    ] {
        if value.trim().is_empty() {
            return Err(MarketError::validation(format!("{} is required", field)));
        }
    }
    if new_chat.buyer_id == new_chat.seller_id {
        return Err(MarketError::validation("buyer and seller must differ"));
    }
    if !new_chat.item_price.is_finite() || new_chat.item_price < 0.0 {
        return Err(MarketError::validation("item price must be a finite, non-negative amount"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_chat() -> NewChat {
        NewChat {
            item_id: "item-1".to_string(),
            item_title: "Desk Lamp".to_string(),
            item_price: 20.0,
            buyer_id: "buyer".to_string(),
            buyer_name: "Bea".to_string(),
            seller_id: "seller".to_string(),
            seller_name: "Sam".to_string(),
            item_image_ref: None,
        }
    }

    #[test]
    fn test_seed_message_text() {
        assert_eq!(seed_message("Desk Lamp"), "Hi! I'm interested in your Desk Lamp.");
    }

    #[test]
    fn test_new_chat_validation() {
        assert!(validate_new_chat(&new_chat()).is_ok());

        let mut same_party = new_chat();
        same_party.seller_id = "buyer".to_string();
        assert!(matches!(
            validate_new_chat(&same_party),
            Err(MarketError::Validation(_))
        ));

        let mut no_item = new_chat();
        no_item.item_id = " ".to_string();
        assert!(validate_new_chat(&no_item).is_err());

        let mut bad_price = new_chat();
        bad_price.item_price = f64::INFINITY;
        assert!(validate_new_chat(&bad_price).is_err());
    }
}
