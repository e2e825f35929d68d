use serde::{Deserialize, Serialize};

/// Notification events published by the negotiation services
///
/// Consumers (badges, toasts, push delivery) subscribe through the event bus;
/// publishing never blocks or fails the operation that produced the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    ChatCreated {
        chat_id: String,
        item_id: String,
        buyer_id: String,
        seller_id: String,
    },

    NewMessage {
        chat_id: String,
        message_id: String,
        sender_id: String,
        recipient_id: String,
        preview: String,
    },

    MessagesRead {
        chat_id: String,
        reader_id: String,
        count: u64,
    },

    NewOffer {
        chat_id: String,
        offer_id: String,
        amount: f64,
        recipient_id: String,
    },

    OfferAccepted {
        chat_id: String,
        offer_id: String,
        amount: f64,
    },

    OfferDeclined {
        chat_id: String,
        offer_id: String,
    },

    OfferCountered {
        chat_id: String,
        offer_id: String,
        amount: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        counter_offer_id: Option<String>,
    },

    OfferExpired {
        chat_id: String,
        offer_id: String,
    },

    ChatArchived {
        chat_id: String,
    },

    ChatDeleted {
        chat_id: String,
    },
}

impl MarketEvent {
    pub fn chat_id(&self) -> &str {
        match self {
            MarketEvent::ChatCreated { chat_id, .. }
            | MarketEvent::NewMessage { chat_id, .. }
            | MarketEvent::MessagesRead { chat_id, .. }
            | MarketEvent::NewOffer { chat_id, .. }
            | MarketEvent::OfferAccepted { chat_id, .. }
            | MarketEvent::OfferDeclined { chat_id, .. }
            | MarketEvent::OfferCountered { chat_id, .. }
            | MarketEvent::OfferExpired { chat_id, .. }
            | MarketEvent::ChatArchived { chat_id }
            | MarketEvent::ChatDeleted { chat_id } => chat_id,
        }
    }
}
