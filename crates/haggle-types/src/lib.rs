pub mod chat;
pub mod clock;
pub mod events;
pub mod item;
pub mod message;
pub mod offer;

pub use chat::{Chat, ChatKey, NewChat, ParticipantRole, UnreadCounts, CHAT_STARTED_PREVIEW};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::MarketEvent;
pub use item::{ItemCategory, ItemCondition, ListingSnapshot, UnknownVariant};
pub use message::{Message, MessageKind, MessageStatus};
pub use offer::{format_usd, Offer, OfferStatus, OFFER_TTL_HOURS};

/// Generate a new document id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
