//! Negotiation services: chats, their messages, and offers.
//!
//! All three services share one [`MarketStore`](haggle_persist::MarketStore),
//! one [`EventBus`] and one [`Clock`](haggle_types::Clock). The store is the
//! source of truth; services hold no state of their own and are cheap to clone.

pub mod channel;
pub mod error;
pub mod events;
pub mod ledger;
pub mod policy;
pub mod registry;

use std::pin::Pin;

use futures::Stream;

pub use channel::{
    preview_of, MessageChannel, MessageDraft, IMAGE_MESSAGE_CONTENT, SYSTEM_SENDER_ID,
};
pub use error::{MarketError, Result};
pub use events::{spawn_sink, EventBus, NotificationSink};
pub use ledger::{is_expired, LedgerConfig, OfferLedger, OfferRequest, OfferResponse, SweeperHandle};
pub use policy::{SecondaryWrite, WritePolicy};
pub use registry::{seed_message, ChatRegistry};

/// Cold, cancellable live query. Drop it to unsubscribe.
pub type LiveQuery<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;
