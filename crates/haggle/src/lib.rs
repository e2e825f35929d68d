//! # Haggle
//!
//! Negotiation layer for a peer-to-peer campus marketplace.
//!
//! ## Overview
//!
//! A buyer opens a chat about a listing, both sides exchange messages, the
//! buyer proposes a price, and the seller accepts, declines or counters.
//! Pending offers expire after 24 hours. A pricing advisor suggests listing
//! prices and answers marketplace questions, falling back to rule-based
//! estimates when the model is slow or unavailable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use haggle::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let market = MarketplaceBuilder::new()
//!         .advisor_key(std::env::var("ADVISOR_API_KEY").ok())
//!         .build()
//!         .await?;
//!
//!     let chat_id = market
//!         .registry()
//!         .create_or_get_chat(NewChat {
//!             item_id: "item-42".into(),
//!             item_title: "Calculus Textbook".into(),
//!             item_price: 100.0,
//!             buyer_id: "bea".into(),
//!             buyer_name: "Bea".into(),
//!             seller_id: "sam".into(),
//!             seller_name: "Sam".into(),
//!             item_image_ref: None,
//!         })
//!         .await?;
//!
//!     let offer = market
//!         .ledger()
//!         .create_offer(OfferRequest::new(&chat_id, "item-42", "bea", "sam", 80.0, 100.0))
//!         .await?;
//!     market.ledger().respond(&offer.id, OfferResponse::Counter(90.0)).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`haggle-types`**: Chat, Message, Offer, item enums, events, clock
//! - **`haggle-persist`**: `MarketStore` port, in-memory store, MongoDB adapter
//! - **`haggle-market`**: ChatRegistry, MessageChannel, OfferLedger
//! - **`haggle-advisor`**: PricingAdvisor with deterministic fallbacks
//! - **`haggle-llm`**: Provider-agnostic model client

pub mod builder;
pub mod prelude;

pub use builder::{Marketplace, MarketplaceBuilder};

pub use haggle_types::{
    Chat, ChatKey, Clock, ItemCategory, ItemCondition, ListingSnapshot, ManualClock, MarketEvent,
    Message, MessageKind, MessageStatus, NewChat, Offer, OfferStatus, ParticipantRole,
    SystemClock,
};

pub use haggle_persist::{MarketStore, MemoryStore, PersistError};

#[cfg(feature = "mongodb")]
pub use haggle_persist::MongoMarketStore;

pub use haggle_market::{
    ChatRegistry, EventBus, LedgerConfig, LiveQuery, MarketError, MessageChannel, MessageDraft,
    NotificationSink, OfferLedger, OfferRequest, OfferResponse, SweeperHandle,
};

pub use haggle_advisor::{
    AdvisorConfig, AdvisorTimeouts, ChatContext, MarketInsights, PriceAnalysis, PricingAdvisor,
    TransactionType, TrendReport,
};

pub use haggle_llm::{ChatClient, ProviderConfig};
