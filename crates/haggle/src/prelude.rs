//! Prelude module for convenient imports
//!
//! ```rust
//! use haggle::prelude::*;
//! ```

pub use crate::{
    Chat, ChatRegistry, ItemCategory, ItemCondition, LedgerConfig, MarketError, MarketEvent,
    Marketplace, MarketplaceBuilder, Message, MessageChannel, MessageKind, NewChat, Offer,
    OfferLedger, OfferRequest, OfferResponse, OfferStatus, PriceAnalysis, PricingAdvisor,
};
