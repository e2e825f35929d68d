#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use haggle_market::{
    ChatRegistry, EventBus, LedgerConfig, MessageChannel, OfferLedger, OfferRequest,
};
use haggle_persist::{MarketStore, MemoryStore};
use haggle_types::{Clock, ManualClock, MarketEvent, NewChat};
use tokio::sync::broadcast;

pub const BUYER: &str = "buyer-1";
pub const SELLER: &str = "seller-1";
pub const ITEM: &str = "item-1";

/// Services wired to one in-memory store and a hand-driven clock
pub struct Market {
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub events: EventBus,
    pub registry: ChatRegistry,
    pub channel: MessageChannel,
    pub ledger: OfferLedger,
}

pub fn market() -> Market {
    market_with(LedgerConfig::default())
}

pub fn market_with(config: LedgerConfig) -> Market {
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap(),
    ));
    let events = EventBus::with_defaults();

    let shared: Arc<dyn MarketStore> = Arc::new(store.clone());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let channel = MessageChannel::new(shared.clone(), events.clone(), dyn_clock.clone());
    let registry = ChatRegistry::new(
        shared.clone(),
        channel.clone(),
        events.clone(),
        dyn_clock.clone(),
    );
    let ledger = OfferLedger::new(shared, channel.clone(), events.clone(), dyn_clock, config);

    Market {
        store,
        clock,
        events,
        registry,
        channel,
        ledger,
    }
}

pub fn new_chat(item_id: &str) -> NewChat {
    NewChat {
        item_id: item_id.to_string(),
        item_title: "Calculus Textbook".to_string(),
        item_price: 100.0,
        buyer_id: BUYER.to_string(),
        buyer_name: "Bea".to_string(),
        seller_id: SELLER.to_string(),
        seller_name: "Sam".to_string(),
        item_image_ref: None,
    }
}

pub fn offer_request(chat_id: &str, amount: f64) -> OfferRequest {
    OfferRequest::new(chat_id, ITEM, BUYER, SELLER, amount, 100.0)
}

pub fn drain(receiver: &mut broadcast::Receiver<MarketEvent>) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
