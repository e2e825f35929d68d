pub mod error;
pub mod memory;
pub mod models;
pub mod store;

#[cfg(feature = "mongodb")]
pub mod dbs;

pub use error::{PersistError, Result};
pub use memory::MemoryStore;
pub use models::{ChatInsert, ChatPatch, LastMessage, OfferPatch, StoreOp};
pub use store::{ChangeFeed, MarketStore};

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoMarketStore;
