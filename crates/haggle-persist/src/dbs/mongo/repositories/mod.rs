pub mod chat;
pub mod message;
pub mod offer;

pub use chat::MongoChatRepository;
pub use message::MongoMessageRepository;
pub use offer::MongoOfferRepository;
