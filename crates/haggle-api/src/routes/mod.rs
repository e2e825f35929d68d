pub mod assistant;
pub mod chats;
pub mod events;
pub mod health;
pub mod messages;
pub mod offers;
pub mod pricing;
