use haggle_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Store error: {0}")]
    Network(#[from] PersistError),
}

impl MarketError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MarketError::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        MarketError::InvalidState(msg.into())
    }

    pub fn chat_not_found(id: impl Into<String>) -> Self {
        MarketError::NotFound {
            kind: "Chat",
            id: id.into(),
        }
    }

    pub fn message_not_found(id: impl Into<String>) -> Self {
        MarketError::NotFound {
            kind: "Message",
            id: id.into(),
        }
    }

    pub fn offer_not_found(id: impl Into<String>) -> Self {
        MarketError::NotFound {
            kind: "Offer",
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
