use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use haggle_market::MarketError;
use haggle_persist::PersistError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] PersistError),
}

impl From<MarketError> for ApiError {
    fn from(error: MarketError) -> Self {
        match error {
            MarketError::Validation(msg) => ApiError::BadRequest(msg),
            e @ MarketError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            MarketError::InvalidState(msg) => ApiError::Conflict(msg),
            MarketError::Network(e) => ApiError::Store(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Store(ref e) => {
                tracing::error!(error = %e, "Store error");
                (StatusCode::BAD_GATEWAY, "Storage unavailable".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use haggle_persist::StoreOp;

    fn status_of(error: MarketError) -> StatusCode {
        ApiError::from(error).into_response().status()
    }

    #[test]
    fn test_market_errors_map_to_status_codes() {
        assert_eq!(status_of(MarketError::validation("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(MarketError::chat_not_found("c1")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(MarketError::invalid_state("done")), StatusCode::CONFLICT);
        assert_eq!(
            status_of(MarketError::Network(PersistError::Unavailable(StoreOp::GetChat))),
            StatusCode::BAD_GATEWAY
        );
    }
}
