use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use haggle_advisor::{ChatContext, TransactionType};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub query: String,
    #[serde(default)]
    pub context: Option<ChatContext>,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct SafetyTipsQuery {
    pub transaction: TransactionType,
}

#[derive(Debug, Serialize)]
pub struct SafetyTipsResponse {
    pub transaction: TransactionType,
    pub tips: Vec<String>,
}

/// Free-form marketplace question
pub async fn reply(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReplyRequest>,
) -> ApiResult<Json<ReplyResponse>> {
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query is empty".to_string()));
    }
    let reply = state.market.advisor().chat_reply(&req.query, req.context).await;
    Ok(Json(ReplyResponse { reply }))
}

pub async fn safety_tips(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SafetyTipsQuery>,
) -> ApiResult<Json<SafetyTipsResponse>> {
    let tips = state.market.advisor().safety_tips(query.transaction);
    Ok(Json(SafetyTipsResponse {
        transaction: query.transaction,
        tips,
    }))
}
