use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use haggle_market::MessageDraft;
use haggle_types::{Message, MessageKind};

use crate::{
    error::{ApiError, ApiResult},
    sse,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub sender_name: String,
    #[serde(default = "default_kind")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub offer_amount: Option<f64>,
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

impl SendMessageRequest {
    fn into_draft(self) -> ApiResult<MessageDraft> {
        let content = self.content.unwrap_or_default();
        match self.kind {
            MessageKind::Text => Ok(MessageDraft::text(self.sender_id, self.sender_name, content)),
            MessageKind::Image => {
                let image_ref = self
                    .image_ref
                    .ok_or_else(|| ApiError::BadRequest("image_ref is required".to_string()))?;
                Ok(MessageDraft::image(self.sender_id, self.sender_name, image_ref))
            }
            MessageKind::Offer => {
                let amount = self
                    .offer_amount
                    .ok_or_else(|| ApiError::BadRequest("offer_amount is required".to_string()))?;
                Ok(MessageDraft::offer(
                    self.sender_id,
                    self.sender_name,
                    amount,
                    Some(content.as_str()),
                ))
            }
            MessageKind::System => Err(ApiError::BadRequest(
                "system messages cannot be sent by clients".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadRequest {
    pub reader_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeliveredRequest {
    pub recipient_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub editor_id: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

/// Messages of a chat in timestamp order
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state.market.channel().messages(&chat_id).await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let draft = req.into_draft()?;
    let message = state.market.channel().send(&chat_id, draft).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Live message list of a chat
pub async fn stream_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let messages = state.market.channel().observe(&chat_id).await?;
    Ok(sse::live_query(messages))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(req): Json<ReadRequest>,
) -> ApiResult<Json<UpdatedResponse>> {
    let updated = state.market.channel().mark_read(&chat_id, &req.reader_id).await?;
    Ok(Json(UpdatedResponse { updated }))
}

pub async fn mark_delivered(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(req): Json<DeliveredRequest>,
) -> ApiResult<Json<UpdatedResponse>> {
    let updated = state
        .market
        .channel()
        .mark_delivered(&chat_id, &req.recipient_id)
        .await?;
    Ok(Json(UpdatedResponse { updated }))
}

pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    Path((chat_id, message_id)): Path<(String, String)>,
    Json(req): Json<EditMessageRequest>,
) -> ApiResult<Json<Message>> {
    let message = state
        .market
        .channel()
        .edit(&chat_id, &message_id, &req.editor_id, &req.content)
        .await?;
    Ok(Json(message))
}
