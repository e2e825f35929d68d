use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use haggle_types::{Chat, NewChat, ParticipantRole};

use crate::{error::ApiResult, sse, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChatResponse {
    pub chat_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub viewer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemChatQuery {
    pub viewer_id: String,
    pub item_id: String,
}

/// A chat as seen by one participant
#[derive(Debug, Serialize)]
pub struct ChatView {
    #[serde(flatten)]
    pub chat: Chat,
    pub role: Option<ParticipantRole>,
    pub unread: u32,
    pub counterpart_name: Option<String>,
}

impl ChatView {
    fn for_viewer(chat: Chat, viewer_id: &str) -> Self {
        Self {
            role: chat.role_of(viewer_id),
            unread: chat.unread_for(viewer_id),
            counterpart_name: chat.counterpart_name(viewer_id).map(str::to_string),
            chat,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub viewer_id: String,
    pub unread_total: u32,
}

/// Open a chat for (item, buyer, seller), or return the existing one
///
/// Always 201: the chat exists afterwards either way.
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewChat>,
) -> ApiResult<(StatusCode, Json<CreateChatResponse>)> {
    let chat_id = state.market.registry().create_or_get_chat(req).await?;
    Ok((StatusCode::CREATED, Json(CreateChatResponse { chat_id })))
}

/// Active chats of a viewer, most recent first
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult<Json<Vec<ChatView>>> {
    let chats = state.market.registry().chats_for(&query.viewer_id).await?;
    let views = chats
        .into_iter()
        .map(|chat| ChatView::for_viewer(chat, &query.viewer_id))
        .collect();
    Ok(Json(views))
}

pub async fn unread_total(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult<Json<UnreadResponse>> {
    let unread_total = state.market.registry().unread_total(&query.viewer_id).await?;
    Ok(Json(UnreadResponse {
        viewer_id: query.viewer_id,
        unread_total,
    }))
}

/// The viewer's chat about an item, if any
pub async fn chat_for_item(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemChatQuery>,
) -> ApiResult<Json<Option<ChatView>>> {
    let chat = state
        .market
        .registry()
        .chat_for_item(&query.viewer_id, &query.item_id)
        .await?;
    Ok(Json(chat.map(|chat| ChatView::for_viewer(chat, &query.viewer_id))))
}

pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Chat>> {
    let chat = state.market.registry().get(&chat_id).await?;
    Ok(Json(chat))
}

pub async fn archive_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.market.registry().archive(&chat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a chat and its messages; its offers are kept
pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.market.registry().delete(&chat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Live chat list of a viewer
pub async fn stream_chats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let chats = state.market.registry().observe_chats(&query.viewer_id).await?;
    Ok(sse::live_query(chats))
}
