use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use haggle_market::{OfferLedger, OfferRequest, OfferResponse};
use haggle_types::{Offer, OfferStatus};

use crate::{error::ApiResult, state::AppState};

/// An offer with its display helpers resolved
#[derive(Debug, Serialize)]
pub struct OfferView {
    #[serde(flatten)]
    pub offer: Offer,
    pub formatted_amount: String,
    pub formatted_original_price: String,
    pub discount_percentage: i64,
    pub time_remaining_secs: i64,
}

impl OfferView {
    fn new(offer: Offer, ledger: &OfferLedger) -> Self {
        Self {
            formatted_amount: offer.formatted_amount(),
            formatted_original_price: offer.formatted_original_price(),
            discount_percentage: offer.discount_percentage(),
            time_remaining_secs: ledger.time_remaining(&offer).num_seconds(),
            offer,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub status: OfferStatus,
    #[serde(default)]
    pub counter_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub expired: Vec<String>,
}

pub async fn create_offer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OfferRequest>,
) -> ApiResult<(StatusCode, Json<OfferView>)> {
    let ledger = state.market.ledger();
    let offer = ledger.create_offer(req).await?;
    Ok((StatusCode::CREATED, Json(OfferView::new(offer, ledger))))
}

pub async fn get_offer(
    State(state): State<Arc<AppState>>,
    Path(offer_id): Path<String>,
) -> ApiResult<Json<OfferView>> {
    let ledger = state.market.ledger();
    let offer = ledger.get(&offer_id).await?;
    Ok(Json(OfferView::new(offer, ledger)))
}

/// Accept, decline or counter a pending offer
///
/// Returns the offer as it stands after the response.
pub async fn respond(
    State(state): State<Arc<AppState>>,
    Path(offer_id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> ApiResult<Json<OfferView>> {
    let response = OfferResponse::from_parts(req.status, req.counter_amount)?;
    let ledger = state.market.ledger();
    let offer = ledger.respond(&offer_id, response).await?;
    Ok(Json(OfferView::new(offer, ledger)))
}

/// Offer history of a chat, oldest first
pub async fn list_for_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Vec<OfferView>>> {
    let ledger = state.market.ledger();
    let offers = ledger.offers_for_chat(&chat_id).await?;
    Ok(Json(
        offers
            .into_iter()
            .map(|offer| OfferView::new(offer, ledger))
            .collect(),
    ))
}

pub async fn pending_for_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Option<OfferView>>> {
    let ledger = state.market.ledger();
    let offer = ledger.pending_for_chat(&chat_id).await?;
    Ok(Json(offer.map(|offer| OfferView::new(offer, ledger))))
}

/// Run one expiry sweep now
pub async fn sweep(State(state): State<Arc<AppState>>) -> ApiResult<Json<SweepResponse>> {
    let expired = state.market.ledger().sweep_expired().await?;
    Ok(Json(SweepResponse {
        expired: expired.into_iter().map(|offer| offer.id).collect(),
    }))
}
