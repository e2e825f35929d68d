use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use haggle_advisor::{MarketInsights, PriceAnalysis, PriceRange, TrendReport};
use haggle_types::{ItemCategory, ItemCondition, ListingSnapshot};

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SuggestPriceRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub condition: ItemCondition,
    pub category: ItemCategory,
}

#[derive(Debug, Serialize)]
pub struct SuggestPriceResponse {
    #[serde(flatten)]
    pub analysis: PriceAnalysis,
    pub low_confidence: bool,
}

#[derive(Debug, Deserialize)]
pub struct MarketResearchRequest {
    pub category: ItemCategory,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
}

#[derive(Debug, Serialize)]
pub struct MarketResearchResponse {
    #[serde(flatten)]
    pub insights: MarketInsights,
    pub low_confidence: bool,
}

#[derive(Debug, Deserialize)]
pub struct SimilarItemsRequest {
    pub item: String,
    pub category: ItemCategory,
}

#[derive(Debug, Serialize)]
pub struct SimilarItemsResponse {
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendsRequest {
    pub listings: Vec<ListingSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    #[serde(flatten)]
    pub report: TrendReport,
    pub summary: String,
}

/// Suggested listing price; never fails, falls back to category tables
pub async fn suggest_price(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SuggestPriceRequest>,
) -> ApiResult<Json<SuggestPriceResponse>> {
    let analysis = state
        .market
        .advisor()
        .suggest_price(&req.title, &req.description, req.condition, req.category)
        .await;
    Ok(Json(SuggestPriceResponse {
        low_confidence: analysis.is_low_confidence(),
        analysis,
    }))
}

pub async fn market_research(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarketResearchRequest>,
) -> ApiResult<Json<MarketResearchResponse>> {
    let insights = state
        .market
        .advisor()
        .market_research(req.category, req.price_range)
        .await;
    Ok(Json(MarketResearchResponse {
        low_confidence: insights.is_low_confidence(),
        insights,
    }))
}

pub async fn similar_items(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimilarItemsRequest>,
) -> ApiResult<Json<SimilarItemsResponse>> {
    let items = state
        .market
        .advisor()
        .similar_items(&req.item, req.category)
        .await;
    Ok(Json(SimilarItemsResponse { items }))
}

pub async fn optimize_description(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeRequest>,
) -> ApiResult<Json<OptimizeResponse>> {
    let description = state
        .market
        .advisor()
        .optimize_description(&req.description, &req.title, req.category)
        .await;
    Ok(Json(OptimizeResponse { description }))
}

/// Activity and average price per category over the supplied listings
pub async fn trends(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrendsRequest>,
) -> ApiResult<Json<TrendsResponse>> {
    let report = state.market.advisor().trend_report(&req.listings);
    Ok(Json(TrendsResponse {
        summary: report.render(),
        report,
    }))
}
