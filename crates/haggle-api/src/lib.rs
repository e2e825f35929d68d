pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod sse;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::CorsConfig;
use crate::middleware::logging;
use crate::routes::{assistant, chats, events, health, messages, offers, pricing};
use crate::state::AppState;

/// Build the HTTP router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Chats
        .route("/chats", post(chats::create_chat).get(chats::list_chats))
        .route("/chats/unread", get(chats::unread_total))
        .route("/chats/by-item", get(chats::chat_for_item))
        .route("/chats/stream", get(chats::stream_chats))
        .route("/chats/:chat_id", get(chats::get_chat).delete(chats::delete_chat))
        .route("/chats/:chat_id/archive", post(chats::archive_chat))
        // Messages
        .route(
            "/chats/:chat_id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/chats/:chat_id/messages/stream", get(messages::stream_messages))
        .route("/chats/:chat_id/messages/:message_id", patch(messages::edit_message))
        .route("/chats/:chat_id/read", post(messages::mark_read))
        .route("/chats/:chat_id/delivered", post(messages::mark_delivered))
        // Offers
        .route("/chats/:chat_id/offers", get(offers::list_for_chat))
        .route("/chats/:chat_id/offers/pending", get(offers::pending_for_chat))
        .route("/offers", post(offers::create_offer))
        .route("/offers/sweep", post(offers::sweep))
        .route("/offers/:offer_id", get(offers::get_offer))
        .route("/offers/:offer_id/respond", post(offers::respond))
        // Pricing advisor
        .route("/pricing/suggest", post(pricing::suggest_price))
        .route("/pricing/market-research", post(pricing::market_research))
        .route("/pricing/similar", post(pricing::similar_items))
        .route("/pricing/optimize", post(pricing::optimize_description))
        .route("/pricing/trends", post(pricing::trends))
        .route("/assistant/reply", post(assistant::reply))
        .route("/assistant/safety-tips", get(assistant::safety_tips))
        // Notifications
        .route("/events", get(events::stream_events));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    api_routes
        .layer(axum_middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.enabled {
        let cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<axum::http::HeaderValue> = config
                .origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}
