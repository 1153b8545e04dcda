use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use coc_protocol::endpoints;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, SharedProcessor};

/// Build the axum router with all gateway endpoints.
pub fn build_router(processor: SharedProcessor) -> Router {
    let body_limit = processor.max_batch_size();
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::BATCHES, post(handler::submit_batches))
        .route("/state/:address", get(handler::get_state))
        .route(endpoints::TRANSACTIONS, get(handler::list_transactions))
        .route(endpoints::BATCH_STATUSES, get(handler::batch_statuses))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(processor)
}
