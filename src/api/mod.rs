//! HTTP layer: axum routes over the admission engine.
//!
//! Every response uses the `{ok, data}` / `{ok, error}` envelope (the error
//! half is produced by [`crate::errors::Error`]'s `IntoResponse`). Handlers
//! do no validation of their own; they deserialize, call the engine, and
//! serialize.

pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::engine::Engine;
use crate::ledger::Ledger;

/// Shared handler state. Cloning is cheap; the engine is behind an `Arc`.
pub struct AppState<L: Ledger> {
    pub engine: Arc<Engine<L>>,
}

// Derived Clone would demand L: Clone, which backends don't need to be.
impl<L: Ledger> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

/// Build the application router.
pub fn router<L: Ledger + 'static>(engine: Arc<Engine<L>>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/items", get(handlers::items::list_items))
        .route(
            "/api/availability",
            post(handlers::availability::check_availability),
        )
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings/{id}", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/{id}",
            patch(handlers::bookings::update_booking_status),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
