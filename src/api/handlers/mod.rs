//! Axum route handlers, one module per resource.

pub mod availability;
pub mod bookings;
pub mod items;

use axum::Json;
use serde_json::{json, Value};

use super::models::Envelope;

// GET /api/health - liveness probe
pub async fn health() -> Json<Envelope<Value>> {
    Envelope::ok(json!({ "status": "ok" }))
}
