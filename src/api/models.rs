//! Wire envelope and request bodies for the HTTP surface.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::booking::BookingStatus;

/// Success envelope: `{ "ok": true, "data": ... }`.
///
/// The failure counterpart lives in [`crate::errors::Error`]'s
/// `IntoResponse` impl.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { ok: true, data })
    }
}

/// Body of `PATCH /api/bookings/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}
