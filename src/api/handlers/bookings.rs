use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::models::{Envelope, StatusUpdateRequest};
use crate::api::AppState;
use crate::booking::{Booking, BookingCreate};
use crate::errors::Error;
use crate::ledger::Ledger;

// POST /api/bookings - admit a booking request (created as REQUESTED)
pub async fn create_booking<L: Ledger>(
    State(state): State<AppState<L>>,
    Json(request): Json<BookingCreate>,
) -> Result<(StatusCode, Json<Envelope<Booking>>), Error> {
    let booking = state.engine.admit(request).await?;
    Ok((StatusCode::CREATED, Envelope::ok(booking)))
}

// GET /api/bookings/{id} - fetch one booking with its line items
pub async fn get_booking<L: Ledger>(
    State(state): State<AppState<L>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Booking>>, Error> {
    let booking = state.engine.get_booking(id).await?;
    Ok(Envelope::ok(booking))
}

// PATCH /api/bookings/{id} - apply a lifecycle transition
pub async fn update_booking_status<L: Ledger>(
    State(state): State<AppState<L>>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Envelope<Booking>>, Error> {
    let booking = state.engine.update_status(id, request.status).await?;
    Ok(Envelope::ok(booking))
}
