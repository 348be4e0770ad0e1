use axum::{extract::State, Json};

use crate::api::models::Envelope;
use crate::api::AppState;
use crate::availability::{AvailabilityReport, AvailabilityRequest};
use crate::errors::Error;
use crate::ledger::Ledger;

// POST /api/availability - advisory availability snapshot (no reservation)
pub async fn check_availability<L: Ledger>(
    State(state): State<AppState<L>>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<Envelope<AvailabilityReport>>, Error> {
    let report = state.engine.check_availability(request).await?;
    Ok(Envelope::ok(report))
}
