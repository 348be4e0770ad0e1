use axum::{extract::State, Json};

use crate::api::models::Envelope;
use crate::api::AppState;
use crate::errors::Error;
use crate::item::Item;
use crate::ledger::Ledger;

// GET /api/items - list the rentable catalog
pub async fn list_items<L: Ledger>(
    State(state): State<AppState<L>>,
) -> Result<Json<Envelope<Vec<Item>>>, Error> {
    let items = state.engine.list_items().await?;
    Ok(Envelope::ok(items))
}
