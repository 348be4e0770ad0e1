//! In-memory ledger implementation.
//!
//! Stores items and bookings behind a single `RwLock`; the write lock spans
//! every check-then-write sequence, which linearizes all admissions and
//! transitions (coarser than the per-item locking of the Postgres backend,
//! but trivially correct). Suitable for tests and single-process demos;
//! everything is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::availability::AvailabilityReport;
use crate::booking::{Booking, BookingDraft, BookingLine, BookingStatus, TimeWindow};
use crate::errors::{Error, Result};
use crate::item::{Item, NewItem};
use crate::types::{BookingId, ItemId};

use super::Ledger;

#[derive(Default)]
struct State {
    items: HashMap<ItemId, Item>,
    bookings: HashMap<BookingId, Booking>,
}

/// In-memory implementation of the [`Ledger`] trait.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<State>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a catalog item (catalog management stand-in for tests/demos).
    pub fn seed_item(&self, new: NewItem) -> Item {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            name: new.name,
            active: new.active,
            stock_quantity: new.stock_quantity,
            buffer_before_min: new.buffer_before_min,
            buffer_after_min: new.buffer_after_min,
            created_at: now,
            updated_at: now,
        };
        self.state.write().items.insert(item.id, item.clone());
        item
    }
}

/// Stock of known, active items among `demands`. Unknown/inactive items are
/// left out so the calculator fails closed on them.
fn stock_map(state: &State, demands: &[BookingLine]) -> HashMap<ItemId, i32> {
    demands
        .iter()
        .filter_map(|d| state.items.get(&d.item_id))
        .filter(|item| item.active)
        .map(|item| (item.id, item.stock_quantity))
        .collect()
}

/// Sum quantities of stock-consuming bookings whose buffered window overlaps
/// the buffered request window, per demanded item.
fn consumed_map(
    state: &State,
    window: &TimeWindow,
    demands: &[BookingLine],
) -> HashMap<ItemId, i64> {
    let mut consumed: HashMap<ItemId, i64> = HashMap::new();
    for demand in demands {
        let Some(item) = state.items.get(&demand.item_id) else {
            continue;
        };
        let query = item.buffered(window);
        for booking in state.bookings.values() {
            if !booking.status.consumes_stock() {
                continue;
            }
            for line in &booking.lines {
                if line.item_id == item.id && item.buffered(&booking.window).overlaps(&query) {
                    *consumed.entry(item.id).or_default() += i64::from(line.quantity);
                }
            }
        }
    }
    consumed
}

fn evaluate(state: &State, window: &TimeWindow, demands: &[BookingLine]) -> AvailabilityReport {
    let stock = stock_map(state, demands);
    let consumed = consumed_map(state, window, demands);
    AvailabilityReport::evaluate(demands, &stock, &consumed)
}

impl Ledger for InMemoryLedger {
    async fn list_items(&self) -> Result<Vec<Item>> {
        let state = self.state.read();
        let mut items: Vec<Item> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn availability(
        &self,
        window: &TimeWindow,
        demands: &[BookingLine],
    ) -> Result<AvailabilityReport> {
        let state = self.state.read();
        Ok(evaluate(&state, window, demands))
    }

    async fn admit(&self, draft: &BookingDraft) -> Result<Booking> {
        let mut state = self.state.write();

        let report = evaluate(&state, &draft.window, &draft.lines);
        if !report.ok {
            return Err(Error::Capacity {
                shortfalls: report.shortfalls(),
            });
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            window: draft.window,
            status: BookingStatus::Requested,
            customer_name: draft.customer_name.clone(),
            customer_email: draft.customer_email.clone(),
            customer_phone: draft.customer_phone.clone(),
            delivery_type: draft.delivery_type,
            delivery_address: draft.delivery_address.clone(),
            notes: draft.notes.clone(),
            lines: draft.lines.clone(),
            created_at: now,
            updated_at: now,
        };
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.state.read().bookings.get(&id).cloned())
    }

    async fn transition(&self, id: BookingId, to: BookingStatus) -> Result<Booking> {
        let mut state = self.state.write();

        let current = state
            .bookings
            .get(&id)
            .ok_or(Error::BookingNotFound(id))?
            .clone();

        if !current.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: current.status,
                to,
            });
        }

        // Approving turns a pending request into consumed stock, so the
        // invariant must be re-checked here. The booking itself is still
        // REQUESTED and therefore not part of the consumed sum.
        if to == BookingStatus::Approved {
            let report = evaluate(&state, &current.window, &current.lines);
            if !report.ok {
                return Err(Error::Capacity {
                    shortfalls: report.shortfalls(),
                });
            }
        }

        let Some(booking) = state.bookings.get_mut(&id) else {
            return Err(Error::BookingNotFound(id));
        };
        booking.status = to;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}
