//! The availability calculator.
//!
//! Pure arithmetic over three inputs: the demands, the stock of each known
//! active item, and the quantities already consumed by overlapping APPROVED
//! bookings. Both ledger backends gather those inputs under their own
//! concurrency discipline and call [`AvailabilityReport::evaluate`], so the
//! policy lives in exactly one place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::{validate_demands, BookingLine, TimeWindow};
use crate::errors::Result;
use crate::types::ItemId;

/// Per-item deficit reported with a capacity rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortfall {
    pub item_id: ItemId,
    pub requested_qty: i32,
    pub available_qty: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAvailability {
    pub item_id: ItemId,
    pub requested_qty: i32,
    /// `stock − consumed`; may be negative if the ledger is already
    /// overcommitted for this window.
    pub available_qty: i64,
}

/// Result of an availability check over one window and a set of demands.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    /// True iff every demand fits in the remaining stock.
    pub ok: bool,
    pub details: Vec<ItemAvailability>,
}

impl AvailabilityReport {
    /// Compute availability for each demand.
    ///
    /// `stock` must contain only items that exist and are active; a demand
    /// for anything else fails closed with stock 0 (reported as unavailable,
    /// never as an error). `consumed` holds the summed quantities of
    /// overlapping stock-consuming bookings per item.
    pub fn evaluate(
        demands: &[BookingLine],
        stock: &HashMap<ItemId, i32>,
        consumed: &HashMap<ItemId, i64>,
    ) -> Self {
        let details: Vec<ItemAvailability> = demands
            .iter()
            .map(|demand| {
                let stock_qty = stock.get(&demand.item_id).copied().unwrap_or(0);
                let consumed_qty = consumed.get(&demand.item_id).copied().unwrap_or(0);
                ItemAvailability {
                    item_id: demand.item_id,
                    requested_qty: demand.quantity,
                    available_qty: i64::from(stock_qty) - consumed_qty,
                }
            })
            .collect();

        let ok = details
            .iter()
            .all(|d| d.available_qty >= i64::from(d.requested_qty));

        Self { ok, details }
    }

    /// The demands that do not fit. Empty iff `ok`.
    pub fn shortfalls(&self) -> Vec<Shortfall> {
        self.details
            .iter()
            .filter(|d| d.available_qty < i64::from(d.requested_qty))
            .map(|d| Shortfall {
                item_id: d.item_id,
                requested_qty: d.requested_qty,
                available_qty: d.available_qty,
            })
            .collect()
    }
}

/// Inbound availability check request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub items: Vec<BookingLine>,
}

impl AvailabilityRequest {
    /// Same window and demand preconditions as admission.
    pub fn validate(self) -> Result<(TimeWindow, Vec<BookingLine>)> {
        let window = TimeWindow::new(self.start_at, self.end_at)?;
        validate_demands(&self.items)?;
        Ok((window, self.items))
    }
}
