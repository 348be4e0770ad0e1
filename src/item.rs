//! Catalog items (the inventory model).
//!
//! Items are mutated by catalog management, which is outside this engine;
//! here they are a read-mostly description of how many physical units exist
//! and which setup/teardown buffers a reservation must respect.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::booking::TimeWindow;
use crate::types::ItemId;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Inactive items are not bookable and report zero stock.
    pub active: bool,
    /// Total physical units owned.
    pub stock_quantity: i32,
    /// Mandatory setup minutes before a reservation, during which the unit
    /// cannot serve another booking.
    pub buffer_before_min: i32,
    /// Mandatory teardown minutes after a reservation.
    pub buffer_after_min: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// The interval during which a reservation of this item actually occupies
    /// a unit: the booked window widened by the item's buffers.
    pub fn buffered(&self, window: &TimeWindow) -> TimeWindow {
        window.widened(self.buffer_before_min, self.buffer_after_min)
    }
}

/// Fields for inserting a catalog item. Used by seeding and tests; catalog
/// editing endpoints live outside this crate.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub active: bool,
    pub stock_quantity: i32,
    pub buffer_before_min: i32,
    pub buffer_after_min: i32,
}

impl NewItem {
    pub fn new(name: impl Into<String>, stock_quantity: i32) -> Self {
        Self {
            name: name.into(),
            active: true,
            stock_quantity,
            buffer_before_min: 0,
            buffer_after_min: 0,
        }
    }

    pub fn with_buffers(mut self, before_min: i32, after_min: i32) -> Self {
        self.buffer_before_min = before_min;
        self.buffer_after_min = after_min;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
