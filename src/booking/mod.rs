//! Booking domain types: the durable ledger record, its line items, and the
//! inbound request shape with its validation rules.
//!
//! Validation is explicit precondition checking at the engine boundary (no
//! ambient schema layer): [`BookingCreate::validate`] either yields a
//! [`BookingDraft`] that the ledger can commit, or a `ValidationError` with
//! no side effects.

pub mod status;
pub mod window;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use status::BookingStatus;
pub use window::TimeWindow;

use crate::errors::{Error, Result};
use crate::types::{BookingId, ItemId};

/// How the customer receives the rented items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

/// One line of a booking: a quantity of a single catalog item.
///
/// Created atomically with its parent booking and immutable thereafter;
/// changing a booking's composition means making a new booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingLine {
    pub item_id: ItemId,
    pub quantity: i32,
}

/// A committed ledger entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    #[serde(flatten)]
    pub window: TimeWindow,
    pub status: BookingStatus,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub lines: Vec<BookingLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inbound admission request, exactly as received from the request layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreate {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<BookingLine>,
}

/// A validated admission request, ready for the ledger to commit.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub window: TimeWindow,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<BookingLine>,
}

impl BookingDraft {
    /// Distinct item ids referenced by this draft.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.lines.iter().map(|l| l.item_id).collect()
    }
}

impl BookingCreate {
    /// Check the request shape and produce a draft. Has no side effects.
    pub fn validate(self) -> Result<BookingDraft> {
        let window = TimeWindow::new(self.start_at, self.end_at)?;
        validate_demands(&self.items)?;

        let customer_name = self.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(Error::validation("customerName must not be empty"));
        }
        let customer_email = self.customer_email.trim().to_string();
        if !is_plausible_email(&customer_email) {
            return Err(Error::validation("customerEmail is not a valid address"));
        }

        let delivery_address = self
            .delivery_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        if self.delivery_type == DeliveryType::Delivery && delivery_address.is_none() {
            return Err(Error::validation(
                "deliveryAddress is required for DELIVERY type",
            ));
        }

        Ok(BookingDraft {
            window,
            customer_name,
            customer_email,
            customer_phone: self.customer_phone.filter(|p| !p.trim().is_empty()),
            delivery_type: self.delivery_type,
            delivery_address,
            notes: self.notes,
            lines: self.items,
        })
    }
}

/// Shared demand-list preconditions: non-empty, positive quantities, no
/// duplicate item ids. Used by both admission and availability requests.
pub(crate) fn validate_demands(items: &[BookingLine]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::validation("at least one item is required"));
    }
    for line in items {
        if line.quantity < 1 {
            return Err(Error::validation(format!(
                "quantity for item {} must be at least 1",
                line.item_id
            )));
        }
    }
    let mut ids: Vec<ItemId> = items.iter().map(|l| l.item_id).collect();
    ids.sort();
    ids.dedup();
    if ids.len() != items.len() {
        return Err(Error::validation("duplicate itemId in items"));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
