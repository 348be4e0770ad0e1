//! Booking lifecycle states and the legal transitions between them.
//!
//! ```text
//!               ┌──> APPROVED ──> CANCELLED
//! REQUESTED ────┼──> REJECTED
//!               └──> CANCELLED
//! ```
//!
//! REJECTED and CANCELLED are terminal. Only APPROVED bookings consume
//! stock; a REQUESTED booking is a pending request, not a guarantee.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Requested,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }

    /// Whether bookings in this state count against available stock.
    pub fn consumes_stock(self) -> bool {
        matches!(self, BookingStatus::Approved)
    }

    /// The legal transition table. Everything not listed here is rejected.
    pub fn can_transition_to(self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Requested, Approved) | (Requested, Rejected) | (Requested, Cancelled) | (Approved, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Requested => "REQUESTED",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
