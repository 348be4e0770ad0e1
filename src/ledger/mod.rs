//! The booking ledger: durable record of bookings and the only shared
//! mutable resource in the engine.
//!
//! The [`Ledger`] trait provides atomic operations for admission and
//! lifecycle transitions. Callers validate request shape and lifecycle
//! legality is enforced here, inside each backend's critical section, so two
//! concurrent operations contending for the same item's capacity over
//! overlapping windows are linearized relative to each other. Operations on
//! disjoint items may proceed in parallel (backend permitting).

use std::future::Future;

use crate::availability::AvailabilityReport;
use crate::booking::{Booking, BookingDraft, BookingLine, BookingStatus, TimeWindow};
use crate::errors::Result;
use crate::item::Item;
use crate::types::BookingId;

pub mod in_memory;
pub mod postgres;

#[cfg(test)]
mod tests;

/// Storage trait for the booking ledger.
///
/// `admit` and `transition` are atomic: either the whole booking (header +
/// line items) and its status become observable, or nothing does. No
/// consumed-quantity state may be cached across calls; every availability
/// decision reads the ledger.
pub trait Ledger: Send + Sync {
    /// All catalog items, for the read-only listing surface.
    fn list_items(&self) -> impl Future<Output = Result<Vec<Item>>> + Send;

    /// Read-only availability snapshot for a window and a set of demands.
    ///
    /// Counts only stock-consuming (APPROVED) bookings whose buffered window
    /// overlaps the buffered request window. Unknown or inactive items
    /// report zero stock. The snapshot takes no locks; for an authoritative
    /// answer under contention use [`Ledger::admit`].
    fn availability(
        &self,
        window: &TimeWindow,
        demands: &[BookingLine],
    ) -> impl Future<Output = Result<AvailabilityReport>> + Send;

    /// Atomically re-check availability and insert the booking (status
    /// REQUESTED) with its line items as one unit.
    ///
    /// # Errors
    /// - `Capacity` with per-item shortfalls if any demand doesn't fit;
    ///   nothing is written
    /// - `Conflict` if a concurrent operation aborted this one (retryable)
    fn admit(&self, draft: &BookingDraft) -> impl Future<Output = Result<Booking>> + Send;

    /// Fetch one booking with its line items.
    fn get_booking(
        &self,
        id: BookingId,
    ) -> impl Future<Output = Result<Option<Booking>>> + Send;

    /// Atomically apply a lifecycle transition.
    ///
    /// REQUESTED→APPROVED re-runs the availability calculation for the
    /// booking's own window and demands inside the critical section, since
    /// only APPROVED bookings consume stock and admission alone cannot
    /// prevent overcommit at approval time.
    ///
    /// # Errors
    /// - `BookingNotFound` for an unknown id
    /// - `InvalidTransition` for anything outside the legal lifecycle,
    ///   including any transition out of a terminal state
    /// - `Capacity` if approving would overcommit an item
    /// - `Conflict` if a concurrent operation aborted this one (retryable)
    fn transition(
        &self,
        id: BookingId,
        to: BookingStatus,
    ) -> impl Future<Output = Result<Booking>> + Send;
}
