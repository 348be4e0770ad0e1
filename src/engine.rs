//! Admission engine: validation at the boundary, then the ledger's atomic
//! check-and-commit, with bounded retries for serialization conflicts.
//!
//! The engine owns no state of its own; every decision that must be atomic
//! happens inside a single [`Ledger`] call. Retrying is safe because a
//! conflicted attempt has written nothing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::availability::{AvailabilityReport, AvailabilityRequest};
use crate::booking::{Booking, BookingCreate, BookingStatus};
use crate::errors::{Error, Result};
use crate::item::Item;
use crate::ledger::Ledger;
use crate::types::{abbrev_uuid, BookingId};

/// Tunables for the admission engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times a conflicted ledger operation is retried before the
    /// conflict is surfaced to the caller.
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
        }
    }
}

/// The admission engine, generic over its ledger backend.
pub struct Engine<L: Ledger> {
    ledger: L,
    config: EngineConfig,
}

impl<L: Ledger> Engine<L> {
    pub fn new(ledger: L, config: EngineConfig) -> Self {
        Self { ledger, config }
    }

    /// List the rentable catalog.
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        self.ledger.list_items().await
    }

    /// Advisory availability check. The answer is a snapshot and carries no
    /// reservation; only admission and approval bind.
    pub async fn check_availability(&self, request: AvailabilityRequest) -> Result<AvailabilityReport> {
        let (window, demands) = request.validate()?;
        self.ledger.availability(&window, &demands).await
    }

    /// Admit a booking request. On success the booking is durable in
    /// `REQUESTED` state; on [`Error::Capacity`] nothing was written.
    pub async fn admit(&self, request: BookingCreate) -> Result<Booking> {
        let draft = request.validate()?;
        self.with_retries("admit", || self.ledger.admit(&draft)).await
    }

    /// Fetch a single booking.
    pub async fn get_booking(&self, id: BookingId) -> Result<Booking> {
        self.ledger
            .get_booking(id)
            .await?
            .ok_or(Error::BookingNotFound(id))
    }

    /// Apply a status transition. Approval re-checks capacity inside the
    /// ledger's critical section.
    pub async fn update_status(&self, id: BookingId, to: BookingStatus) -> Result<Booking> {
        let booking = self
            .with_retries("transition", || self.ledger.transition(id, to))
            .await?;
        debug!(booking = abbrev_uuid(&id), status = %to, "booking transitioned");
        Ok(booking)
    }

    async fn with_retries<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(err) if err.is_retryable() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    warn!(op, attempt, %err, "retrying after serialization conflict");
                    // Brief backoff so competing transactions can commit
                    tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                }
                other => return other,
            }
        }
    }
}
