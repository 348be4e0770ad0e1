//! Booking admission and availability engine for physical rental inventory.
//!
//! Items carry a finite stock and optional setup/teardown buffers; bookings
//! claim quantities of items over half-open time windows and move through a
//! REQUESTED → APPROVED / REJECTED / CANCELLED lifecycle. The engine
//! guarantees that approved demand never exceeds stock for any item at any
//! instant, even under concurrent admissions and approvals.
//!
//! # Example
//! ```ignore
//! use rentflow::{Engine, EngineConfig, InMemoryLedger};
//!
//! let ledger = InMemoryLedger::new();
//! let engine = Engine::new(ledger, EngineConfig::default());
//!
//! let booking = engine.admit(request).await?;
//! engine.update_status(booking.id, BookingStatus::Approved).await?;
//! ```

pub mod api;
pub mod availability;
pub mod booking;
pub mod config;
pub mod engine;
pub mod errors;
pub mod item;
pub mod ledger;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use availability::{AvailabilityReport, AvailabilityRequest, Shortfall};
pub use booking::{Booking, BookingCreate, BookingStatus, TimeWindow};
pub use config::{Args, Config};
pub use engine::{Engine, EngineConfig};
pub use errors::{Error, Result};
pub use item::{Item, NewItem};
pub use ledger::{in_memory::InMemoryLedger, postgres::PostgresLedger, Ledger};
