//! Backend-generic ledger suite.
//!
//! Every scenario is written against the [`Ledger`] trait and run against
//! the in-memory backend unconditionally. The Postgres variants are
//! `#[ignore]`d and need a `DATABASE_URL`; run them with
//! `cargo test -- --ignored`.

use chrono::{DateTime, TimeZone, Utc};
use rstest::{fixture, rstest};
use uuid::Uuid;

use crate::booking::{BookingDraft, BookingLine, BookingStatus, DeliveryType, TimeWindow};
use crate::errors::Error;
use crate::item::NewItem;
use crate::ledger::{in_memory::InMemoryLedger, Ledger};
use crate::types::ItemId;

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 14, hour, min, 0).unwrap()
}

fn wnd(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
    TimeWindow::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
}

fn draft(window: TimeWindow, item_id: ItemId, quantity: i32) -> BookingDraft {
    BookingDraft {
        window,
        customer_name: "Test Customer".to_string(),
        customer_email: "customer@example.com".to_string(),
        customer_phone: None,
        delivery_type: DeliveryType::Pickup,
        delivery_address: None,
        notes: None,
        lines: vec![BookingLine { item_id, quantity }],
    }
}

#[fixture]
fn in_memory() -> InMemoryLedger {
    InMemoryLedger::new()
}

/// Scenario A (policy): REQUESTED bookings don't consume stock, so two
/// overlapping requests both pass admission; once one is approved, approving
/// the other past capacity fails, as does any further overlapping request.
async fn run_requested_does_not_consume<L: Ledger>(ledger: &L, item: ItemId) {
    // stock 2, no buffers
    let b1 = ledger.admit(&draft(wnd((10, 0), (12, 0)), item, 2)).await.unwrap();
    assert_eq!(b1.status, BookingStatus::Requested);

    // b1 is only REQUESTED, so this overlapping request is also admitted
    let b2 = ledger.admit(&draft(wnd((11, 0), (13, 0)), item, 1)).await.unwrap();

    ledger.transition(b1.id, BookingStatus::Approved).await.unwrap();

    // Approving b2 would put 3 units in [11:00,12:00) against stock 2
    let err = ledger.transition(b2.id, BookingStatus::Approved).await.unwrap_err();
    match err {
        Error::Capacity { shortfalls } => {
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].item_id, item);
            assert_eq!(shortfalls[0].available_qty, 0);
        }
        other => panic!("expected Capacity, got {other:?}"),
    }

    // A third overlapping request now fails at admission (0 of 2 free)
    let err = ledger
        .admit(&draft(wnd((11, 30), (11, 45)), item, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Capacity { .. }));

    // ...but a touching window is free: [12:00,13:00) doesn't overlap [10:00,12:00)
    ledger.admit(&draft(wnd((12, 0), (13, 0)), item, 2)).await.unwrap();
}

/// Scenario B: teardown buffers widen the occupied window on both sides of
/// the comparison.
async fn run_buffers_block_adjacent_windows<L: Ledger>(ledger: &L, item: ItemId) {
    // stock 1, buffer_after_min 60
    let b = ledger.admit(&draft(wnd((9, 0), (10, 0)), item, 1)).await.unwrap();
    ledger.transition(b.id, BookingStatus::Approved).await.unwrap();

    // Falls inside the 60-minute post-buffer
    let err = ledger
        .admit(&draft(wnd((10, 30), (11, 0)), item, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Capacity { .. }));

    // Starts exactly when the buffer ends
    ledger.admit(&draft(wnd((11, 0), (11, 30)), item, 1)).await.unwrap();
}

/// Scenario C: cancelling an APPROVED booking frees its capacity.
async fn run_cancellation_frees_capacity<L: Ledger>(ledger: &L, item: ItemId) {
    // stock 1
    let b1 = ledger.admit(&draft(wnd((10, 0), (12, 0)), item, 1)).await.unwrap();
    ledger.transition(b1.id, BookingStatus::Approved).await.unwrap();

    let retry = draft(wnd((10, 0), (12, 0)), item, 1);
    let err = ledger.admit(&retry).await.unwrap_err();
    assert!(matches!(err, Error::Capacity { .. }));

    ledger.transition(b1.id, BookingStatus::Cancelled).await.unwrap();

    let b2 = ledger.admit(&retry).await.unwrap();
    assert_eq!(b2.status, BookingStatus::Requested);
    ledger.transition(b2.id, BookingStatus::Approved).await.unwrap();
}

/// Lifecycle legality, including idempotent rejection and unknown ids.
async fn run_lifecycle_rules<L: Ledger>(ledger: &L, item: ItemId) {
    let b = ledger.admit(&draft(wnd((10, 0), (12, 0)), item, 1)).await.unwrap();

    let rejected = ledger.transition(b.id, BookingStatus::Rejected).await.unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);

    // Re-rejecting a terminal booking is an error, not a silent success
    let err = ledger.transition(b.id, BookingStatus::Rejected).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: BookingStatus::Rejected,
            to: BookingStatus::Rejected
        }
    ));
    let err = ledger.transition(b.id, BookingStatus::Approved).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));

    // A REQUESTED booking can be cancelled directly, and stays terminal
    let b = ledger.admit(&draft(wnd((15, 0), (16, 0)), item, 1)).await.unwrap();
    let cancelled = ledger.transition(b.id, BookingStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    let err = ledger.transition(b.id, BookingStatus::Approved).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));

    // Approved bookings can only be cancelled
    let b = ledger.admit(&draft(wnd((13, 0), (14, 0)), item, 1)).await.unwrap();
    ledger.transition(b.id, BookingStatus::Approved).await.unwrap();
    let err = ledger.transition(b.id, BookingStatus::Rejected).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
    ledger.transition(b.id, BookingStatus::Cancelled).await.unwrap();

    let missing = Uuid::new_v4();
    let err = ledger.transition(missing, BookingStatus::Approved).await.unwrap_err();
    assert!(matches!(err, Error::BookingNotFound(id) if id == missing));
}

/// Unknown and inactive items fail closed: reported as unavailable, not as
/// an error.
async fn run_unknown_and_inactive_fail_closed<L: Ledger>(ledger: &L, inactive: ItemId) {
    let window = wnd((10, 0), (12, 0));
    for item_id in [Uuid::new_v4(), inactive] {
        let report = ledger
            .availability(&window, &[BookingLine { item_id, quantity: 1 }])
            .await
            .unwrap();
        assert!(!report.ok);
        assert_eq!(report.details[0].available_qty, 0);

        let err = ledger.admit(&draft(window, item_id, 1)).await.unwrap_err();
        assert!(matches!(err, Error::Capacity { .. }));
    }
}

/// A rejected admission writes nothing: the availability snapshot and the
/// ledger contents are unchanged.
async fn run_rejected_admission_writes_nothing<L: Ledger>(ledger: &L, item: ItemId) {
    // stock 1: asking for 2 fails the unary bound
    let err = ledger.admit(&draft(wnd((10, 0), (12, 0)), item, 2)).await.unwrap_err();
    assert!(matches!(err, Error::Capacity { .. }));

    let report = ledger
        .availability(&wnd((10, 0), (12, 0)), &[BookingLine { item_id: item, quantity: 1 }])
        .await
        .unwrap();
    assert!(report.ok);
    assert_eq!(report.details[0].available_qty, 1);
}

// ─── In-memory variants ─────────────────────────────────────────────────────

#[rstest]
#[tokio::test]
async fn requested_does_not_consume_in_memory(in_memory: InMemoryLedger) {
    let item = in_memory.seed_item(NewItem::new("Bounce Castle", 2)).id;
    run_requested_does_not_consume(&in_memory, item).await;
}

#[rstest]
#[tokio::test]
async fn buffers_block_adjacent_windows_in_memory(in_memory: InMemoryLedger) {
    let item = in_memory
        .seed_item(NewItem::new("PA Set", 1).with_buffers(0, 60))
        .id;
    run_buffers_block_adjacent_windows(&in_memory, item).await;
}

#[rstest]
#[tokio::test]
async fn cancellation_frees_capacity_in_memory(in_memory: InMemoryLedger) {
    let item = in_memory.seed_item(NewItem::new("Party Tent", 1)).id;
    run_cancellation_frees_capacity(&in_memory, item).await;
}

#[rstest]
#[tokio::test]
async fn lifecycle_rules_in_memory(in_memory: InMemoryLedger) {
    let item = in_memory.seed_item(NewItem::new("Popcorn Machine", 3)).id;
    run_lifecycle_rules(&in_memory, item).await;
}

#[rstest]
#[tokio::test]
async fn unknown_and_inactive_fail_closed_in_memory(in_memory: InMemoryLedger) {
    let inactive = in_memory.seed_item(NewItem::new("Retired Slide", 5).inactive()).id;
    run_unknown_and_inactive_fail_closed(&in_memory, inactive).await;
}

#[rstest]
#[tokio::test]
async fn rejected_admission_writes_nothing_in_memory(in_memory: InMemoryLedger) {
    let item = in_memory.seed_item(NewItem::new("Candy Floss Machine", 1)).id;
    run_rejected_admission_writes_nothing(&in_memory, item).await;
}

// ─── Postgres variants (need DATABASE_URL; run with --ignored) ─────────────

mod postgres {
    use super::*;
    use crate::ledger::postgres::{PostgresLedger, MIGRATOR};
    use sqlx::postgres::PgPool;

    async fn create_test_ledger() -> PostgresLedger {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        MIGRATOR.run(&pool).await.expect("Failed to run migrations");
        PostgresLedger::new(pool)
    }

    #[tokio::test]
    #[ignore]
    async fn requested_does_not_consume_postgres() {
        let ledger = create_test_ledger().await;
        let item = ledger.insert_item(&NewItem::new("Bounce Castle", 2)).await.unwrap().id;
        run_requested_does_not_consume(&ledger, item).await;
    }

    #[tokio::test]
    #[ignore]
    async fn buffers_block_adjacent_windows_postgres() {
        let ledger = create_test_ledger().await;
        let item = ledger
            .insert_item(&NewItem::new("PA Set", 1).with_buffers(0, 60))
            .await
            .unwrap()
            .id;
        run_buffers_block_adjacent_windows(&ledger, item).await;
    }

    #[tokio::test]
    #[ignore]
    async fn cancellation_frees_capacity_postgres() {
        let ledger = create_test_ledger().await;
        let item = ledger.insert_item(&NewItem::new("Party Tent", 1)).await.unwrap().id;
        run_cancellation_frees_capacity(&ledger, item).await;
    }

    #[tokio::test]
    #[ignore]
    async fn lifecycle_rules_postgres() {
        let ledger = create_test_ledger().await;
        let item = ledger.insert_item(&NewItem::new("Popcorn Machine", 3)).await.unwrap().id;
        run_lifecycle_rules(&ledger, item).await;
    }

    #[tokio::test]
    #[ignore]
    async fn unknown_and_inactive_fail_closed_postgres() {
        let ledger = create_test_ledger().await;
        let inactive = ledger
            .insert_item(&NewItem::new("Retired Slide", 5).inactive())
            .await
            .unwrap()
            .id;
        run_unknown_and_inactive_fail_closed(&ledger, inactive).await;
    }

    #[tokio::test]
    #[ignore]
    async fn rejected_admission_writes_nothing_postgres() {
        let ledger = create_test_ledger().await;
        let item = ledger
            .insert_item(&NewItem::new("Candy Floss Machine", 1))
            .await
            .unwrap()
            .id;
        run_rejected_admission_writes_nothing(&ledger, item).await;
    }

    /// Many tasks race to approve distinct overlapping requests for a single
    /// unit; exactly one approval may win.
    #[tokio::test]
    #[ignore]
    async fn concurrent_approvals_admit_exactly_one_postgres() {
        let ledger = create_test_ledger().await;
        let item = ledger.insert_item(&NewItem::new("Single Unit", 1)).await.unwrap().id;

        let mut ids = Vec::new();
        for _ in 0..8 {
            let b = ledger.admit(&draft(wnd((10, 0), (12, 0)), item, 1)).await.unwrap();
            ids.push(b.id);
        }

        let ledger = std::sync::Arc::new(ledger);
        let mut handles = Vec::new();
        for id in ids {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.transition(id, BookingStatus::Approved).await
            }));
        }

        let mut approved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => approved += 1,
                Err(Error::Capacity { .. }) | Err(Error::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(approved, 1);
    }
}
