//! PostgreSQL ledger implementation.
//!
//! Every admission and transition runs inside a transaction. Before reading
//! consumed quantities the transaction takes one advisory lock per
//! referenced item (`pg_advisory_xact_lock`, keys derived from the item id),
//! acquired in sorted order so two transactions touching the same items
//! never deadlock. That serializes contending check-then-write sequences per
//! item while leaving disjoint items fully parallel. Serialization failures
//! and deadlock aborts (40001/40P01) surface as retryable `Conflict` errors
//! via the crate error conversion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::PgConnection;
use tracing::instrument;

use crate::availability::AvailabilityReport;
use crate::booking::{
    Booking, BookingDraft, BookingLine, BookingStatus, DeliveryType, TimeWindow,
};
use crate::errors::{Error, Result};
use crate::item::{Item, NewItem};
use crate::types::{BookingId, ItemId};

use super::Ledger;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL ledger backend over a connection pool.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

/// Booking header row; lines are fetched separately.
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: BookingId,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: BookingStatus,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    delivery_type: DeliveryType,
    delivery_address: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self, lines: Vec<BookingLine>) -> Booking {
        Booking {
            id: self.id,
            window: TimeWindow {
                start_at: self.start_at,
                end_at: self.end_at,
            },
            status: self.status,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            delivery_type: self.delivery_type,
            delivery_address: self.delivery_address,
            notes: self.notes,
            lines,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const BOOKING_COLUMNS: &str = "id, start_at, end_at, status, customer_name, customer_email, \
     customer_phone, delivery_type, delivery_address, notes, created_at, updated_at";

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a catalog item. Catalog editing endpoints are out of scope;
    /// this exists for seeding and integration tests.
    pub async fn insert_item(&self, new: &NewItem) -> Result<Item> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, active, stock_quantity, buffer_before_min, buffer_after_min)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, active, stock_quantity, buffer_before_min, buffer_after_min,
                      created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(new.active)
        .bind(new.stock_quantity)
        .bind(new.buffer_before_min)
        .bind(new.buffer_after_min)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }
}

/// Take per-item advisory locks in sorted order for the rest of the
/// transaction. Keyed by `hashtextextended(item_id::text, 0)`.
async fn lock_items(conn: &mut PgConnection, item_ids: &[ItemId]) -> Result<()> {
    let mut ids = item_ids.to_vec();
    ids.sort();
    ids.dedup();
    for id in ids {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Stock of known, active items among the demanded ids.
async fn stock_map(conn: &mut PgConnection, item_ids: &[ItemId]) -> Result<HashMap<ItemId, i32>> {
    let rows = sqlx::query_as::<_, (ItemId, i32)>(
        "SELECT id, stock_quantity FROM items WHERE id = ANY($1) AND active",
    )
    .bind(item_ids)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Sum quantities of APPROVED bookings per demanded item, where the existing
/// booking's buffer-widened window overlaps the request's buffer-widened
/// window (both sides widened by the item's own buffers; half-open
/// comparison, so touching windows don't collide).
async fn consumed_map(
    conn: &mut PgConnection,
    window: &TimeWindow,
    item_ids: &[ItemId],
) -> Result<HashMap<ItemId, i64>> {
    let rows = sqlx::query_as::<_, (ItemId, i64)>(
        r#"
        SELECT bi.item_id, COALESCE(SUM(bi.quantity), 0)::BIGINT
        FROM booking_items bi
        JOIN bookings b ON b.id = bi.booking_id
        JOIN items i ON i.id = bi.item_id
        WHERE bi.item_id = ANY($1)
          AND b.status = 'APPROVED'
          AND b.start_at - make_interval(mins => i.buffer_before_min)
              < $3 + make_interval(mins => i.buffer_after_min)
          AND $2 - make_interval(mins => i.buffer_before_min)
              < b.end_at + make_interval(mins => i.buffer_after_min)
        GROUP BY bi.item_id
        "#,
    )
    .bind(item_ids)
    .bind(window.start_at)
    .bind(window.end_at)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().collect())
}

async fn evaluate(
    conn: &mut PgConnection,
    window: &TimeWindow,
    demands: &[BookingLine],
) -> Result<AvailabilityReport> {
    let item_ids: Vec<ItemId> = demands.iter().map(|d| d.item_id).collect();
    let stock = stock_map(&mut *conn, &item_ids).await?;
    let consumed = consumed_map(&mut *conn, window, &item_ids).await?;
    Ok(AvailabilityReport::evaluate(demands, &stock, &consumed))
}

async fn fetch_lines(conn: &mut PgConnection, id: BookingId) -> Result<Vec<BookingLine>> {
    let lines = sqlx::query_as::<_, (ItemId, i32)>(
        "SELECT item_id, quantity FROM booking_items WHERE booking_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .map(|(item_id, quantity)| BookingLine { item_id, quantity })
    .collect();
    Ok(lines)
}

impl Ledger for PostgresLedger {
    async fn list_items(&self) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            "SELECT id, name, active, stock_quantity, buffer_before_min, buffer_after_min, \
             created_at, updated_at FROM items ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    #[instrument(skip(self, window, demands), fields(items = demands.len()))]
    async fn availability(
        &self,
        window: &TimeWindow,
        demands: &[BookingLine],
    ) -> Result<AvailabilityReport> {
        let mut conn = self.pool.acquire().await?;
        evaluate(&mut *conn, window, demands).await
    }

    #[instrument(skip(self, draft), fields(items = draft.lines.len()))]
    async fn admit(&self, draft: &BookingDraft) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        lock_items(&mut *tx, &draft.item_ids()).await?;

        let report = evaluate(&mut *tx, &draft.window, &draft.lines).await?;
        if !report.ok {
            // Dropping the transaction rolls it back; nothing was written.
            return Err(Error::Capacity {
                shortfalls: report.shortfalls(),
            });
        }

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (start_at, end_at, status, customer_name, customer_email,
                                  customer_phone, delivery_type, delivery_address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(draft.window.start_at)
        .bind(draft.window.end_at)
        .bind(BookingStatus::Requested)
        .bind(&draft.customer_name)
        .bind(&draft.customer_email)
        .bind(&draft.customer_phone)
        .bind(draft.delivery_type)
        .bind(&draft.delivery_address)
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;

        for line in &draft.lines {
            sqlx::query("INSERT INTO booking_items (booking_id, item_id, quantity) VALUES ($1, $2, $3)")
                .bind(row.id)
                .bind(line.item_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(row.into_booking(draft.lines.clone()))
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let lines = fetch_lines(&mut *conn, row.id).await?;
                Ok(Some(row.into_booking(lines)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(booking_id = %id, to = %to))]
    async fn transition(&self, id: BookingId, to: BookingStatus) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::BookingNotFound(id))?;

        if !row.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: row.status,
                to,
            });
        }

        let lines = fetch_lines(&mut *tx, id).await?;
        let window = TimeWindow {
            start_at: row.start_at,
            end_at: row.end_at,
        };

        // Approval turns a pending request into consumed stock: take the
        // same per-item locks as admission and re-check the invariant. The
        // booking itself is still REQUESTED, so it isn't in the sum.
        if to == BookingStatus::Approved {
            let item_ids: Vec<ItemId> = lines.iter().map(|l| l.item_id).collect();
            lock_items(&mut *tx, &item_ids).await?;
            let report = evaluate(&mut *tx, &window, &lines).await?;
            if !report.ok {
                return Err(Error::Capacity {
                    shortfalls: report.shortfalls(),
                });
            }
        }

        let updated_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 RETURNING updated_at",
        )
        .bind(id)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut booking = row.into_booking(lines);
        booking.status = to;
        booking.updated_at = updated_at;
        Ok(booking)
    }
}
