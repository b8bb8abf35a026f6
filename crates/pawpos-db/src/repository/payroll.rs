//! # Payroll Repository
//!
//! Staff pay adjustments produced at the counter. Payroll assigns
//! `pay_period_id` later; the POS always writes period-less rows.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use pawpos_core::{AdjustmentDirection, AdjustmentKind, StaffPayAdjustment};

/// Appends an adjustment.
pub async fn insert_adjustment(
    conn: &mut SqliteConnection,
    staff_id: &str,
    direction: AdjustmentDirection,
    kind: AdjustmentKind,
    amount_cents: i64,
    order_id: Option<&str>,
    reason: &str,
    now: DateTime<Utc>,
) -> DbResult<StaffPayAdjustment> {
    let adjustment = StaffPayAdjustment {
        id: Uuid::new_v4().to_string(),
        staff_id: staff_id.to_string(),
        pay_period_id: None,
        direction,
        kind,
        amount_cents,
        order_id: order_id.map(str::to_string),
        reason: reason.to_string(),
        created_at: now,
    };

    debug!(
        staff_id = %staff_id,
        direction = ?direction,
        kind = ?kind,
        amount_cents,
        "Inserting pay adjustment"
    );

    sqlx::query(
        r#"
        INSERT INTO staff_pay_adjustments (
            id, staff_id, pay_period_id, direction, kind, amount_cents, order_id, reason, created_at
        ) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&adjustment.id)
    .bind(&adjustment.staff_id)
    .bind(adjustment.direction)
    .bind(adjustment.kind)
    .bind(adjustment.amount_cents)
    .bind(&adjustment.order_id)
    .bind(&adjustment.reason)
    .bind(adjustment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(adjustment)
}

/// Adjustments tied to an order, oldest first.
pub async fn adjustments_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<StaffPayAdjustment>> {
    let adjustments = sqlx::query_as::<_, StaffPayAdjustment>(
        r#"
        SELECT id, staff_id, pay_period_id, direction, kind, amount_cents, order_id, reason, created_at
        FROM staff_pay_adjustments
        WHERE order_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(adjustments)
}
