//! # Cash Session Repository
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_open()  ──► OPEN ──► touch() + close() ──► CLOSED               │
//! │        │                                                                │
//! │        └── UNIQUE(status) WHERE status = 'OPEN' rejects a second OPEN  │
//! │                                                                         │
//! │  Sessions are never deleted.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pawpos_core::{CashSession, CashSessionStatus, MethodTotal, PaymentMethod};

const SESSION_COLUMNS: &str = "id, status, opened_by, opening_balance_cents, closed_by, \
     closing_balance_cents, expected_closing_balance_cents, notes, opened_at, closed_at, \
     created_at, updated_at";

/// Inserts a new OPEN session.
///
/// ## Returns
/// * `Err(DbError::UniqueViolation)` - another session is already OPEN
pub async fn insert_open(
    conn: &mut SqliteConnection,
    opened_by: &str,
    opening_balance_cents: i64,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<CashSession> {
    let session = CashSession {
        id: Uuid::new_v4().to_string(),
        status: CashSessionStatus::Open,
        opened_by: opened_by.to_string(),
        opening_balance_cents,
        closed_by: None,
        closing_balance_cents: None,
        expected_closing_balance_cents: None,
        notes: notes.map(str::to_string),
        opened_at: now,
        closed_at: None,
        created_at: now,
        updated_at: now,
    };

    debug!(id = %session.id, opened_by = %opened_by, "Inserting cash session");

    sqlx::query(
        r#"
        INSERT INTO cash_sessions (
            id, status, opened_by, opening_balance_cents, notes,
            opened_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&session.id)
    .bind(session.status)
    .bind(&session.opened_by)
    .bind(session.opening_balance_cents)
    .bind(&session.notes)
    .bind(session.opened_at)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(session)
}

/// Gets a session by ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CashSession>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE id = ?1");
    let session = sqlx::query_as::<_, CashSession>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(session)
}

/// Gets the OPEN session, if any.
pub async fn get_open(conn: &mut SqliteConnection) -> DbResult<Option<CashSession>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE status = 'OPEN'");
    let session = sqlx::query_as::<_, CashSession>(&sql)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(session)
}

/// Bumps `updated_at` and returns the session.
///
/// As the first statement of a transaction this takes SQLite's write lock,
/// so the following reads see a state no other writer can change.
pub async fn touch(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<CashSession> {
    let result = sqlx::query("UPDATE cash_sessions SET updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("CashSession", id));
    }

    get(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("CashSession", id))
}

/// Marks a session CLOSED.
pub async fn close(
    conn: &mut SqliteConnection,
    id: &str,
    closed_by: &str,
    closing_balance_cents: i64,
    expected_closing_balance_cents: i64,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<CashSession> {
    debug!(id = %id, closed_by = %closed_by, "Closing cash session");

    sqlx::query(
        r#"
        UPDATE cash_sessions
        SET status = ?1,
            closed_by = ?2,
            closing_balance_cents = ?3,
            expected_closing_balance_cents = ?4,
            notes = COALESCE(?5, notes),
            closed_at = ?6,
            updated_at = ?6
        WHERE id = ?7
        "#,
    )
    .bind(CashSessionStatus::Closed)
    .bind(closed_by)
    .bind(closing_balance_cents)
    .bind(expected_closing_balance_cents)
    .bind(notes)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    get(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("CashSession", id))
}

/// Σ amounts of one payment method over the session's non-cancelled orders.
pub async fn method_total(
    conn: &mut SqliteConnection,
    session_id: &str,
    method: PaymentMethod,
) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(p.amount_cents), 0)
        FROM order_payments p
        JOIN orders o ON o.id = p.order_id
        WHERE o.cash_session_id = ?1 AND o.status != 'CANCELLED' AND p.method = ?2
        "#,
    )
    .bind(session_id)
    .bind(method)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Payments of the session's non-cancelled orders grouped by method.
pub async fn totals_by_method(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> DbResult<Vec<MethodTotal>> {
    let totals = sqlx::query_as::<_, MethodTotal>(
        r#"
        SELECT p.method AS method,
               COUNT(*) AS payment_count,
               COALESCE(SUM(p.amount_cents), 0) AS amount_cents
        FROM order_payments p
        JOIN orders o ON o.id = p.order_id
        WHERE o.cash_session_id = ?1 AND o.status != 'CANCELLED'
        GROUP BY p.method
        ORDER BY p.method
        "#,
    )
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(totals)
}

/// Order counters for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderCounts {
    pub order_count: i64,
    pub paid_count: i64,
    pub cancelled_count: i64,
    pub gross_sales_cents: i64,
}

/// Counts the session's orders by status and sums non-cancelled finals.
pub async fn order_counts(conn: &mut SqliteConnection, session_id: &str) -> DbResult<OrderCounts> {
    let counts = sqlx::query_as::<_, OrderCounts>(
        r#"
        SELECT COUNT(*) AS order_count,
               COALESCE(SUM(CASE WHEN status = 'PAID' THEN 1 ELSE 0 END), 0) AS paid_count,
               COALESCE(SUM(CASE WHEN status = 'CANCELLED' THEN 1 ELSE 0 END), 0) AS cancelled_count,
               COALESCE(SUM(CASE WHEN status != 'CANCELLED' THEN final_amount_cents ELSE 0 END), 0)
                   AS gross_sales_cents
        FROM orders
        WHERE cash_session_id = ?1
        "#,
    )
    .bind(session_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(counts)
}
