//! # Order Repository
//!
//! Orders, their items and their payments.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── next_seq_id() + insert_order() + insert_item() × N             │
//! │                                                                         │
//! │  2. PAY (one or more batches)                                          │
//! │     └── touch() → insert_payment() × N → total_paid()                  │
//! │     └── mark_paid() once Σ payments ≥ final                            │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                  │
//! │     └── touch() → mark_cancelled()                                     │
//! │                                                                         │
//! │  Items and payments are never updated or deleted.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pawpos_core::{
    NewOrderItem, NewPayment, Order, OrderItem, OrderPayment, OrderStatus, PaymentCondition,
};

const ORDER_COLUMNS: &str = "id, seq_id, customer_id, cash_session_id, seller_id, \
     payment_condition, status, total_amount_cents, discount_amount_cents, final_amount_cents, \
     return_reason, created_at, updated_at, paid_at, cancelled_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, service_id, description, quantity, \
     unit_price_cents, discount_cents, total_price_cents, position";

const PAYMENT_COLUMNS: &str = "id, order_id, method, amount_cents, installments, paid_at, notes";

/// Fields of a new order row.
#[derive(Debug, Clone)]
pub struct OrderInsert<'a> {
    pub seq_id: i64,
    pub customer_id: Option<&'a str>,
    pub cash_session_id: &'a str,
    pub seller_id: Option<&'a str>,
    pub payment_condition: PaymentCondition,
    pub total_amount_cents: i64,
    pub discount_amount_cents: i64,
    pub final_amount_cents: i64,
}

// =============================================================================
// Writes
// =============================================================================

/// Next display number. Must run inside the creating transaction.
pub async fn next_seq_id(conn: &mut SqliteConnection) -> DbResult<i64> {
    let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq_id), 0) + 1 FROM orders")
        .fetch_one(&mut *conn)
        .await?;

    Ok(next)
}

/// Inserts an OPEN order.
pub async fn insert_order(
    conn: &mut SqliteConnection,
    fields: &OrderInsert<'_>,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    let order = Order {
        id: Uuid::new_v4().to_string(),
        seq_id: fields.seq_id,
        customer_id: fields.customer_id.map(str::to_string),
        cash_session_id: fields.cash_session_id.to_string(),
        seller_id: fields.seller_id.map(str::to_string),
        payment_condition: fields.payment_condition,
        status: OrderStatus::Open,
        total_amount_cents: fields.total_amount_cents,
        discount_amount_cents: fields.discount_amount_cents,
        final_amount_cents: fields.final_amount_cents,
        return_reason: None,
        created_at: now,
        updated_at: now,
        paid_at: None,
        cancelled_at: None,
    };

    debug!(id = %order.id, seq_id = order.seq_id, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, seq_id, customer_id, cash_session_id, seller_id, payment_condition, status,
            total_amount_cents, discount_amount_cents, final_amount_cents,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&order.id)
    .bind(order.seq_id)
    .bind(&order.customer_id)
    .bind(&order.cash_session_id)
    .bind(&order.seller_id)
    .bind(order.payment_condition)
    .bind(order.status)
    .bind(order.total_amount_cents)
    .bind(order.discount_amount_cents)
    .bind(order.final_amount_cents)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(order)
}

/// Inserts one line item, computing its total.
pub async fn insert_item(
    conn: &mut SqliteConnection,
    order_id: &str,
    position: i64,
    item: &NewOrderItem,
) -> DbResult<OrderItem> {
    let row = OrderItem {
        id: Uuid::new_v4().to_string(),
        order_id: order_id.to_string(),
        product_id: item.product_id.clone(),
        service_id: item.service_id.clone(),
        description: item.description.trim().to_string(),
        quantity: item.quantity,
        unit_price_cents: item.unit_price_cents,
        discount_cents: item.discount_cents,
        total_price_cents: item.net().cents(),
        position,
    };

    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, service_id, description, quantity,
            unit_price_cents, discount_cents, total_price_cents, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&row.id)
    .bind(&row.order_id)
    .bind(&row.product_id)
    .bind(&row.service_id)
    .bind(&row.description)
    .bind(row.quantity)
    .bind(row.unit_price_cents)
    .bind(row.discount_cents)
    .bind(row.total_price_cents)
    .bind(row.position)
    .execute(&mut *conn)
    .await?;

    Ok(row)
}

/// Appends a payment.
pub async fn insert_payment(
    conn: &mut SqliteConnection,
    order_id: &str,
    payment: &NewPayment,
    now: DateTime<Utc>,
) -> DbResult<OrderPayment> {
    let row = OrderPayment {
        id: Uuid::new_v4().to_string(),
        order_id: order_id.to_string(),
        method: payment.method,
        amount_cents: payment.amount_cents,
        installments: payment.installments,
        paid_at: now,
        notes: payment.notes.clone(),
    };

    debug!(
        order_id = %order_id,
        method = %row.method,
        amount_cents = row.amount_cents,
        "Inserting order payment"
    );

    sqlx::query(
        r#"
        INSERT INTO order_payments (id, order_id, method, amount_cents, installments, paid_at, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&row.id)
    .bind(&row.order_id)
    .bind(row.method)
    .bind(row.amount_cents)
    .bind(row.installments)
    .bind(row.paid_at)
    .bind(&row.notes)
    .execute(&mut *conn)
    .await?;

    Ok(row)
}

/// Bumps `updated_at` and returns the order.
///
/// First statement of every payment or cancellation unit: it takes SQLite's
/// write lock, serializing concurrent units on the same order.
pub async fn touch(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<Order> {
    let result = sqlx::query("UPDATE orders SET updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", id));
    }

    require(conn, id).await
}

/// OPEN → PAID.
pub async fn mark_paid(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<()> {
    debug!(id = %id, "Marking order paid");

    sqlx::query("UPDATE orders SET status = ?1, paid_at = ?2, updated_at = ?2 WHERE id = ?3")
        .bind(OrderStatus::Paid)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// OPEN | PAID → CANCELLED.
pub async fn mark_cancelled(
    conn: &mut SqliteConnection,
    id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %id, "Marking order cancelled");

    sqlx::query(
        r#"
        UPDATE orders
        SET status = ?1, return_reason = ?2, cancelled_at = ?3, updated_at = ?3
        WHERE id = ?4
        "#,
    )
    .bind(OrderStatus::Cancelled)
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

/// Gets an order by ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(order)
}

/// Gets an order by ID, failing with `NotFound`.
pub async fn require(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
    get(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))
}

/// Items in request order.
pub async fn items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY position");
    let items = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Payments in the order they were recorded.
pub async fn payments(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderPayment>> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM order_payments WHERE order_id = ?1 ORDER BY paid_at, rowid"
    );
    let payments = sqlx::query_as::<_, OrderPayment>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(payments)
}

/// Σ payment amounts of the order.
pub async fn total_paid(conn: &mut SqliteConnection, order_id: &str) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM order_payments WHERE order_id = ?1",
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Most recent orders first.
pub async fn recent(conn: &mut SqliteConnection, limit: i64) -> DbResult<Vec<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, rowid DESC LIMIT ?1");
    let orders = sqlx::query_as::<_, Order>(&sql)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    Ok(orders)
}
