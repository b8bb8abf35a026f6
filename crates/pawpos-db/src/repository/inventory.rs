//! # Inventory Repository
//!
//! Product stock and the movement history that explains it.
//! `adjust_stock` and `insert_movement` are always called as a pair.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pawpos_core::{InventoryMovement, MovementType, Product};

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price_cents, stock, deleted_at";

/// Adds `delta` (signed) to a product's stock and returns the new stock.
///
/// ## Returns
/// * `Err(DbError::NotFound)` - unknown product
pub async fn adjust_stock(conn: &mut SqliteConnection, product_id: &str, delta: i64) -> DbResult<i64> {
    debug!(product_id = %product_id, delta, "Adjusting stock");

    let stock: Option<i64> =
        sqlx::query_scalar("UPDATE products SET stock = stock + ?1 WHERE id = ?2 RETURNING stock")
            .bind(delta)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    stock.ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Appends a movement row.
pub async fn insert_movement(
    conn: &mut SqliteConnection,
    product_id: &str,
    movement_type: MovementType,
    quantity: i64,
    order_id: Option<&str>,
    reason: &str,
    now: DateTime<Utc>,
) -> DbResult<InventoryMovement> {
    let movement = InventoryMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        movement_type,
        quantity,
        order_id: order_id.map(str::to_string),
        reason: reason.to_string(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO inventory_movements (id, product_id, movement_type, quantity, order_id, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(&movement.order_id)
    .bind(&movement.reason)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(movement)
}

/// Movement history of a product, newest first.
pub async fn movements_for(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<InventoryMovement>> {
    let movements = sqlx::query_as::<_, InventoryMovement>(
        r#"
        SELECT id, product_id, movement_type, quantity, order_id, reason, created_at
        FROM inventory_movements
        WHERE product_id = ?1
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(movements)
}

/// Movements produced for an order, oldest first.
pub async fn movements_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<InventoryMovement>> {
    let movements = sqlx::query_as::<_, InventoryMovement>(
        r#"
        SELECT id, product_id, movement_type, quantity, order_id, reason, created_at
        FROM inventory_movements
        WHERE order_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(movements)
}

/// Gets a product by ID (soft-deleted rows included).
pub async fn get_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}
