//! # Inventory Mutator
//!
//! Every stock change is a pair: `products.stock` moves and one
//! `inventory_movements` row explains it. Neither is ever written alone.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use pawpos_core::{CoreError, InventoryMovement, MovementType, ValidationError};
use pawpos_db::repository::inventory as inventory_repo;

use crate::error::EngineResult;
use crate::PosEngine;

fn positive_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

async fn apply(
    conn: &mut SqliteConnection,
    product_id: &str,
    movement_type: MovementType,
    signed_quantity: i64,
    order_id: Option<&str>,
    reason: &str,
    now: DateTime<Utc>,
) -> EngineResult<InventoryMovement> {
    let stock = inventory_repo::adjust_stock(conn, product_id, signed_quantity).await?;
    let movement = inventory_repo::insert_movement(
        conn,
        product_id,
        movement_type,
        signed_quantity,
        order_id,
        reason,
        now,
    )
    .await?;

    debug!(
        product_id = %product_id,
        movement_type = ?movement_type,
        quantity = signed_quantity,
        stock,
        "Stock moved"
    );

    Ok(movement)
}

/// Takes `quantity` units out of stock with a SALE movement.
pub async fn decrement(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    order_id: Option<&str>,
    reason: &str,
    now: DateTime<Utc>,
) -> EngineResult<InventoryMovement> {
    positive_quantity(quantity)?;
    apply(conn, product_id, MovementType::Sale, -quantity, order_id, reason, now).await
}

/// Puts `quantity` units back with a RETURN movement.
pub async fn increment(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    order_id: Option<&str>,
    reason: &str,
    now: DateTime<Utc>,
) -> EngineResult<InventoryMovement> {
    positive_quantity(quantity)?;
    apply(conn, product_id, MovementType::Return, quantity, order_id, reason, now).await
}

impl PosEngine {
    /// Standalone stock decrement in its own transaction.
    pub async fn decrement_stock(
        &self,
        product_id: &str,
        quantity: i64,
        order_id: Option<&str>,
        reason: &str,
    ) -> EngineResult<InventoryMovement> {
        let mut tx = self.begin().await?;
        let movement = decrement(&mut tx, product_id, quantity, order_id, reason, Utc::now()).await?;
        tx.commit().await?;
        Ok(movement)
    }

    /// Standalone stock increment in its own transaction.
    pub async fn increment_stock(
        &self,
        product_id: &str,
        quantity: i64,
        order_id: Option<&str>,
        reason: &str,
    ) -> EngineResult<InventoryMovement> {
        let mut tx = self.begin().await?;
        let movement = increment(&mut tx, product_id, quantity, order_id, reason, Utc::now()).await?;
        tx.commit().await?;
        Ok(movement)
    }

    /// Movement history of a product, newest first.
    pub async fn movements_for(&self, product_id: &str) -> EngineResult<Vec<InventoryMovement>> {
        let mut conn = self.acquire().await?;
        inventory_repo::get_product(&mut conn, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        Ok(inventory_repo::movements_for(&mut conn, product_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestShop};
    use crate::ErrorCode;

    #[tokio::test]
    async fn test_stock_and_history_move_together() {
        let shop = TestShop::new().await;
        shop.product("p1", 3500, 10).await;

        shop.engine.decrement_stock("p1", 3, None, "Quebra").await.unwrap();
        shop.engine.increment_stock("p1", 1, None, "Devolução").await.unwrap();

        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 8);

        let history = shop.engine.movements_for("p1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].movement_type, MovementType::Return);
        assert_eq!(history[0].quantity, 1);
        assert_eq!(history[1].movement_type, MovementType::Sale);
        assert_eq!(history[1].quantity, -3);
    }

    #[tokio::test]
    async fn test_unknown_product_writes_nothing() {
        let shop = TestShop::new().await;

        let err = shop.engine.decrement_stock("ghost", 1, None, "x").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = shop.engine.movements_for("ghost").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_quantity() {
        let shop = TestShop::new().await;
        shop.product("p1", 3500, 10).await;

        let err = shop.engine.increment_stock("p1", 0, None, "x").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(shop.engine.movements_for("p1").await.unwrap().is_empty());
    }
}
