//! # Customer Repository
//!
//! Customers belong to the CRM subsystem. This engine reads them, keeps the
//! cached `balance_cents` in step with the ledger, and resolves staff
//! profiles for payroll deduction.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pawpos_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, balance_cents, user_id";

/// Gets a customer by ID.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

/// Gets a customer by ID, failing with `NotFound`.
pub async fn require(conn: &mut SqliteConnection, id: &str) -> DbResult<Customer> {
    get(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", id))
}

/// Inserts a customer (seed data and tests).
pub async fn insert(
    conn: &mut SqliteConnection,
    id: &str,
    name: &str,
    user_id: Option<&str>,
) -> DbResult<()> {
    debug!(id = %id, "Inserting customer");

    sqlx::query("INSERT INTO customers (id, name, balance_cents, user_id) VALUES (?1, ?2, 0, ?3)")
        .bind(id)
        .bind(name)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Adds `delta_cents` to the cached balance and returns the new balance.
///
/// This is the first write of every ledger unit, so it also takes
/// SQLite's write lock for the transaction.
pub async fn apply_balance_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta_cents: i64,
) -> DbResult<i64> {
    debug!(customer_id = %id, delta_cents, "Applying balance delta");

    let balance: Option<i64> = sqlx::query_scalar(
        "UPDATE customers SET balance_cents = balance_cents + ?1 WHERE id = ?2 RETURNING balance_cents",
    )
    .bind(delta_cents)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    balance.ok_or_else(|| DbError::not_found("Customer", id))
}

/// Overwrites the cached balance.
pub async fn set_balance(conn: &mut SqliteConnection, id: &str, balance_cents: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE customers SET balance_cents = ?1 WHERE id = ?2")
        .bind(balance_cents)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", id));
    }

    Ok(())
}

/// Lists every customer ID, oldest rowid first.
pub async fn list_ids(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
    let ids = sqlx::query_scalar("SELECT id FROM customers ORDER BY rowid")
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids)
}

/// Resolves the staff profile of a customer, if the customer is staff.
///
/// A customer is staff when its `user_id` matches a staff profile's.
pub async fn staff_profile_id(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Option<String>> {
    let staff_id = sqlx::query_scalar(
        r#"
        SELECT s.id
        FROM customers c
        JOIN staff_profiles s ON s.user_id = c.user_id
        WHERE c.id = ?1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(staff_id)
}

/// Inserts a staff profile (seed data and tests).
pub async fn insert_staff_profile(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
) -> DbResult<()> {
    sqlx::query("INSERT INTO staff_profiles (id, user_id) VALUES (?1, ?2)")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_balance_delta_and_staff_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        insert(&mut conn, "c1", "Ana", Some("user-ana")).await.unwrap();
        insert(&mut conn, "c2", "Bruno", None).await.unwrap();
        insert_staff_profile(&mut conn, "staff-ana", "user-ana").await.unwrap();

        assert_eq!(apply_balance_delta(&mut conn, "c1", 900).await.unwrap(), 900);
        assert_eq!(apply_balance_delta(&mut conn, "c1", -400).await.unwrap(), 500);
        assert_eq!(require(&mut conn, "c1").await.unwrap().balance_cents, 500);

        assert_eq!(
            staff_profile_id(&mut conn, "c1").await.unwrap().as_deref(),
            Some("staff-ana")
        );
        assert_eq!(staff_profile_id(&mut conn, "c2").await.unwrap(), None);

        assert!(matches!(
            apply_balance_delta(&mut conn, "missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
