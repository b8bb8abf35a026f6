//! # Catalog Repository
//!
//! Read access to products and services for the POS item picker, plus
//! inserts used by the seed binary and tests. Catalog management itself
//! belongs to another subsystem.
//!
//! ## Search
//! Case-insensitive substring match (`LIKE` is case-insensitive for ASCII
//! in SQLite; `lower()` on both sides covers the rest). Soft-deleted rows
//! are never returned.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use pawpos_core::{Product, Service};

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price_cents, stock, deleted_at";
const SERVICE_COLUMNS: &str =
    "id, name, description, base_price_cents, duration_minutes, category, deleted_at";

fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Products whose name, description or SKU contains `query`.
pub async fn search_products(
    conn: &mut SqliteConnection,
    query: &str,
    limit: i64,
) -> DbResult<Vec<Product>> {
    debug!(query = %query, limit, "Searching products");

    let pattern = like_pattern(query);
    let sql = format!(
        r#"
        SELECT {PRODUCT_COLUMNS}
        FROM products
        WHERE deleted_at IS NULL
          AND (lower(name) LIKE ?1 ESCAPE '\'
               OR lower(COALESCE(description, '')) LIKE ?1 ESCAPE '\'
               OR lower(COALESCE(sku, '')) LIKE ?1 ESCAPE '\')
        ORDER BY name
        LIMIT ?2
        "#
    );

    let products = sqlx::query_as::<_, Product>(&sql)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    Ok(products)
}

/// Services whose name or description contains `query`.
pub async fn search_services(
    conn: &mut SqliteConnection,
    query: &str,
    limit: i64,
) -> DbResult<Vec<Service>> {
    debug!(query = %query, limit, "Searching services");

    let pattern = like_pattern(query);
    let sql = format!(
        r#"
        SELECT {SERVICE_COLUMNS}
        FROM services
        WHERE deleted_at IS NULL
          AND (lower(name) LIKE ?1 ESCAPE '\'
               OR lower(COALESCE(description, '')) LIKE ?1 ESCAPE '\')
        ORDER BY name
        LIMIT ?2
        "#
    );

    let services = sqlx::query_as::<_, Service>(&sql)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    Ok(services)
}

/// Gets a service by ID.
pub async fn get_service(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Service>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1");
    let service = sqlx::query_as::<_, Service>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(service)
}

/// Inserts a product.
pub async fn insert_product(
    conn: &mut SqliteConnection,
    id: &str,
    sku: Option<&str>,
    name: &str,
    description: Option<&str>,
    price_cents: i64,
    stock: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (id, sku, name, description, price_cents, stock)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(id)
    .bind(sku)
    .bind(name)
    .bind(description)
    .bind(price_cents)
    .bind(stock)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a service.
pub async fn insert_service(
    conn: &mut SqliteConnection,
    id: &str,
    name: &str,
    description: Option<&str>,
    base_price_cents: i64,
    duration_minutes: Option<i64>,
    category: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO services (id, name, description, base_price_cents, duration_minutes, category)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(base_price_cents)
    .bind(duration_minutes)
    .bind(category)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Soft-deletes a product.
pub async fn soft_delete_product(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE products SET deleted_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Number of live products (seed idempotence check).
pub async fn count_products(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_skips_deleted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        insert_product(&mut conn, "p1", Some("SHP-01"), "Shampoo Neutro", None, 3500, 5)
            .await
            .unwrap();
        insert_product(&mut conn, "p2", Some("SHP-02"), "Shampoo Antipulgas", None, 4200, 5)
            .await
            .unwrap();
        insert_product(&mut conn, "p3", None, "Coleira", Some("couro, tamanho M"), 3000, 5)
            .await
            .unwrap();
        insert_service(&mut conn, "s1", "Banho", Some("Banho completo"), 6000, Some(60), None)
            .await
            .unwrap();

        soft_delete_product(&mut conn, "p2", Utc::now()).await.unwrap();

        let hits = search_products(&mut conn, "shampoo", 50).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "p1");

        let by_sku = search_products(&mut conn, "shp-01", 50).await.unwrap();
        assert_eq!(by_sku.len(), 1);

        let by_description = search_products(&mut conn, "COURO", 50).await.unwrap();
        assert_eq!(by_description[0].id, "p3");

        let services = search_services(&mut conn, "BANHO", 50).await.unwrap();
        assert_eq!(services.len(), 1);

        assert!(search_products(&mut conn, "100%", 50).await.unwrap().is_empty());
        assert_eq!(count_products(&mut conn).await.unwrap(), 2);
    }
}
