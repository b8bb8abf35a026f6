//! # POS Item Search
//!
//! Read-only catalog lookup behind the item picker.
//!
//! ```text
//!   query ──trim──► < 2 chars? ──yes──► empty results
//!                        │
//!                        no
//!                        ├──► products (name, description, sku) ──┐
//!                        └──► services (name, description)      ──┴──► PosSearchResults
//! ```
//!
//! The two halves run concurrently and fail independently: a broken half is
//! logged and comes back empty.

use tracing::{debug, error};

use pawpos_core::validation::normalize_search_query;
use pawpos_core::{PosSearchResults, Product, Service, SEARCH_RESULT_LIMIT};
use pawpos_db::repository::catalog;

use crate::error::EngineResult;
use crate::PosEngine;

impl PosEngine {
    /// Case-insensitive substring search over live products and services.
    pub async fn search_pos_items(&self, query: &str) -> PosSearchResults {
        let Some(query) = normalize_search_query(query) else {
            return PosSearchResults::default();
        };

        let (products, services) = tokio::join!(
            self.search_products_half(&query),
            self.search_services_half(&query),
        );

        let results = PosSearchResults {
            products: products.unwrap_or_else(|err| {
                error!(query = %query, error = %err, "Product search failed");
                Vec::new()
            }),
            services: services.unwrap_or_else(|err| {
                error!(query = %query, error = %err, "Service search failed");
                Vec::new()
            }),
        };

        debug!(
            query = %query,
            products = results.products.len(),
            services = results.services.len(),
            "POS search"
        );

        results
    }

    async fn search_products_half(&self, query: &str) -> EngineResult<Vec<Product>> {
        let mut conn = self.acquire().await?;
        Ok(catalog::search_products(&mut conn, query, SEARCH_RESULT_LIMIT).await?)
    }

    async fn search_services_half(&self, query: &str) -> EngineResult<Vec<Service>> {
        let mut conn = self.acquire().await?;
        Ok(catalog::search_services(&mut conn, query, SEARCH_RESULT_LIMIT).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestShop;
    use chrono::Utc;
    use pawpos_db::repository::catalog;

    #[tokio::test]
    async fn test_short_query_returns_nothing() {
        let shop = TestShop::new().await;
        shop.named_product("p1", "SHA-01", "Shampoo Neutro", 4500).await;

        assert!(shop.engine.search_pos_items(" s ").await.is_empty());
        assert!(shop.engine.search_pos_items("").await.is_empty());
    }

    #[tokio::test]
    async fn test_matches_name_and_sku_case_insensitively() {
        let shop = TestShop::new().await;
        shop.named_product("p1", "SHA-01", "Shampoo Neutro", 4500).await;
        shop.named_product("p2", "COL-02", "Coleira Média", 3900).await;
        shop.service("s1", "Banho e Tosa", 9000).await;

        let results = shop.engine.search_pos_items("  SHAMPOO ").await;
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].id, "p1");
        assert!(results.services.is_empty());

        let results = shop.engine.search_pos_items("col-0").await;
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].id, "p2");

        let results = shop.engine.search_pos_items("tosa").await;
        assert!(results.products.is_empty());
        assert_eq!(results.services.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_products_are_hidden() {
        let shop = TestShop::new().await;
        shop.named_product("p1", "SHA-01", "Shampoo Neutro", 4500).await;
        shop.named_product("p2", "SHA-02", "Shampoo Antipulgas", 5200).await;

        {
            let mut conn = shop.engine.database().pool().acquire().await.unwrap();
            catalog::soft_delete_product(&mut conn, "p2", Utc::now())
                .await
                .unwrap();
        }

        let results = shop.engine.search_pos_items("shampoo").await;
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].id, "p1");
    }

    #[tokio::test]
    async fn test_like_wildcards_are_literal() {
        let shop = TestShop::new().await;
        shop.named_product("p1", "SHA-01", "Shampoo Neutro", 4500).await;

        assert!(shop.engine.search_pos_items("%%").await.is_empty());
        assert!(shop.engine.search_pos_items("__").await.is_empty());
    }
}
