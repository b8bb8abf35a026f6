//! Fixtures for engine tests.
//!
//! The in-memory pool holds a single connection, so every helper acquires
//! and releases its own before returning.

use pawpos_core::{
    BillingStatus, CashSession, InvoiceStatus, Money, QuoteItem, StaffPayAdjustment,
};
use pawpos_db::repository::{billing, catalog, customer, ledger as ledger_repo, payroll};
use pawpos_db::{Database, DbConfig};

use crate::{EngineConfig, PosEngine};

pub struct TestShop {
    pub engine: PosEngine,
}

impl TestShop {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        TestShop {
            engine: PosEngine::new(db, config),
        }
    }

    pub async fn customer(&self, id: &str, name: &str) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        customer::insert(&mut conn, id, name, None).await.unwrap();
    }

    /// A customer linked to a staff profile through `user_id`.
    pub async fn staff_customer(&self, id: &str, name: &str, user_id: &str, staff_id: &str) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        customer::insert_staff_profile(&mut conn, staff_id, user_id)
            .await
            .unwrap();
        customer::insert(&mut conn, id, name, Some(user_id)).await.unwrap();
    }

    pub async fn product(&self, id: &str, price_cents: i64, stock: i64) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        catalog::insert_product(&mut conn, id, None, id, None, price_cents, stock)
            .await
            .unwrap();
    }

    pub async fn named_product(&self, id: &str, sku: &str, name: &str, price_cents: i64) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        catalog::insert_product(&mut conn, id, Some(sku), name, None, price_cents, 10)
            .await
            .unwrap();
    }

    pub async fn service(&self, id: &str, name: &str, price_cents: i64) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        catalog::insert_service(&mut conn, id, name, None, price_cents, Some(60), None)
            .await
            .unwrap();
    }

    pub async fn open_session(&self) -> CashSession {
        self.engine
            .open_session("user-1", Money::from_cents(10000), None)
            .await
            .unwrap()
    }

    /// Appointment with the given services, no quote and no invoice.
    pub async fn appointment(&self, id: &str, customer_id: &str, pet: &str, service_ids: &[&str]) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        billing::insert_appointment(&mut conn, id, customer_id, pet, None)
            .await
            .unwrap();
        for (position, service_id) in service_ids.iter().enumerate() {
            billing::insert_appointment_service(&mut conn, id, service_id, position as i64)
                .await
                .unwrap();
        }
    }

    /// Appointment whose quote carries the invoice.
    pub async fn appointment_with_quote_invoice(
        &self,
        appointment_id: &str,
        customer_id: &str,
        pet: &str,
        quote_id: &str,
        invoice_id: &str,
        amount_cents: i64,
    ) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        billing::insert_invoice(&mut conn, invoice_id, customer_id, None, amount_cents)
            .await
            .unwrap();
        billing::insert_quote(&mut conn, quote_id, Some(invoice_id))
            .await
            .unwrap();
        billing::insert_appointment(&mut conn, appointment_id, customer_id, pet, Some(quote_id))
            .await
            .unwrap();
    }

    /// Adds a line to an existing quote.
    pub async fn quote_item(&self, quote_id: &str, item: QuoteItem, position: i64) {
        let mut conn = self.engine.database().pool().acquire().await.unwrap();
        let item = QuoteItem {
            quote_id: quote_id.to_string(),
            ..item
        };
        billing::insert_quote_item(&mut conn, &item, position)
            .await
            .unwrap();
    }
}

pub async fn transaction_count(engine: &PosEngine) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM financial_transactions")
        .fetch_one(engine.database().pool())
        .await
        .unwrap()
}

pub async fn alert_history(engine: &PosEngine, customer_id: &str) -> Vec<pawpos_core::CustomerAlert> {
    let mut conn = engine.database().pool().acquire().await.unwrap();
    ledger_repo::all_alerts(&mut conn, customer_id).await.unwrap()
}

/// Overwrites the cached balance without touching the ledger.
pub async fn corrupt_balance(engine: &PosEngine, customer_id: &str, cents: i64) {
    let mut conn = engine.database().pool().acquire().await.unwrap();
    customer::set_balance(&mut conn, customer_id, cents).await.unwrap();
}

pub async fn stock_of(engine: &PosEngine, product_id: &str) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_one(engine.database().pool())
        .await
        .unwrap()
}

pub async fn adjustments(engine: &PosEngine, order_id: &str) -> Vec<StaffPayAdjustment> {
    let mut conn = engine.database().pool().acquire().await.unwrap();
    payroll::adjustments_for_order(&mut conn, order_id).await.unwrap()
}

/// Appointment billing status and invoice status.
pub async fn billing_state(
    engine: &PosEngine,
    appointment_id: &str,
    invoice_id: &str,
) -> (BillingStatus, InvoiceStatus) {
    let mut conn = engine.database().pool().acquire().await.unwrap();
    let appointment = billing::get_appointment(&mut conn, appointment_id)
        .await
        .unwrap()
        .unwrap();
    let invoice = billing::get_invoice(&mut conn, invoice_id).await.unwrap().unwrap();
    (appointment.billing_status, invoice.status)
}

pub async fn payment_record_count(engine: &PosEngine, invoice_id: &str) -> usize {
    let mut conn = engine.database().pool().acquire().await.unwrap();
    billing::payment_records(&mut conn, invoice_id).await.unwrap().len()
}
