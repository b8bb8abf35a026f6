//! # Order Engine
//!
//! Order, item and payment lifecycle at the counter.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_order ──► OPEN ── Σ payments ≥ final ──► PAID                 │
//! │                     │                              │                    │
//! │                     │ cancel_order                 │ cancel_order       │
//! │                     ▼                              ▼                    │
//! │                 CANCELLED ◄────────────────────────┘                    │
//! │                 (terminal: no payments, no second cancel)               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ledger Footprint of an Order
//! ```text
//!   create_order   DEBIT  "Compra PDV #n"             (customer, final > 0)
//!   add_payment    CREDIT "Pagamento PDV #n (PIX)"    (customer, per payment)
//!   cancel_order   opposite entry "ESTORNO: ..." for each of the above
//! ```
//!
//! Every operation is one transaction whose first statement writes the
//! row it is about to read-modify-write (the cash session for creation,
//! the order for payment and cancellation). Two concurrent payments on the
//! same order therefore run one after the other, and only one of them
//! observes the OPEN → PAID transition.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use pawpos_core::pricing::compute_totals;
use pawpos_core::settlement::{
    payment_description, payroll_deduction_reason, payroll_refund_reason, sale_description,
    should_settle,
};
use pawpos_core::validation::{
    normalize_page_size, validate_actor, validate_new_order, validate_payments, validate_reason,
};
use pawpos_core::{
    AdjustmentDirection, AdjustmentKind, CoreError, EntryType, Money, NewLedgerEntry, NewOrder,
    NewPayment, Order, OrderDetails, OrderStatus, PaymentMethod, ValidationError, MAX_PAGE_SIZE,
};
use pawpos_db::repository::order::OrderInsert;
use pawpos_db::repository::{
    billing, cash_session as session_repo, customer, ledger as ledger_repo, order as order_repo,
    payroll,
};

use crate::error::EngineResult;
use crate::ledger::record_entry;
use crate::settlement::{self, SettlementTarget};
use crate::PosEngine;

/// Loads an order with its items and payments.
pub async fn load_details(conn: &mut SqliteConnection, order_id: &str) -> EngineResult<OrderDetails> {
    let order = order_repo::require(conn, order_id).await?;
    let items = order_repo::items(conn, order_id).await?;
    let payments = order_repo::payments(conn, order_id).await?;
    Ok(OrderDetails::new(order, items, payments))
}

/// Staff profile to charge for payroll deductions, if the batch has any.
async fn payroll_staff(
    conn: &mut SqliteConnection,
    order: &Order,
    payments: &[NewPayment],
) -> EngineResult<Option<String>> {
    if !payments
        .iter()
        .any(|payment| payment.method == PaymentMethod::PayrollDeduction)
    {
        return Ok(None);
    }

    let customer_id = order
        .customer_id
        .as_deref()
        .ok_or(ValidationError::PayrollWithoutCustomer)?;

    let staff_id = customer::staff_profile_id(conn, customer_id)
        .await?
        .ok_or_else(|| ValidationError::PayrollNotEligible {
            customer_id: customer_id.to_string(),
        })?;

    Ok(Some(staff_id))
}

impl PosEngine {
    // =========================================================================
    // Create
    // =========================================================================

    /// Opens an order against a cash session.
    ///
    /// ## Returns
    /// * `Err(Validation)` - bad items or discount
    /// * `Err(NotFound)` - unknown cash session, customer or appointment
    pub async fn create_order(&self, request: NewOrder) -> EngineResult<OrderDetails> {
        validate_new_order(&request)?;
        self.with_deadline("create_order", self.create_order_unit(&request))
            .await
    }

    async fn create_order_unit(&self, request: &NewOrder) -> EngineResult<OrderDetails> {
        let totals = compute_totals(
            &request.items,
            Money::from_cents(request.global_discount_cents),
        );
        let now = Utc::now();
        let mut tx = self.begin().await?;

        // Write lock first: seq_id allocation below must not race.
        let session = session_repo::touch(&mut tx, &request.cash_session_id, now).await?;

        if let Some(customer_id) = &request.customer_id {
            customer::require(&mut tx, customer_id).await?;
        }

        let seq_id = order_repo::next_seq_id(&mut tx).await?;
        let order = order_repo::insert_order(
            &mut tx,
            &OrderInsert {
                seq_id,
                customer_id: request.customer_id.as_deref(),
                cash_session_id: &request.cash_session_id,
                seller_id: request.seller_id.as_deref(),
                payment_condition: request.payment_condition.unwrap_or_default(),
                total_amount_cents: totals.total.cents(),
                discount_amount_cents: totals.discount.cents(),
                final_amount_cents: totals.final_amount.cents(),
            },
            now,
        )
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for (position, item) in request.items.iter().enumerate() {
            items.push(order_repo::insert_item(&mut tx, &order.id, position as i64, item).await?);
        }

        if let Some(appointment_id) = &request.appointment_id {
            billing::link_order(&mut tx, appointment_id, &order.id).await?;
        }

        if let Some(customer_id) = &order.customer_id {
            if order.final_amount().is_positive() {
                let created_by = request
                    .seller_id
                    .clone()
                    .unwrap_or_else(|| session.opened_by.clone());
                let entry = NewLedgerEntry::pdv(
                    customer_id,
                    EntryType::Debit,
                    order.final_amount(),
                    sale_description(seq_id),
                    &order.id,
                    created_by,
                );
                record_entry(&mut tx, &entry, &self.config.alert_thresholds, now).await?;
            }
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            seq_id,
            customer_id = ?order.customer_id,
            items = items.len(),
            total = %totals.total,
            discount = %totals.discount,
            final_amount = %totals.final_amount,
            "Order created"
        );

        Ok(OrderDetails::new(order, items, Vec::new()))
    }

    // =========================================================================
    // Pay
    // =========================================================================

    /// Applies a batch of payments; settles the order when fully covered.
    ///
    /// ## Returns
    /// * `Err(Validation)` - empty batch, amount ≤ 0, bad installments,
    ///   payroll deduction for a non-staff or walk-in customer
    /// * `Err(NotFound)` - unknown order
    /// * `Err(InvalidState)` - order is CANCELLED
    /// * `Err(Timeout)` - the unit exceeded the settlement deadline
    pub async fn add_payment(
        &self,
        order_id: &str,
        payments: Vec<NewPayment>,
    ) -> EngineResult<OrderDetails> {
        validate_payments(&payments)?;
        self.with_deadline("add_payment", self.add_payment_unit(order_id, &payments))
            .await
    }

    async fn add_payment_unit(
        &self,
        order_id: &str,
        payments: &[NewPayment],
    ) -> EngineResult<OrderDetails> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let order = order_repo::touch(&mut tx, order_id, now).await?;
        if !order.status.accepts_payments() {
            warn!(order_id = %order_id, status = %order.status, "Payment refused");
            return Err(CoreError::invalid_state("Order", order_id, order.status).into());
        }

        // All checks that can reject the batch happen before the first write.
        let staff_id = payroll_staff(&mut tx, &order, payments).await?;

        let session = session_repo::get(&mut tx, &order.cash_session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashSession", &order.cash_session_id))?;
        let target = SettlementTarget::resolve(&mut tx, &order.id).await?;

        for payment in payments {
            order_repo::insert_payment(&mut tx, &order.id, payment, now).await?;

            if let Some(customer_id) = &order.customer_id {
                let entry = NewLedgerEntry::pdv(
                    customer_id,
                    EntryType::Credit,
                    payment.amount(),
                    payment_description(order.seq_id, payment.method),
                    &order.id,
                    &session.opened_by,
                )
                .with_invoice(target.invoice_id.clone());
                record_entry(&mut tx, &entry, &self.config.alert_thresholds, now).await?;
            }

            if let Some(invoice_id) = &target.invoice_id {
                billing::insert_payment_record(
                    &mut tx,
                    invoice_id,
                    payment.amount_cents,
                    payment.method,
                    Some(&order.id),
                    now,
                )
                .await?;
            }

            if payment.method == PaymentMethod::PayrollDeduction {
                if let Some(staff_id) = &staff_id {
                    payroll::insert_adjustment(
                        &mut tx,
                        staff_id,
                        AdjustmentDirection::Debit,
                        AdjustmentKind::PosPurchase,
                        payment.amount_cents,
                        Some(&order.id),
                        &payroll_deduction_reason(order.seq_id),
                        now,
                    )
                    .await?;
                }
            }

            debug!(
                order_id = %order.id,
                method = %payment.method,
                amount = %payment.amount(),
                "Payment applied"
            );
        }

        let total_paid = Money::from_cents(order_repo::total_paid(&mut tx, &order.id).await?);
        if should_settle(order.status, total_paid, order.final_amount()) {
            order_repo::mark_paid(&mut tx, &order.id, now).await?;
            settlement::settle(&mut tx, &order, &target, now).await?;
        } else if let Some(invoice_id) = &target.invoice_id {
            // Late payments on a PAID order can still complete its invoice.
            settlement::sync_invoice(&mut tx, invoice_id).await?;
        }

        let details = load_details(&mut tx, &order.id).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            seq_id = order.seq_id,
            payments = payments.len(),
            total_paid = %total_paid,
            status = %details.order.status,
            "Payments recorded"
        );

        Ok(details)
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels an OPEN or PAID order with compensating entries.
    ///
    /// Cancelling an OPEN order still reverses the DEBIT and any partial
    /// payment CREDITs it already booked.
    ///
    /// Nothing is deleted: the ledger gains one opposite entry per entry the
    /// order booked, payroll deductions are refunded, and a PAID order's
    /// stock and appointment billing are put back.
    ///
    /// ## Returns
    /// * `Err(Validation)` - blank reason or actor
    /// * `Err(NotFound)` - unknown order
    /// * `Err(InvalidState)` - order already CANCELLED
    pub async fn cancel_order(
        &self,
        order_id: &str,
        reason: &str,
        actor_id: &str,
    ) -> EngineResult<OrderDetails> {
        validate_reason(reason)?;
        validate_actor("actor_id", actor_id)?;
        self.with_deadline(
            "cancel_order",
            self.cancel_order_unit(order_id, reason.trim(), actor_id),
        )
        .await
    }

    async fn cancel_order_unit(
        &self,
        order_id: &str,
        reason: &str,
        actor_id: &str,
    ) -> EngineResult<OrderDetails> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let order = order_repo::touch(&mut tx, order_id, now).await?;
        if !order.status.can_cancel() {
            warn!(order_id = %order_id, status = %order.status, "Cancellation refused");
            return Err(CoreError::invalid_state("Order", order_id, order.status).into());
        }
        let was_paid = order.status == OrderStatus::Paid;

        order_repo::mark_cancelled(&mut tx, &order.id, reason, now).await?;

        if was_paid {
            let target = SettlementTarget::resolve(&mut tx, &order.id).await?;
            settlement::revert(&mut tx, &order, &target, reason, now).await?;
        }

        let booked = ledger_repo::transactions_for_order(&mut tx, &order.id).await?;
        for original in &booked {
            let reversal = NewLedgerEntry::reversal_of(original, reason, actor_id);
            record_entry(&mut tx, &reversal, &self.config.alert_thresholds, now).await?;
        }

        let adjustments = payroll::adjustments_for_order(&mut tx, &order.id).await?;
        let refund_reason = payroll_refund_reason(order.seq_id, reason);
        for adjustment in adjustments.iter().filter(|a| {
            a.kind == AdjustmentKind::PosPurchase && a.direction == AdjustmentDirection::Debit
        }) {
            payroll::insert_adjustment(
                &mut tx,
                &adjustment.staff_id,
                AdjustmentDirection::Credit,
                AdjustmentKind::PosRefund,
                adjustment.amount_cents,
                Some(&order.id),
                &refund_reason,
                now,
            )
            .await?;
        }

        let details = load_details(&mut tx, &order.id).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            seq_id = order.seq_id,
            was_paid,
            reversed_entries = booked.len(),
            actor_id = %actor_id,
            reason = %reason,
            "Order cancelled"
        );

        Ok(details)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// An order with items, payments, total paid and remaining amount.
    pub async fn get_order_details(&self, order_id: &str) -> EngineResult<OrderDetails> {
        let mut conn = self.acquire().await?;
        load_details(&mut conn, order_id).await
    }

    /// Most recent orders, newest first.
    pub async fn list_recent_orders(&self, limit: Option<i64>) -> EngineResult<Vec<Order>> {
        let limit = normalize_page_size(limit, self.config.recent_orders_limit, MAX_PAGE_SIZE);
        let mut conn = self.acquire().await?;
        Ok(order_repo::recent(&mut conn, limit).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestShop};
    use crate::{EngineConfig, ErrorCode};
    use pawpos_core::{
        AlertType, BillingStatus, InvoiceStatus, MovementType, NewOrderItem, PaymentCondition,
        MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY,
    };
    use std::time::Duration;

    fn shampoo(quantity: i64) -> NewOrderItem {
        NewOrderItem::product("p1", "Shampoo Neutro", quantity, Money::from_cents(4500))
    }

    fn order_for(session_id: &str, customer_id: Option<&str>, items: Vec<NewOrderItem>) -> NewOrder {
        NewOrder {
            customer_id: customer_id.map(str::to_string),
            cash_session_id: session_id.to_string(),
            seller_id: Some("seller-1".to_string()),
            payment_condition: None,
            items,
            appointment_id: None,
            global_discount_cents: 0,
        }
    }

    fn pay(method: PaymentMethod, cents: i64) -> NewPayment {
        NewPayment::new(method, Money::from_cents(cents))
    }

    #[tokio::test]
    async fn test_totals_with_global_discount() {
        let shop = TestShop::new().await;
        shop.product("p1", 50, 10).await;
        let session = shop.open_session().await;

        let item = NewOrderItem::product("p1", "Petisco", 2, Money::from_cents(50));
        let details = shop
            .engine
            .create_order(order_for(&session.id, None, vec![item.clone()]))
            .await
            .unwrap();
        assert_eq!(details.order.total_amount_cents, 100);
        assert_eq!(details.order.final_amount_cents, 100);
        assert_eq!(details.order.status, OrderStatus::Open);
        assert_eq!(details.order.payment_condition, PaymentCondition::CashOnDelivery);

        let mut request = order_for(&session.id, None, vec![item]);
        request.global_discount_cents = 10;
        let details = shop.engine.create_order(request).await.unwrap();
        assert_eq!(details.order.discount_amount_cents, 10);
        assert_eq!(details.order.final_amount_cents, 90);
        assert_eq!(details.order.seq_id, 2);
    }

    #[tokio::test]
    async fn test_create_books_debit_for_customer() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let details = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![shampoo(2)]))
            .await
            .unwrap();

        assert_eq!(shop.engine.calculate_balance("c1").await.unwrap().cents(), 9000);
        let history = shop
            .engine
            .get_transaction_history("c1", Default::default())
            .await
            .unwrap();
        assert_eq!(history.total, 1);
        assert_eq!(history.transactions[0].entry_type, EntryType::Debit);
        assert_eq!(
            history.transactions[0].description,
            format!("Compra PDV #{}", details.order.seq_id)
        );
        assert_eq!(history.transactions[0].created_by, "seller-1");
        assert_eq!(
            history.transactions[0].related_order_id.as_deref(),
            Some(details.order.id.as_str())
        );
    }

    #[tokio::test]
    async fn test_create_rejections_leave_no_trace() {
        let shop = TestShop::new().await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let err = shop
            .engine
            .create_order(order_for(&session.id, None, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = shop
            .engine
            .create_order(order_for(&session.id, None, vec![shampoo(1000)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = shop
            .engine
            .create_order(order_for("ghost-session", None, vec![shampoo(1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let mut request = order_for(&session.id, None, vec![shampoo(1)]);
        request.appointment_id = Some("ghost-appointment".to_string());
        let err = shop.engine.create_order(request).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        assert!(shop.engine.list_recent_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let item = NewOrderItem::product("p1", "Shampoo Neutro", 2, Money::from_cents(4500));
        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![item]))
            .await
            .unwrap();
        let order_id = created.order.id.clone();
        assert_eq!(created.order.final_amount_cents, 9000);

        let first = shop
            .engine
            .add_payment(&order_id, vec![pay(PaymentMethod::Pix, 4000)])
            .await
            .unwrap();
        assert_eq!(first.order.status, OrderStatus::Open);
        assert_eq!(first.remaining_cents, 5000);
        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 10);

        let second = shop
            .engine
            .add_payment(&order_id, vec![pay(PaymentMethod::CreditCard, 5000)])
            .await
            .unwrap();
        assert_eq!(second.order.status, OrderStatus::Paid);
        assert!(second.order.paid_at.is_some());
        assert_eq!(second.total_paid_cents, 9000);
        assert_eq!(second.remaining_cents, 0);
        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 8);

        let movements = shop.engine.movements_for("p1").await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Sale);
        assert_eq!(movements[0].quantity, -2);
        assert_eq!(movements[0].reason, format!("Venda PDV #{}", created.order.seq_id));

        assert_eq!(shop.engine.calculate_balance("c1").await.unwrap().cents(), 0);
        assert!(!shop.engine.balance_drift("c1").await.unwrap().has_drift());
    }

    #[tokio::test]
    async fn test_mixed_methods_in_one_batch() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![shampoo(2)]))
            .await
            .unwrap();

        let paid = shop
            .engine
            .add_payment(
                &created.order.id,
                vec![pay(PaymentMethod::Cash, 3000), pay(PaymentMethod::DebitCard, 6000)],
            )
            .await
            .unwrap();
        assert_eq!(paid.order.status, OrderStatus::Paid);
        assert_eq!(paid.payments.len(), 2);

        let history = shop
            .engine
            .get_transaction_history("c1", Default::default())
            .await
            .unwrap();
        assert_eq!(history.total, 3);
        assert!(history
            .transactions
            .iter()
            .any(|t| t.description.ends_with("(DEBIT_CARD)")));
    }

    #[tokio::test]
    async fn test_payment_validation_happens_before_writes() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;
        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![shampoo(2)]))
            .await
            .unwrap();

        let err = shop
            .engine
            .add_payment(
                &created.order.id,
                vec![pay(PaymentMethod::Pix, 4000), pay(PaymentMethod::Cash, 0)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let mut installments = pay(PaymentMethod::CreditCardInstallment, 9000);
        installments.installments = 0;
        let err = shop
            .engine
            .add_payment(&created.order.id, vec![installments])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = shop.engine.add_payment(&created.order.id, vec![]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let details = shop.engine.get_order_details(&created.order.id).await.unwrap();
        assert!(details.payments.is_empty());
        assert_eq!(shop.engine.calculate_balance("c1").await.unwrap().cents(), 9000);
    }

    #[tokio::test]
    async fn test_payment_on_unknown_or_cancelled_order() {
        let shop = TestShop::new().await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let err = shop
            .engine
            .add_payment("ghost", vec![pay(PaymentMethod::Cash, 100)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let created = shop
            .engine
            .create_order(order_for(&session.id, None, vec![shampoo(1)]))
            .await
            .unwrap();
        shop.engine
            .cancel_order(&created.order.id, "cliente desistiu", "manager-1")
            .await
            .unwrap();

        let err = shop
            .engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Cash, 4500)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        let err = shop
            .engine
            .cancel_order(&created.order.id, "de novo", "manager-1")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_overpayment_on_paid_order_never_settles_twice() {
        let shop = TestShop::new().await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;
        let created = shop
            .engine
            .create_order(order_for(&session.id, None, vec![shampoo(1)]))
            .await
            .unwrap();

        shop.engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Cash, 4500)])
            .await
            .unwrap();
        let again = shop
            .engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Pix, 1000)])
            .await
            .unwrap();

        assert_eq!(again.order.status, OrderStatus::Paid);
        assert_eq!(again.payments.len(), 2);
        assert_eq!(again.remaining_cents, 0);
        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 9);
        assert_eq!(shop.engine.movements_for("p1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_payments_settle_once() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;
        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![shampoo(2)]))
            .await
            .unwrap();
        let order_id = created.order.id.clone();

        let (a, b) = tokio::join!(
            shop.engine.add_payment(&order_id, vec![pay(PaymentMethod::Pix, 9000)]),
            shop.engine.add_payment(&order_id, vec![pay(PaymentMethod::Cash, 9000)]),
        );
        a.unwrap();
        b.unwrap();

        let details = shop.engine.get_order_details(&order_id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Paid);
        assert_eq!(details.payments.len(), 2);
        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 8);
        assert_eq!(shop.engine.calculate_balance("c1").await.unwrap().cents(), -9000);
        assert!(!shop.engine.balance_drift("c1").await.unwrap().has_drift());
    }

    #[tokio::test]
    async fn test_cancel_paid_order_restores_everything() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![shampoo(2)]))
            .await
            .unwrap();
        shop.engine
            .add_payment(
                &created.order.id,
                vec![pay(PaymentMethod::Pix, 4000), pay(PaymentMethod::Cash, 5000)],
            )
            .await
            .unwrap();
        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 8);

        let cancelled = shop
            .engine
            .cancel_order(&created.order.id, "  produto com defeito ", "manager-1")
            .await
            .unwrap();
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.order.return_reason.as_deref(), Some("produto com defeito"));
        assert!(cancelled.order.cancelled_at.is_some());
        assert_eq!(cancelled.payments.len(), 2);

        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 10);
        let movements = shop.engine.movements_for("p1").await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].movement_type, MovementType::Return);
        assert_eq!(
            movements[0].reason,
            format!("Cancelamento PDV #{}: produto com defeito", created.order.seq_id)
        );

        assert_eq!(shop.engine.calculate_balance("c1").await.unwrap().cents(), 0);
        assert!(!shop.engine.balance_drift("c1").await.unwrap().has_drift());

        let history = shop
            .engine
            .get_transaction_history("c1", Default::default())
            .await
            .unwrap();
        assert_eq!(history.total, 6);
        let reversals: Vec<_> = history
            .transactions
            .iter()
            .filter(|t| t.description.starts_with("ESTORNO: "))
            .collect();
        assert_eq!(reversals.len(), 3);
        assert!(reversals
            .iter()
            .all(|t| t.notes.as_deref() == Some("produto com defeito") && t.created_by == "manager-1"));
    }

    #[tokio::test]
    async fn test_cancel_open_order_keeps_stock() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![shampoo(2)]))
            .await
            .unwrap();
        shop.engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Pix, 4000)])
            .await
            .unwrap();

        shop.engine
            .cancel_order(&created.order.id, "desistiu", "manager-1")
            .await
            .unwrap();

        assert_eq!(test_support::stock_of(&shop.engine, "p1").await, 10);
        assert!(shop.engine.movements_for("p1").await.unwrap().is_empty());
        assert_eq!(shop.engine.calculate_balance("c1").await.unwrap().cents(), 0);

        let err = shop
            .engine
            .cancel_order(&created.order.id, " ", "manager-1")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_payroll_deduction_for_staff() {
        let shop = TestShop::new().await;
        shop.staff_customer("c-staff", "Fernanda", "user-9", "staff-9").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c-staff"), vec![shampoo(1)]))
            .await
            .unwrap();
        shop.engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::PayrollDeduction, 4500)])
            .await
            .unwrap();

        let adjustments = test_support::adjustments(&shop.engine, &created.order.id).await;
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].staff_id, "staff-9");
        assert_eq!(adjustments[0].direction, AdjustmentDirection::Debit);
        assert_eq!(adjustments[0].kind, AdjustmentKind::PosPurchase);
        assert!(adjustments[0].pay_period_id.is_none());

        shop.engine
            .cancel_order(&created.order.id, "troca", "manager-1")
            .await
            .unwrap();
        let adjustments = test_support::adjustments(&shop.engine, &created.order.id).await;
        assert_eq!(adjustments.len(), 2);
        assert_eq!(adjustments[1].direction, AdjustmentDirection::Credit);
        assert_eq!(adjustments[1].kind, AdjustmentKind::PosRefund);
        assert_eq!(adjustments[1].amount_cents, 4500);
    }

    #[tokio::test]
    async fn test_payroll_deduction_refused_for_non_staff() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let created = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![shampoo(1)]))
            .await
            .unwrap();
        let err = shop
            .engine
            .add_payment(
                &created.order.id,
                vec![pay(PaymentMethod::Cash, 500), pay(PaymentMethod::PayrollDeduction, 4000)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let details = shop.engine.get_order_details(&created.order.id).await.unwrap();
        assert!(details.payments.is_empty());
        assert_eq!(shop.engine.calculate_balance("c1").await.unwrap().cents(), 4500);
        assert!(test_support::adjustments(&shop.engine, &created.order.id).await.is_empty());

        let walk_in = shop
            .engine
            .create_order(order_for(&session.id, None, vec![shampoo(1)]))
            .await
            .unwrap();
        let err = shop
            .engine
            .add_payment(&walk_in.order.id, vec![pay(PaymentMethod::PayrollDeduction, 4500)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_appointment_checkout_settles_quote_invoice() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.service("s1", "Banho", 9000).await;
        shop.appointment_with_quote_invoice("a1", "c1", "Thor", "q1", "inv-1", 9000)
            .await;
        let session = shop.open_session().await;

        let mut request = order_for(
            &session.id,
            Some("c1"),
            vec![NewOrderItem::service("s1", "Serviço: Banho (Thor)", 1, Money::from_cents(9000))],
        );
        request.appointment_id = Some("a1".to_string());
        let created = shop.engine.create_order(request).await.unwrap();

        shop.engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Pix, 4000)])
            .await
            .unwrap();
        let (billing_status, invoice_status) = test_support::billing_state(&shop.engine, "a1", "inv-1").await;
        assert_eq!(billing_status, BillingStatus::Unbilled);
        assert_eq!(invoice_status, InvoiceStatus::Pendente);

        shop.engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Cash, 5000)])
            .await
            .unwrap();
        let (billing_status, invoice_status) = test_support::billing_state(&shop.engine, "a1", "inv-1").await;
        assert_eq!(billing_status, BillingStatus::Paid);
        assert_eq!(invoice_status, InvoiceStatus::Pago);
        assert_eq!(test_support::payment_record_count(&shop.engine, "inv-1").await, 2);

        let history = shop
            .engine
            .get_transaction_history("c1", Default::default())
            .await
            .unwrap();
        assert!(history
            .transactions
            .iter()
            .filter(|t| t.entry_type == EntryType::Credit)
            .all(|t| t.related_invoice_id.as_deref() == Some("inv-1")));

        shop.engine
            .cancel_order(&created.order.id, "reagendado", "manager-1")
            .await
            .unwrap();
        let (billing_status, invoice_status) = test_support::billing_state(&shop.engine, "a1", "inv-1").await;
        assert_eq!(billing_status, BillingStatus::Unbilled);
        assert_eq!(invoice_status, InvoiceStatus::Pago);
        assert_eq!(test_support::payment_record_count(&shop.engine, "inv-1").await, 2);
    }

    #[tokio::test]
    async fn test_late_payment_on_paid_order_completes_invoice() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.service("s1", "Banho", 9000).await;
        shop.appointment_with_quote_invoice("a1", "c1", "Thor", "q1", "inv-1", 10000)
            .await;
        let session = shop.open_session().await;

        let mut request = order_for(
            &session.id,
            Some("c1"),
            vec![NewOrderItem::service("s1", "Serviço: Banho (Thor)", 1, Money::from_cents(9000))],
        );
        request.appointment_id = Some("a1".to_string());
        let created = shop.engine.create_order(request).await.unwrap();

        let paid = shop
            .engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Pix, 9000)])
            .await
            .unwrap();
        assert_eq!(paid.order.status, OrderStatus::Paid);
        let (billing_status, invoice_status) = test_support::billing_state(&shop.engine, "a1", "inv-1").await;
        assert_eq!(billing_status, BillingStatus::Paid);
        assert_eq!(invoice_status, InvoiceStatus::Pendente);

        let topped_up = shop
            .engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::Cash, 1000)])
            .await
            .unwrap();
        assert_eq!(topped_up.order.status, OrderStatus::Paid);
        let (_, invoice_status) = test_support::billing_state(&shop.engine, "a1", "inv-1").await;
        assert_eq!(invoice_status, InvoiceStatus::Pago);
        assert_eq!(test_support::payment_record_count(&shop.engine, "inv-1").await, 2);
    }

    #[tokio::test]
    async fn test_extreme_amounts_are_rejected() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let mut overflowing = shampoo(2);
        overflowing.unit_price_cents = i64::MAX / 2 + 1;
        let err = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![overflowing]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let mut huge_discount = order_for(&session.id, Some("c1"), vec![shampoo(1)]);
        huge_discount.global_discount_cents = i64::MAX;
        let err = shop.engine.create_order(huge_discount).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let mut oversized = shampoo(MAX_ITEM_QUANTITY);
        oversized.unit_price_cents = MAX_AMOUNT_CENTS;
        let err = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![oversized]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert!(shop.engine.list_recent_orders(None).await.unwrap().is_empty());
        assert_eq!(test_support::transaction_count(&shop.engine).await, 0);

        let mut at_limit = shampoo(1);
        at_limit.unit_price_cents = MAX_AMOUNT_CENTS;
        let big = shop
            .engine
            .create_order(order_for(&session.id, Some("c1"), vec![at_limit]))
            .await
            .unwrap();
        assert_eq!(big.order.final_amount_cents, MAX_AMOUNT_CENTS);

        let err = shop
            .engine
            .add_payment(&big.order.id, vec![pay(PaymentMethod::Pix, i64::MAX)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(shop
            .engine
            .get_order_details(&big.order.id)
            .await
            .unwrap()
            .payments
            .is_empty());
    }

    #[tokio::test]
    async fn test_critical_alert_from_sales() {
        let shop = TestShop::new().await;
        shop.customer("c1", "Ana").await;
        shop.service("s1", "Tosa", 60_000).await;
        let session = shop.open_session().await;

        // Prepaid credit pushes the balance below the critical threshold.
        let created = shop
            .engine
            .create_order(order_for(
                &session.id,
                Some("c1"),
                vec![NewOrderItem::service("s1", "Tosa", 1, Money::from_cents(60_000))],
            ))
            .await
            .unwrap();
        shop.engine
            .add_payment(&created.order.id, vec![pay(PaymentMethod::AccountCredit, 170_000)])
            .await
            .unwrap();

        let alerts = shop.engine.active_alerts("c1").await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Critical);
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first() {
        let shop = TestShop::new().await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        for _ in 0..3 {
            shop.engine
                .create_order(order_for(&session.id, None, vec![shampoo(1)]))
                .await
                .unwrap();
        }

        let recent = shop.engine.list_recent_orders(Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].seq_id, 3);
        assert_eq!(recent[1].seq_id, 2);
    }

    #[tokio::test]
    async fn test_deadline_rolls_back() {
        let shop = TestShop::with_config(
            EngineConfig::default().settlement_timeout(Duration::from_nanos(1)),
        )
        .await;
        shop.product("p1", 4500, 10).await;
        let session = shop.open_session().await;

        let result = shop
            .engine
            .create_order(order_for(&session.id, None, vec![shampoo(1)]))
            .await;

        // Either the deadline fired before commit (nothing persisted) or the
        // unit finished first; it never half-applies.
        match result {
            Err(err) => {
                assert!(matches!(err, crate::EngineError::Timeout { .. }));
                assert!(shop.engine.list_recent_orders(None).await.unwrap().is_empty());
            }
            Ok(details) => {
                assert_eq!(details.items.len(), 1);
                assert_eq!(shop.engine.list_recent_orders(None).await.unwrap().len(), 1);
            }
        }
    }
}
