//! # Settlement Synchronizer
//!
//! Propagates "order fully paid" to the rest of the shop, and takes it back
//! when a paid order is cancelled. Both directions run inside the caller's
//! transaction.
//!
//! ## Settle (OPEN → PAID)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Appointment (pos_order_id = order) ──► billing_status = PAID          │
//! │  Invoice (own → quote → first line)  ──► PAGO when Σ records ≥ amount  │
//! │  Each product item                   ──► stock −qty, SALE movement     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Revert (PAID → CANCELLED)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Each product item                   ──► stock +qty, RETURN movement   │
//! │  Appointment                         ──► billing_status = UNBILLED     │
//! │  Invoice and payment records         ──► untouched                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use pawpos_core::settlement::{
    cancel_movement_reason, is_invoice_settled, sale_movement_reason, InvoiceLinks,
};
use pawpos_core::{Appointment, BillingStatus, InvoiceStatus, Money, Order, SettlementReport};
use pawpos_db::repository::{billing, order as order_repo};

use crate::error::EngineResult;
use crate::inventory;

/// The appointment checked out by an order and the invoice it settles.
#[derive(Debug, Clone, Default)]
pub struct SettlementTarget {
    pub appointment: Option<Appointment>,
    pub invoice_id: Option<String>,
}

impl SettlementTarget {
    /// Follows the order's appointment link and the invoice precedence.
    pub async fn resolve(conn: &mut SqliteConnection, order_id: &str) -> EngineResult<Self> {
        let appointment = billing::appointment_for_order(conn, order_id).await?;

        let invoice_id = match &appointment {
            Some(appointment) => {
                let links: InvoiceLinks = billing::invoice_links(conn, appointment).await?;
                links.resolve().map(str::to_string)
            }
            None => None,
        };

        Ok(SettlementTarget {
            appointment,
            invoice_id,
        })
    }
}

/// Marks the invoice PAGO once its payment records cover the amount.
///
/// Returns `true` only when this call changed the status. Unknown invoices
/// are skipped.
pub async fn sync_invoice(conn: &mut SqliteConnection, invoice_id: &str) -> EngineResult<bool> {
    let Some(invoice) = billing::get_invoice(conn, invoice_id).await? else {
        return Ok(false);
    };
    if invoice.status == InvoiceStatus::Pago {
        return Ok(false);
    }

    let recorded = Money::from_cents(billing::recorded_total(conn, invoice_id).await?);
    if !is_invoice_settled(recorded, invoice.amount()) {
        return Ok(false);
    }

    billing::set_invoice_status(conn, invoice_id, InvoiceStatus::Pago).await?;
    info!(invoice_id = %invoice_id, recorded = %recorded, "Invoice paid");
    Ok(true)
}

/// Runs the PAID side effects for `order`.
pub async fn settle(
    conn: &mut SqliteConnection,
    order: &Order,
    target: &SettlementTarget,
    now: DateTime<Utc>,
) -> EngineResult<SettlementReport> {
    let mut report = SettlementReport {
        order_id: order.id.clone(),
        ..Default::default()
    };

    if let Some(appointment) = &target.appointment {
        billing::set_billing_status(conn, &appointment.id, BillingStatus::Paid).await?;
        report.appointment_id = Some(appointment.id.clone());
    }

    if let Some(invoice_id) = &target.invoice_id {
        report.invoice_id = Some(invoice_id.clone());
        report.invoice_marked_paid = sync_invoice(conn, invoice_id).await?;
    }

    let reason = sale_movement_reason(order.seq_id);
    for item in order_repo::items(conn, &order.id).await? {
        if let Some(product_id) = &item.product_id {
            inventory::decrement(conn, product_id, item.quantity, Some(&order.id), &reason, now)
                .await?;
            report.stock_movements += 1;
        }
    }

    info!(
        order_id = %order.id,
        seq_id = order.seq_id,
        appointment_id = ?report.appointment_id,
        invoice_id = ?report.invoice_id,
        invoice_marked_paid = report.invoice_marked_paid,
        stock_movements = report.stock_movements,
        "Order settled"
    );

    Ok(report)
}

/// Undoes the stock and appointment effects of a settled order.
pub async fn revert(
    conn: &mut SqliteConnection,
    order: &Order,
    target: &SettlementTarget,
    reason: &str,
    now: DateTime<Utc>,
) -> EngineResult<SettlementReport> {
    let mut report = SettlementReport {
        order_id: order.id.clone(),
        invoice_id: target.invoice_id.clone(),
        ..Default::default()
    };

    let movement_reason = cancel_movement_reason(order.seq_id, reason);
    for item in order_repo::items(conn, &order.id).await? {
        if let Some(product_id) = &item.product_id {
            inventory::increment(
                conn,
                product_id,
                item.quantity,
                Some(&order.id),
                &movement_reason,
                now,
            )
            .await?;
            report.stock_movements += 1;
        }
    }

    if let Some(appointment) = &target.appointment {
        billing::set_billing_status(conn, &appointment.id, BillingStatus::Unbilled).await?;
        report.appointment_id = Some(appointment.id.clone());
    }

    info!(
        order_id = %order.id,
        seq_id = order.seq_id,
        stock_movements = report.stock_movements,
        "Order settlement reverted"
    );

    Ok(report)
}
