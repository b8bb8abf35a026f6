//! # Settlement Rules
//!
//! What "fully paid" means, which invoice an order settles, and the
//! narration written into the ledger and the stock history.
//!
//! ## Invoice Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order ──► Appointment (pos_order_id = order.id)                        │
//! │                 │                                                       │
//! │                 ├─ 1. invoice whose appointment_id is the appointment  │
//! │                 ├─ 2. appointment.quote.invoice_id                     │
//! │                 └─ 3. first invoice line pointing at the appointment   │
//! │                                                                         │
//! │  First hit wins. No hit: payments are recorded on the order only.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;
use crate::types::{OrderStatus, PaymentMethod};

// =============================================================================
// Invoice Resolution
// =============================================================================

/// Candidate invoice links gathered for an order's appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceLinks {
    pub own_invoice_id: Option<String>,
    pub quote_invoice_id: Option<String>,
    pub first_line_invoice_id: Option<String>,
}

impl InvoiceLinks {
    /// Applies the precedence above.
    pub fn resolve(&self) -> Option<&str> {
        self.own_invoice_id
            .as_deref()
            .or(self.quote_invoice_id.as_deref())
            .or(self.first_line_invoice_id.as_deref())
    }
}

// =============================================================================
// Coverage
// =============================================================================

/// Whether payments cover the order's final amount.
#[inline]
pub fn is_fully_paid(total_paid: Money, final_amount: Money) -> bool {
    total_paid >= final_amount
}

/// Whether an OPEN order should now transition to PAID.
///
/// A PAID order never settles a second time.
#[inline]
pub fn should_settle(status: OrderStatus, total_paid: Money, final_amount: Money) -> bool {
    status == OrderStatus::Open && is_fully_paid(total_paid, final_amount)
}

/// Whether recorded payments settle the invoice.
#[inline]
pub fn is_invoice_settled(recorded: Money, invoice_amount: Money) -> bool {
    recorded >= invoice_amount
}

// =============================================================================
// Narration
// =============================================================================

/// "Compra PDV #<seq>", the sale DEBIT.
pub fn sale_description(seq_id: i64) -> String {
    format!("Compra PDV #{seq_id}")
}

/// "Pagamento PDV #<seq> (<METHOD>)", a payment CREDIT.
pub fn payment_description(seq_id: i64, method: PaymentMethod) -> String {
    format!("Pagamento PDV #{seq_id} ({method})")
}

/// Description of the compensating entry for an earlier entry.
pub fn reversal_description(original: &str) -> String {
    format!("ESTORNO: {original}")
}

/// SALE movement reason.
pub fn sale_movement_reason(seq_id: i64) -> String {
    format!("Venda PDV #{seq_id}")
}

/// RETURN movement reason on cancellation.
pub fn cancel_movement_reason(seq_id: i64, reason: &str) -> String {
    format!("Cancelamento PDV #{seq_id}: {reason}")
}

/// Payroll adjustment reason for a deduction.
pub fn payroll_deduction_reason(seq_id: i64) -> String {
    format!("Compra PDV #{seq_id} (desconto em folha)")
}

/// Payroll adjustment reason for the refund of a deduction.
pub fn payroll_refund_reason(seq_id: i64, reason: &str) -> String {
    format!("Estorno PDV #{seq_id}: {reason}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_precedence() {
        let mut links = InvoiceLinks {
            own_invoice_id: Some("inv-own".into()),
            quote_invoice_id: Some("inv-quote".into()),
            first_line_invoice_id: Some("inv-line".into()),
        };
        assert_eq!(links.resolve(), Some("inv-own"));

        links.own_invoice_id = None;
        assert_eq!(links.resolve(), Some("inv-quote"));

        links.quote_invoice_id = None;
        assert_eq!(links.resolve(), Some("inv-line"));

        assert_eq!(InvoiceLinks::default().resolve(), None);
    }

    #[test]
    fn test_should_settle_only_open_orders() {
        let final_amount = Money::from_cents(9000);
        assert!(!should_settle(OrderStatus::Open, Money::from_cents(4000), final_amount));
        assert!(should_settle(OrderStatus::Open, Money::from_cents(9000), final_amount));
        assert!(should_settle(OrderStatus::Open, Money::from_cents(9500), final_amount));
        assert!(!should_settle(OrderStatus::Paid, Money::from_cents(9500), final_amount));
        assert!(!should_settle(OrderStatus::Cancelled, final_amount, final_amount));
    }

    #[test]
    fn test_invoice_settled() {
        assert!(is_invoice_settled(Money::from_cents(100), Money::from_cents(100)));
        assert!(!is_invoice_settled(Money::from_cents(99), Money::from_cents(100)));
    }

    #[test]
    fn test_narration() {
        assert_eq!(sale_description(7), "Compra PDV #7");
        assert_eq!(
            payment_description(7, PaymentMethod::PixCpf),
            "Pagamento PDV #7 (PIX_CPF)"
        );
        assert_eq!(
            reversal_description(&sale_description(7)),
            "ESTORNO: Compra PDV #7"
        );
        assert_eq!(sale_movement_reason(7), "Venda PDV #7");
        assert_eq!(
            cancel_movement_reason(7, "cliente desistiu"),
            "Cancelamento PDV #7: cliente desistiu"
        );
    }
}
