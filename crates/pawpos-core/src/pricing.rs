//! # Pricing
//!
//! Order totals from requested line items.
//!
//! ```text
//!   total    = Σ unit_price × quantity
//!   discount = Σ item.discount + global_discount
//!   final    = max(0, total − discount)
//!   item.total_price = unit_price × quantity − item.discount
//! ```
//!
//! Inputs are expected to be validated already
//! (see [`crate::validation::validate_new_order`]).

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::NewOrderItem;

/// Computed order amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub total: Money,
    pub discount: Money,
    pub final_amount: Money,
}

/// Computes the order totals for a set of items and a global discount.
///
/// ## Example
/// ```rust
/// use pawpos_core::money::Money;
/// use pawpos_core::pricing::compute_totals;
/// use pawpos_core::types::NewOrderItem;
///
/// let items = vec![
///     NewOrderItem::service("svc-bath", "Banho", 1, Money::from_cents(6000)),
///     NewOrderItem::product("prod-collar", "Coleira", 1, Money::from_cents(3000))
///         .with_discount(Money::from_cents(500)),
/// ];
/// let totals = compute_totals(&items, Money::zero());
/// assert_eq!(totals.total.cents(), 9000);
/// assert_eq!(totals.discount.cents(), 500);
/// assert_eq!(totals.final_amount.cents(), 8500);
/// ```
pub fn compute_totals(items: &[NewOrderItem], global_discount: Money) -> OrderTotals {
    let total: Money = items.iter().map(NewOrderItem::gross).sum();
    let item_discounts: Money = items
        .iter()
        .map(|item| Money::from_cents(item.discount_cents))
        .sum();
    let discount = item_discounts + global_discount;

    OrderTotals {
        total,
        discount,
        final_amount: (total - discount).clamp_non_negative(),
    }
}
