//! # Validation Module
//!
//! Input validation for PawPOS requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end (TypeScript, generated types)                      │
//! │  └── Shape of the request                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rules, checked before any write                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK constraints (amount > 0, quantity > 0)                      │
//! │  ├── UNIQUE (seq_id, single OPEN session)                              │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pawpos_core::money::Money;
//! use pawpos_core::types::{NewPayment, PaymentMethod};
//! use pawpos_core::validation::validate_payments;
//!
//! let batch = vec![NewPayment::new(PaymentMethod::Pix, Money::from_cents(4000))];
//! assert!(validate_payments(&batch).is_ok());
//! assert!(validate_payments(&[]).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{NewLedgerEntry, NewOrder, NewOrderItem, NewPayment};
use crate::{
    MAX_AMOUNT_CENTS, MAX_INSTALLMENTS, MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS, MIN_SEARCH_QUERY_LEN,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_DESCRIPTION_LEN: usize = 200;
const MAX_REASON_LEN: usize = 500;

// =============================================================================
// Field Validators
// =============================================================================

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn non_negative(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    within_limit(field, 0, cents)
}

fn positive(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    within_limit(field, 1, cents)
}

fn within_limit(field: &str, min: i64, cents: i64) -> ValidationResult<()> {
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Validates a drawer amount (opening or counted closing balance).
///
/// ## Example
/// ```rust
/// use pawpos_core::validation::validate_drawer_amount;
///
/// assert!(validate_drawer_amount("opening_balance", 0).is_ok());
/// assert!(validate_drawer_amount("opening_balance", -1).is_err());
/// ```
pub fn validate_drawer_amount(field: &str, cents: i64) -> ValidationResult<()> {
    non_negative(field, cents)
}

/// Validates a free-text cancellation reason.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    required("reason", reason)?;
    max_len("reason", reason, MAX_REASON_LEN)
}

/// Validates an actor id (who opened, closed, cancelled).
pub fn validate_actor(field: &str, actor_id: &str) -> ValidationResult<()> {
    required(field, actor_id)
}

// =============================================================================
// Orders
// =============================================================================

/// Validates one requested line item.
///
/// ## Rules
/// - quantity in 1..=999
/// - unit price and discount in 0..=MAX_AMOUNT_CENTS
/// - at most one of product_id / service_id
/// - description present, at most 200 characters
pub fn validate_order_item(item: &NewOrderItem) -> ValidationResult<()> {
    required("item description", &item.description)?;
    max_len("item description", &item.description, MAX_DESCRIPTION_LEN)?;

    if item.quantity < 1 || item.quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    non_negative("unit price", item.unit_price_cents)?;
    non_negative("item discount", item.discount_cents)?;

    if item.product_id.is_some() && item.service_id.is_some() {
        return Err(ValidationError::MutuallyExclusive {
            first: "product_id".to_string(),
            second: "service_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a create-order request.
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    required("cash_session_id", &order.cash_session_id)?;

    if order.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if order.items.len() > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    for item in &order.items {
        validate_order_item(item)?;
    }

    let gross = order
        .items
        .iter()
        .fold(0i64, |sum, item| sum.saturating_add(item.gross().cents()));
    within_limit("order total", 0, gross)?;

    non_negative("global discount", order.global_discount_cents)
}

// =============================================================================
// Payments
// =============================================================================

/// Validates a payment batch. Every payment is checked before any is applied.
pub fn validate_payments(payments: &[NewPayment]) -> ValidationResult<()> {
    if payments.is_empty() {
        return Err(ValidationError::Required {
            field: "payments".to_string(),
        });
    }

    for payment in payments {
        positive("payment amount", payment.amount_cents)?;

        if payment.installments < 1 || payment.installments > i64::from(MAX_INSTALLMENTS) {
            return Err(ValidationError::OutOfRange {
                field: "installments".to_string(),
                min: 1,
                max: i64::from(MAX_INSTALLMENTS),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Ledger
// =============================================================================

/// Validates a ledger entry request.
pub fn validate_ledger_entry(entry: &NewLedgerEntry) -> ValidationResult<()> {
    required("customer_id", &entry.customer_id)?;
    positive("amount", entry.amount_cents)?;
    required("description", &entry.description)?;
    max_len("description", &entry.description, MAX_DESCRIPTION_LEN)?;
    required("created_by", &entry.created_by)
}

// =============================================================================
// Reads
// =============================================================================

/// Clamps a requested page size into `1..=max`, using `default` when absent.
///
/// ## Example
/// ```rust
/// use pawpos_core::validation::normalize_page_size;
///
/// assert_eq!(normalize_page_size(None, 50, 200), 50);
/// assert_eq!(normalize_page_size(Some(500), 50, 200), 200);
/// assert_eq!(normalize_page_size(Some(0), 50, 200), 1);
/// ```
pub fn normalize_page_size(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

/// Negative offsets read as zero.
pub fn normalize_skip(requested: Option<i64>) -> i64 {
    requested.unwrap_or(0).max(0)
}

/// Trims a POS search query; `None` when it is too short to search.
///
/// ## Example
/// ```rust
/// use pawpos_core::validation::normalize_search_query;
///
/// assert_eq!(normalize_search_query("  ba "), Some("ba".to_string()));
/// assert_eq!(normalize_search_query(" b "), None);
/// ```
pub fn normalize_search_query(query: &str) -> Option<String> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_QUERY_LEN {
        None
    } else {
        Some(query.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
