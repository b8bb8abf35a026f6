//! # pawpos-core: Pure Business Logic for PawPOS
//!
//! The rules of the grooming shop's point of sale and customer ledger, as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PawPOS Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 API controllers (React front end)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     pawpos-engine: sessions, orders, settlement, ledger         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pawpos-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │ pricing │ │  ledger  │ │settle- │  │   │
//! │  │   │ Order   │ │ Money   │ │ totals  │ │ balance  │ │ ment   │  │   │
//! │  │   │ Payment │ │         │ │         │ │ alerts   │ │ links  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    pawpos-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (CashSession, Order, ledger entries, ...)
//! - [`money`] - Money type with integer arithmetic (centavos)
//! - [`pricing`] - Order totals from line items and discounts
//! - [`ledger`] - Balance replay and the balance alert policy
//! - [`settlement`] - Payment coverage and invoice link precedence
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use pawpos_core::money::Money;
//! use pawpos_core::pricing::compute_totals;
//! use pawpos_core::types::NewOrderItem;
//!
//! let items = vec![NewOrderItem::product("prod-1", "Shampoo", 2, Money::from_cents(5000))];
//! let totals = compute_totals(&items, Money::from_cents(1000));
//!
//! assert_eq!(totals.total.cents(), 10000);
//! assert_eq!(totals.final_amount.cents(), 9000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Catches typos at the counter (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest amount accepted anywhere: unit price, discount, order total,
/// payment, ledger entry and drawer count. R$ 100.000.000,00.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

/// Maximum installments accepted on a single card payment.
pub const MAX_INSTALLMENTS: i32 = 24;

/// Minimum trimmed query length before the POS search touches the catalog.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// Maximum products (and, separately, services) returned by the POS search.
pub const SEARCH_RESULT_LIMIT: i64 = 50;

/// Default page size for the customer transaction history.
pub const DEFAULT_HISTORY_PAGE_SIZE: i64 = 50;

/// Upper bound for any paged read (history, recent orders).
pub const MAX_PAGE_SIZE: i64 = 200;
