//! # Repository Module
//!
//! SQL for every table the POS touches, one module per area.
//!
//! ## Repository Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Functions Over a Borrowed Connection                  │
//! │                                                                         │
//! │  pawpos-engine                                                         │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       │  customer::apply_balance_delta(&mut tx, id, -9000).await?;     │
//! │       │  ledger::insert_transaction(&mut tx, &entry, now).await?;      │
//! │       │  tx.commit().await?;                                           │
//! │       ▼                                                                 │
//! │  repository::<area>::<fn>(conn: &mut SqliteConnection, ...)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  A `Transaction` and a pooled connection both deref to                 │
//! │  `SqliteConnection`, so the same function serves single reads and      │
//! │  multi-table units of work.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`cash_session`] - Drawer sessions and their per-method totals
//! - [`order`] - Orders, items, payments and sequential numbering
//! - [`customer`] - Cached balances and staff links
//! - [`ledger`] - Financial transactions and customer alerts
//! - [`inventory`] - Stock and movement history
//! - [`catalog`] - Product and service lookup
//! - [`billing`] - Appointments, quotes, invoices, payment records
//! - [`payroll`] - Staff pay adjustments

pub mod billing;
pub mod cash_session;
pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod payroll;
