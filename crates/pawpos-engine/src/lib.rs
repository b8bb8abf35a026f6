//! # pawpos-engine: POS + Ledger Orchestration
//!
//! Keeps customer balances, order payment state, invoice status, stock and
//! the cash drawer session consistent with each other.
//!
//! ## Module Organization
//! ```text
//! pawpos_engine/
//! ├── lib.rs           ◄─── You are here (PosEngine facade)
//! ├── cash_session.rs  ◄─── open / close / summary of the drawer
//! ├── order.rs         ◄─── create / pay / cancel / details
//! ├── settlement.rs    ◄─── side effects of PAID and their reversal
//! ├── ledger.rs        ◄─── entries, balances, alerts, reconciliation
//! ├── inventory.rs     ◄─── stock + movement history
//! ├── search.rs        ◄─── POS item picker
//! ├── checkout.rs      ◄─── draft order from an appointment
//! ├── config.rs        ◄─── EngineConfig from environment
//! ├── error.rs         ◄─── EngineError, ErrorCode, ErrorBody
//! └── telemetry.rs     ◄─── tracing subscriber for binaries
//! ```
//!
//! ## Units of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Operation = One Transaction                     │
//! │                                                                         │
//! │  add_payment(order_id, payments)                                       │
//! │     │                                                                   │
//! │     │  tokio::time::timeout(settlement_timeout, ...)                   │
//! │     ▼                                                                   │
//! │  BEGIN                                                                  │
//! │   ├─ UPDATE orders SET updated_at  ◄── takes the write lock first      │
//! │   ├─ INSERT order_payments                                             │
//! │   ├─ ledger CREDIT + balance + alerts                                  │
//! │   ├─ payment_records / staff_pay_adjustments                           │
//! │   └─ on full payment: PAID + settlement (appointment, invoice, stock)  │
//! │  COMMIT  (or drop → ROLLBACK on error / deadline)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use pawpos_engine::{EngineConfig, PosEngine};
//!
//! let engine = PosEngine::connect(EngineConfig::load()?).await?;
//! let session = engine.open_session("user-1", Money::from_cents(10000), None).await?;
//! ```

pub mod cash_session;
pub mod checkout;
pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod search;
pub mod settlement;
pub mod telemetry;

#[cfg(test)]
mod test_support;

use std::future::Future;

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, Transaction};
use tracing::{error, info};

use pawpos_db::{Database, DbConfig};

pub use config::{ClosingBalancePolicy, ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, ErrorBody, ErrorCode};

/// Actor recorded on alerts raised by maintenance paths (balance sync).
pub const SYSTEM_ACTOR: &str = "system";

/// The point-of-sale engine.
///
/// Cheap to clone: the database handle is a shared pool.
#[derive(Debug, Clone)]
pub struct PosEngine {
    db: Database,
    config: EngineConfig,
}

impl PosEngine {
    /// Wraps an already-open database.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        PosEngine { db, config }
    }

    /// Opens (and migrates) the database named in the configuration.
    pub async fn connect(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(DbConfig::new(&config.database_path)).await?;
        info!(path = ?config.database_path, "PosEngine connected");
        Ok(PosEngine::new(db, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn acquire(&self) -> EngineResult<PoolConnection<Sqlite>> {
        Ok(self.db.pool().acquire().await?)
    }

    async fn begin(&self) -> EngineResult<Transaction<'static, Sqlite>> {
        Ok(self.db.begin().await?)
    }

    /// Runs a unit of work under the settlement deadline.
    ///
    /// On expiry the unit's future is dropped, which drops its open
    /// transaction and rolls it back.
    async fn with_deadline<T, F>(&self, operation: &'static str, unit: F) -> EngineResult<T>
    where
        F: Future<Output = EngineResult<T>>,
    {
        let deadline = self.config.settlement_timeout;
        match tokio::time::timeout(deadline, unit).await {
            Ok(result) => result,
            Err(_) => {
                error!(operation, timeout = ?deadline, "Unit of work timed out, rolled back");
                Err(EngineError::Timeout {
                    operation: operation.to_string(),
                    seconds: deadline.as_secs(),
                })
            }
        }
    }
}
