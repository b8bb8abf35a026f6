//! # Ledger Engine
//!
//! Debit/credit entries against a customer, the cached running balance and
//! the balance alerts derived from it.
//!
//! ## Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  customers.balance_cents == Σ DEBIT − Σ CREDIT   (after every commit)  │
//! │                                                                         │
//! │  record_entry(conn, entry):                                            │
//! │    1. UPDATE customers SET balance = balance ± amount RETURNING        │
//! │    2. INSERT financial_transactions                                    │
//! │    3. evaluate_alerts(new balance)                                     │
//! │                                                                         │
//! │  Steps 1-3 share the caller's transaction: an order's DEBIT commits    │
//! │  or rolls back together with the order itself.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use pawpos_core::ledger::{
    alert_message, alert_title, balance_delta, plan_alerts, AlertBand, AlertPlan, AlertThresholds,
};
use pawpos_core::validation::{normalize_page_size, normalize_skip, validate_ledger_entry};
use pawpos_core::{
    BalanceDrift, CustomerAlert, FinancialTransaction, HistoryFilter, Money, NewLedgerEntry,
    TransactionPage, DEFAULT_HISTORY_PAGE_SIZE, MAX_PAGE_SIZE,
};
use pawpos_db::repository::{customer, ledger as ledger_repo};

use crate::error::EngineResult;
use crate::{PosEngine, SYSTEM_ACTOR};

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Books an entry, moves the cached balance and re-evaluates alerts.
///
/// ## Returns
/// * `Err(Validation)` - amount ≤ 0, blank description or actor
/// * `Err(NotFound)` - unknown customer
pub async fn record_entry(
    conn: &mut SqliteConnection,
    entry: &NewLedgerEntry,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> EngineResult<FinancialTransaction> {
    validate_ledger_entry(entry)?;

    let delta = balance_delta(entry.entry_type, entry.amount());
    let balance = customer::apply_balance_delta(conn, &entry.customer_id, delta.cents()).await?;
    let transaction = ledger_repo::insert_transaction(conn, entry, now).await?;

    evaluate_alerts(
        conn,
        &entry.customer_id,
        Money::from_cents(balance),
        thresholds,
        &entry.created_by,
        now,
    )
    .await?;

    Ok(transaction)
}

/// Brings the customer's active alerts in line with `balance`.
///
/// Idempotent: evaluating the same balance twice changes nothing the
/// second time.
pub async fn evaluate_alerts(
    conn: &mut SqliteConnection,
    customer_id: &str,
    balance: Money,
    thresholds: &AlertThresholds,
    actor: &str,
    now: DateTime<Utc>,
) -> EngineResult<AlertPlan> {
    let active = ledger_repo::active_alert_types(conn, customer_id).await?;
    let plan = plan_alerts(AlertBand::classify(balance, thresholds), &active);

    for alert_type in &plan.resolve {
        ledger_repo::resolve_alerts(conn, customer_id, *alert_type, actor, now).await?;
        info!(customer_id = %customer_id, alert_type = ?alert_type, "Balance alert resolved");
    }

    if let Some(alert_type) = plan.create {
        let message = alert_message(alert_type, balance);
        ledger_repo::insert_alert(
            conn,
            customer_id,
            alert_type,
            alert_title(alert_type),
            &message,
            actor,
            now,
        )
        .await?;
        warn!(
            customer_id = %customer_id,
            alert_type = ?alert_type,
            balance = %balance,
            "Balance alert raised"
        );
    }

    Ok(plan)
}

async fn drift_of(conn: &mut SqliteConnection, customer_id: &str) -> EngineResult<BalanceDrift> {
    let cached = customer::require(conn, customer_id).await?;
    let replayed = ledger_repo::replay_balance(conn, customer_id).await?;

    Ok(BalanceDrift {
        customer_id: customer_id.to_string(),
        cached_cents: cached.balance_cents,
        replayed_cents: replayed,
    })
}

// =============================================================================
// PosEngine Ledger API
// =============================================================================

impl PosEngine {
    /// Books a standalone ledger entry (adjustment, discount, penalty, ...).
    pub async fn create_transaction(&self, entry: NewLedgerEntry) -> EngineResult<FinancialTransaction> {
        validate_ledger_entry(&entry)?;

        let mut tx = self.begin().await?;
        let transaction =
            record_entry(&mut tx, &entry, &self.config.alert_thresholds, Utc::now()).await?;
        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            customer_id = %transaction.customer_id,
            entry_type = ?transaction.entry_type,
            category = ?transaction.category,
            amount = %transaction.amount(),
            "Ledger entry recorded"
        );

        Ok(transaction)
    }

    /// Balance replayed from the full ledger (Σ DEBIT − Σ CREDIT).
    pub async fn calculate_balance(&self, customer_id: &str) -> EngineResult<Money> {
        let mut conn = self.acquire().await?;
        customer::require(&mut conn, customer_id).await?;
        let replayed = ledger_repo::replay_balance(&mut conn, customer_id).await?;
        Ok(Money::from_cents(replayed))
    }

    /// Replays the ledger and overwrites the cached balance.
    pub async fn sync_balance(&self, customer_id: &str) -> EngineResult<Money> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        // Zero delta: takes the write lock and proves the customer exists.
        let cached = customer::apply_balance_delta(&mut tx, customer_id, 0).await?;
        let replayed = ledger_repo::replay_balance(&mut tx, customer_id).await?;

        if cached != replayed {
            customer::set_balance(&mut tx, customer_id, replayed).await?;
            warn!(
                customer_id = %customer_id,
                cached_cents = cached,
                replayed_cents = replayed,
                "Cached balance drifted, overwritten"
            );
        }

        let balance = Money::from_cents(replayed);
        evaluate_alerts(
            &mut tx,
            customer_id,
            balance,
            &self.config.alert_thresholds,
            SYSTEM_ACTOR,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(balance)
    }

    /// One page of a customer's ledger, newest first.
    pub async fn get_transaction_history(
        &self,
        customer_id: &str,
        filter: HistoryFilter,
    ) -> EngineResult<TransactionPage> {
        let take = normalize_page_size(filter.take, DEFAULT_HISTORY_PAGE_SIZE, MAX_PAGE_SIZE);
        let skip = normalize_skip(filter.skip);

        let mut conn = self.acquire().await?;
        customer::require(&mut conn, customer_id).await?;

        let transactions = ledger_repo::list_transactions(
            &mut conn,
            customer_id,
            filter.entry_type,
            filter.category,
            skip,
            take,
        )
        .await?;
        let total =
            ledger_repo::count_transactions(&mut conn, customer_id, filter.entry_type, filter.category)
                .await?;

        let has_more = skip + (transactions.len() as i64) < total;
        Ok(TransactionPage {
            transactions,
            total,
            has_more,
        })
    }

    /// Active WARNING / CRITICAL alerts of a customer.
    pub async fn active_alerts(&self, customer_id: &str) -> EngineResult<Vec<CustomerAlert>> {
        let mut conn = self.acquire().await?;
        customer::require(&mut conn, customer_id).await?;
        Ok(ledger_repo::active_alerts(&mut conn, customer_id).await?)
    }

    /// Cached versus replayed balance of one customer.
    pub async fn balance_drift(&self, customer_id: &str) -> EngineResult<BalanceDrift> {
        let mut conn = self.acquire().await?;
        drift_of(&mut conn, customer_id).await
    }

    /// Every customer whose cached balance disagrees with the ledger.
    pub async fn drifted_balances(&self) -> EngineResult<Vec<BalanceDrift>> {
        let mut conn = self.acquire().await?;
        let mut drifted = Vec::new();

        for customer_id in customer::list_ids(&mut conn).await? {
            let drift = drift_of(&mut conn, &customer_id).await?;
            if drift.has_drift() {
                drifted.push(drift);
            }
        }

        Ok(drifted)
    }

    /// Repairs every drifted balance and returns what was found.
    pub async fn reconcile_all(&self) -> EngineResult<Vec<BalanceDrift>> {
        let drifted = self.drifted_balances().await?;

        for drift in &drifted {
            self.sync_balance(&drift.customer_id).await?;
        }

        info!(repaired = drifted.len(), "Balance reconciliation finished");
        Ok(drifted)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
