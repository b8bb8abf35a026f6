//! # Ledger Repository
//!
//! Financial transactions and customer alerts.
//!
//! ## Write Order Inside a Ledger Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. customer::apply_balance_delta   (takes the write lock)              │
//! │  2. insert_transaction              (append-only)                       │
//! │  3. active_alert_types → plan → insert_alert / resolve_alerts          │
//! │                                                                         │
//! │  All three run on the caller's connection, inside its transaction.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use pawpos_core::{
    AlertType, CustomerAlert, EntryType, FinancialTransaction, LedgerCategory, NewLedgerEntry,
};

const TRANSACTION_COLUMNS: &str = "id, customer_id, entry_type, amount_cents, category, \
     description, notes, related_quote_id, related_invoice_id, related_order_id, \
     created_by, created_at";

const ALERT_COLUMNS: &str = "id, customer_id, alert_type, is_active, title, message, \
     created_by, created_at, resolved_at, resolved_by";

// =============================================================================
// Transactions
// =============================================================================

/// Appends a ledger entry. The caller adjusts the cached balance.
pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    entry: &NewLedgerEntry,
    now: DateTime<Utc>,
) -> DbResult<FinancialTransaction> {
    let transaction = FinancialTransaction {
        id: Uuid::new_v4().to_string(),
        customer_id: entry.customer_id.clone(),
        entry_type: entry.entry_type,
        amount_cents: entry.amount_cents,
        category: entry.category,
        description: entry.description.trim().to_string(),
        notes: entry.notes.clone(),
        related_quote_id: entry.related_quote_id.clone(),
        related_invoice_id: entry.related_invoice_id.clone(),
        related_order_id: entry.related_order_id.clone(),
        created_by: entry.created_by.clone(),
        created_at: now,
    };

    debug!(
        id = %transaction.id,
        customer_id = %transaction.customer_id,
        entry_type = ?transaction.entry_type,
        amount_cents = transaction.amount_cents,
        "Inserting ledger entry"
    );

    sqlx::query(
        r#"
        INSERT INTO financial_transactions (
            id, customer_id, entry_type, amount_cents, category,
            description, notes, related_quote_id, related_invoice_id, related_order_id,
            created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.customer_id)
    .bind(transaction.entry_type)
    .bind(transaction.amount_cents)
    .bind(transaction.category)
    .bind(&transaction.description)
    .bind(&transaction.notes)
    .bind(&transaction.related_quote_id)
    .bind(&transaction.related_invoice_id)
    .bind(&transaction.related_order_id)
    .bind(&transaction.created_by)
    .bind(transaction.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(transaction)
}

/// Σ DEBIT − Σ CREDIT over every entry of the customer.
pub async fn replay_balance(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<i64> {
    let balance: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(CASE entry_type WHEN 'DEBIT' THEN amount_cents ELSE -amount_cents END), 0)
        FROM financial_transactions
        WHERE customer_id = ?1
        "#,
    )
    .bind(customer_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

/// Entries booked against an order, oldest first.
pub async fn transactions_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<FinancialTransaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM financial_transactions \
         WHERE related_order_id = ?1 ORDER BY created_at, rowid"
    );
    let rows = sqlx::query_as::<_, FinancialTransaction>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

fn push_history_filter<'a>(
    builder: &mut QueryBuilder<'a, Sqlite>,
    customer_id: &'a str,
    entry_type: Option<EntryType>,
    category: Option<LedgerCategory>,
) {
    builder.push(" WHERE customer_id = ").push_bind(customer_id);
    if let Some(entry_type) = entry_type {
        builder.push(" AND entry_type = ").push_bind(entry_type);
    }
    if let Some(category) = category {
        builder.push(" AND category = ").push_bind(category);
    }
}

/// One page of a customer's history, newest first.
pub async fn list_transactions(
    conn: &mut SqliteConnection,
    customer_id: &str,
    entry_type: Option<EntryType>,
    category: Option<LedgerCategory>,
    skip: i64,
    take: i64,
) -> DbResult<Vec<FinancialTransaction>> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {TRANSACTION_COLUMNS} FROM financial_transactions"
    ));
    push_history_filter(&mut builder, customer_id, entry_type, category);
    builder
        .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
        .push_bind(take)
        .push(" OFFSET ")
        .push_bind(skip);

    let rows = builder
        .build_query_as::<FinancialTransaction>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

/// Number of entries matching the history filter.
pub async fn count_transactions(
    conn: &mut SqliteConnection,
    customer_id: &str,
    entry_type: Option<EntryType>,
    category: Option<LedgerCategory>,
) -> DbResult<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM financial_transactions");
    push_history_filter(&mut builder, customer_id, entry_type, category);

    let total: i64 = builder
        .build_query_scalar()
        .fetch_one(&mut *conn)
        .await?;

    Ok(total)
}

// =============================================================================
// Alerts
// =============================================================================

/// Types of the customer's active WARNING / CRITICAL alerts.
pub async fn active_alert_types(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Vec<AlertType>> {
    let types = sqlx::query_scalar(
        "SELECT alert_type FROM customer_alerts WHERE customer_id = ?1 AND is_active = 1 ORDER BY rowid",
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(types)
}

/// The customer's active alerts, oldest first.
pub async fn active_alerts(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Vec<CustomerAlert>> {
    let sql = format!(
        "SELECT {ALERT_COLUMNS} FROM customer_alerts \
         WHERE customer_id = ?1 AND is_active = 1 ORDER BY created_at, rowid"
    );
    let alerts = sqlx::query_as::<_, CustomerAlert>(&sql)
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(alerts)
}

/// Every alert of the customer, active or resolved, oldest first.
pub async fn all_alerts(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Vec<CustomerAlert>> {
    let sql = format!(
        "SELECT {ALERT_COLUMNS} FROM customer_alerts WHERE customer_id = ?1 ORDER BY created_at, rowid"
    );
    let alerts = sqlx::query_as::<_, CustomerAlert>(&sql)
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(alerts)
}

/// Inserts an active alert.
pub async fn insert_alert(
    conn: &mut SqliteConnection,
    customer_id: &str,
    alert_type: AlertType,
    title: &str,
    message: &str,
    created_by: &str,
    now: DateTime<Utc>,
) -> DbResult<CustomerAlert> {
    let alert = CustomerAlert {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        alert_type,
        is_active: true,
        title: title.to_string(),
        message: message.to_string(),
        created_by: created_by.to_string(),
        created_at: now,
        resolved_at: None,
        resolved_by: None,
    };

    debug!(customer_id = %customer_id, alert_type = ?alert_type, "Raising balance alert");

    sqlx::query(
        r#"
        INSERT INTO customer_alerts (
            id, customer_id, alert_type, is_active, title, message, created_by, created_at
        ) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&alert.id)
    .bind(&alert.customer_id)
    .bind(alert.alert_type)
    .bind(&alert.title)
    .bind(&alert.message)
    .bind(&alert.created_by)
    .bind(alert.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(alert)
}

/// Resolves the customer's active alerts of one type. Returns rows touched.
pub async fn resolve_alerts(
    conn: &mut SqliteConnection,
    customer_id: &str,
    alert_type: AlertType,
    resolved_by: &str,
    now: DateTime<Utc>,
) -> DbResult<u64> {
    debug!(customer_id = %customer_id, alert_type = ?alert_type, "Resolving balance alerts");

    let result = sqlx::query(
        r#"
        UPDATE customer_alerts
        SET is_active = 0, resolved_at = ?1, resolved_by = ?2
        WHERE customer_id = ?3 AND alert_type = ?4 AND is_active = 1
        "#,
    )
    .bind(now)
    .bind(resolved_by)
    .bind(customer_id)
    .bind(alert_type)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::customer;
    use crate::{Database, DbConfig};
    use pawpos_core::money::Money;

    fn entry(entry_type: EntryType, cents: i64, category: LedgerCategory) -> NewLedgerEntry {
        NewLedgerEntry {
            customer_id: "c1".into(),
            entry_type,
            amount_cents: cents,
            category,
            description: "Ajuste".into(),
            notes: None,
            related_quote_id: None,
            related_invoice_id: None,
            related_order_id: None,
            created_by: "u1".into(),
        }
    }

    #[tokio::test]
    async fn test_replay_and_history_paging() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        customer::insert(&mut conn, "c1", "Ana", None).await.unwrap();

        let now = Utc::now();
        insert_transaction(&mut conn, &entry(EntryType::Debit, 9000, LedgerCategory::Pdv), now)
            .await
            .unwrap();
        insert_transaction(&mut conn, &entry(EntryType::Credit, 4000, LedgerCategory::Pdv), now)
            .await
            .unwrap();
        let last = insert_transaction(
            &mut conn,
            &entry(EntryType::Credit, 1000, LedgerCategory::Payment),
            now,
        )
        .await
        .unwrap();

        assert_eq!(replay_balance(&mut conn, "c1").await.unwrap(), 4000);

        let page = list_transactions(&mut conn, "c1", None, None, 0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, last.id);
        assert_eq!(page[0].amount(), Money::from_cents(1000));

        let credits = count_transactions(&mut conn, "c1", Some(EntryType::Credit), None)
            .await
            .unwrap();
        assert_eq!(credits, 2);

        let pdv_credits = list_transactions(
            &mut conn,
            "c1",
            Some(EntryType::Credit),
            Some(LedgerCategory::Pdv),
            0,
            50,
        )
        .await
        .unwrap();
        assert_eq!(pdv_credits.len(), 1);
    }

    #[tokio::test]
    async fn test_alert_resolution() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        customer::insert(&mut conn, "c1", "Ana", None).await.unwrap();

        let now = Utc::now();
        insert_alert(&mut conn, "c1", AlertType::Warning, "t", "m", "u1", now)
            .await
            .unwrap();
        assert_eq!(
            active_alert_types(&mut conn, "c1").await.unwrap(),
            vec![AlertType::Warning]
        );

        let resolved = resolve_alerts(&mut conn, "c1", AlertType::Warning, "u2", now)
            .await
            .unwrap();
        assert_eq!(resolved, 1);
        assert!(active_alerts(&mut conn, "c1").await.unwrap().is_empty());

        let history = all_alerts(&mut conn, "c1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].resolved_by.as_deref(), Some("u2"));
    }
}
