//! # Billing Repository
//!
//! Appointments, quotes, invoices and payment records. These tables belong
//! to the scheduling and billing subsystems; the POS reads their links and
//! patches `billing_status`, `pos_order_id`, invoice `status` and
//! `payment_records`.
//!
//! ## Links Followed From an Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders.id ◄── appointments.pos_order_id                               │
//! │                    │                                                    │
//! │                    ├── invoices.appointment_id        (own invoice)    │
//! │                    ├── quotes.invoice_id via quote_id (quote invoice)  │
//! │                    └── invoice_lines.appointment_id   (first line)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pawpos_core::settlement::InvoiceLinks;
use pawpos_core::{
    Appointment, BillingStatus, Invoice, InvoiceStatus, PaymentMethod, PaymentRecord, QuoteItem,
    Service,
};

const APPOINTMENT_COLUMNS: &str = "id, customer_id, pet_name, quote_id, billing_status, pos_order_id";

// =============================================================================
// Appointments
// =============================================================================

/// Gets an appointment by ID.
pub async fn get_appointment(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    let appointment = sqlx::query_as::<_, Appointment>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(appointment)
}

/// The appointment checked out by an order, if any.
pub async fn appointment_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Option<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE pos_order_id = ?1 ORDER BY rowid LIMIT 1"
    );
    let appointment = sqlx::query_as::<_, Appointment>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(appointment)
}

/// Points an appointment at the order that checks it out.
///
/// ## Returns
/// * `Err(DbError::NotFound)` - unknown appointment
pub async fn link_order(
    conn: &mut SqliteConnection,
    appointment_id: &str,
    order_id: &str,
) -> DbResult<()> {
    debug!(appointment_id = %appointment_id, order_id = %order_id, "Linking appointment to order");

    let result = sqlx::query("UPDATE appointments SET pos_order_id = ?1 WHERE id = ?2")
        .bind(order_id)
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Appointment", appointment_id));
    }

    Ok(())
}

/// Sets an appointment's billing status.
pub async fn set_billing_status(
    conn: &mut SqliteConnection,
    appointment_id: &str,
    status: BillingStatus,
) -> DbResult<()> {
    debug!(appointment_id = %appointment_id, status = ?status, "Updating billing status");

    sqlx::query("UPDATE appointments SET billing_status = ?1 WHERE id = ?2")
        .bind(status)
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Services booked on an appointment, in booking order.
pub async fn appointment_services(
    conn: &mut SqliteConnection,
    appointment_id: &str,
) -> DbResult<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        r#"
        SELECT s.id, s.name, s.description, s.base_price_cents, s.duration_minutes,
               s.category, s.deleted_at
        FROM appointment_services a
        JOIN services s ON s.id = a.service_id
        WHERE a.appointment_id = ?1
        ORDER BY a.position, s.name
        "#,
    )
    .bind(appointment_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(services)
}

/// Items of a quote, in quote order.
pub async fn quote_items(conn: &mut SqliteConnection, quote_id: &str) -> DbResult<Vec<QuoteItem>> {
    let items = sqlx::query_as::<_, QuoteItem>(
        r#"
        SELECT id, quote_id, product_id, service_id, description, quantity,
               price_cents, discount_cents
        FROM quote_items
        WHERE quote_id = ?1
        ORDER BY position, rowid
        "#,
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

// =============================================================================
// Invoices
// =============================================================================

/// Gathers every invoice candidate for an appointment.
pub async fn invoice_links(
    conn: &mut SqliteConnection,
    appointment: &Appointment,
) -> DbResult<InvoiceLinks> {
    let own_invoice_id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM invoices WHERE appointment_id = ?1 ORDER BY rowid LIMIT 1",
    )
    .bind(&appointment.id)
    .fetch_optional(&mut *conn)
    .await?;

    let quote_invoice_id: Option<String> = match &appointment.quote_id {
        Some(quote_id) => sqlx::query_scalar::<_, Option<String>>(
            "SELECT invoice_id FROM quotes WHERE id = ?1",
        )
        .bind(quote_id)
        .fetch_optional(&mut *conn)
        .await?
        .flatten(),
        None => None,
    };

    let first_line_invoice_id: Option<String> = sqlx::query_scalar(
        "SELECT invoice_id FROM invoice_lines WHERE appointment_id = ?1 ORDER BY position, rowid LIMIT 1",
    )
    .bind(&appointment.id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(InvoiceLinks {
        own_invoice_id,
        quote_invoice_id,
        first_line_invoice_id,
    })
}

/// Gets an invoice by ID.
pub async fn get_invoice(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>(
        "SELECT id, customer_id, appointment_id, amount_cents, status FROM invoices WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(invoice)
}

/// Sets an invoice's status.
pub async fn set_invoice_status(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    status: InvoiceStatus,
) -> DbResult<()> {
    debug!(invoice_id = %invoice_id, status = ?status, "Updating invoice status");

    sqlx::query("UPDATE invoices SET status = ?1 WHERE id = ?2")
        .bind(status)
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Records a payment against an invoice.
pub async fn insert_payment_record(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    amount_cents: i64,
    method: PaymentMethod,
    order_id: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<PaymentRecord> {
    let record = PaymentRecord {
        id: Uuid::new_v4().to_string(),
        invoice_id: invoice_id.to_string(),
        amount_cents,
        method,
        order_id: order_id.map(str::to_string),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO payment_records (id, invoice_id, amount_cents, method, order_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&record.id)
    .bind(&record.invoice_id)
    .bind(record.amount_cents)
    .bind(record.method)
    .bind(&record.order_id)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(record)
}

/// Σ recorded payments of an invoice.
pub async fn recorded_total(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payment_records WHERE invoice_id = ?1",
    )
    .bind(invoice_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Payment records of an invoice, oldest first.
pub async fn payment_records(
    conn: &mut SqliteConnection,
    invoice_id: &str,
) -> DbResult<Vec<PaymentRecord>> {
    let records = sqlx::query_as::<_, PaymentRecord>(
        r#"
        SELECT id, invoice_id, amount_cents, method, order_id, created_at
        FROM payment_records
        WHERE invoice_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(records)
}

// =============================================================================
// Collaborator Inserts (seed data and tests)
// =============================================================================

pub async fn insert_appointment(
    conn: &mut SqliteConnection,
    id: &str,
    customer_id: &str,
    pet_name: &str,
    quote_id: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO appointments (id, customer_id, pet_name, quote_id, billing_status)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(id)
    .bind(customer_id)
    .bind(pet_name)
    .bind(quote_id)
    .bind(BillingStatus::Unbilled)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_appointment_service(
    conn: &mut SqliteConnection,
    appointment_id: &str,
    service_id: &str,
    position: i64,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO appointment_services (appointment_id, service_id, position) VALUES (?1, ?2, ?3)",
    )
    .bind(appointment_id)
    .bind(service_id)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_quote(
    conn: &mut SqliteConnection,
    id: &str,
    invoice_id: Option<&str>,
) -> DbResult<()> {
    sqlx::query("INSERT INTO quotes (id, invoice_id) VALUES (?1, ?2)")
        .bind(id)
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn insert_quote_item(
    conn: &mut SqliteConnection,
    item: &QuoteItem,
    position: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO quote_items (
            id, quote_id, product_id, service_id, description, quantity,
            price_cents, discount_cents, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.quote_id)
    .bind(&item.product_id)
    .bind(&item.service_id)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.price_cents)
    .bind(item.discount_cents)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_invoice(
    conn: &mut SqliteConnection,
    id: &str,
    customer_id: &str,
    appointment_id: Option<&str>,
    amount_cents: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (id, customer_id, appointment_id, amount_cents, status)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(id)
    .bind(customer_id)
    .bind(appointment_id)
    .bind(amount_cents)
    .bind(InvoiceStatus::Pendente)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_invoice_line(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    appointment_id: &str,
    position: i64,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO invoice_lines (id, invoice_id, appointment_id, position) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(invoice_id)
    .bind(appointment_id)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::customer;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_invoice_links_follow_every_path() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        customer::insert(&mut conn, "c1", "Ana", None).await.unwrap();
        insert_invoice(&mut conn, "inv-quote", "c1", None, 9000).await.unwrap();
        insert_invoice(&mut conn, "inv-line", "c1", None, 9000).await.unwrap();
        insert_quote(&mut conn, "q1", Some("inv-quote")).await.unwrap();
        insert_appointment(&mut conn, "a1", "c1", "Thor", Some("q1")).await.unwrap();
        insert_invoice_line(&mut conn, "inv-line", "a1", 0).await.unwrap();

        let appointment = get_appointment(&mut conn, "a1").await.unwrap().unwrap();
        let links = invoice_links(&mut conn, &appointment).await.unwrap();
        assert_eq!(links.own_invoice_id, None);
        assert_eq!(links.quote_invoice_id.as_deref(), Some("inv-quote"));
        assert_eq!(links.first_line_invoice_id.as_deref(), Some("inv-line"));
        assert_eq!(links.resolve(), Some("inv-quote"));

        insert_invoice(&mut conn, "inv-own", "c1", Some("a1"), 9000).await.unwrap();
        let links = invoice_links(&mut conn, &appointment).await.unwrap();
        assert_eq!(links.resolve(), Some("inv-own"));
    }

    #[tokio::test]
    async fn test_link_unknown_appointment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(matches!(
            link_order(&mut conn, "ghost", "ord-1").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
