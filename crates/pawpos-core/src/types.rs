//! # Domain Types
//!
//! Core domain types used throughout PawPOS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CashSession    │◄──│     Order       │──►│  OrderPayment   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  status         │   │  seq_id         │   │  method         │       │
//! │  │  opening_bal.   │   │  status         │   │  amount_cents   │       │
//! │  └─────────────────┘   │  final_amount   │   └─────────────────┘       │
//! │                        └───────┬─────────┘                              │
//! │                                │ OrderItem (product xor service)        │
//! │                                ▼                                        │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ FinancialTrans. │   │ InventoryMove.  │   │ StaffPayAdjust. │       │
//! │  │ DEBIT / CREDIT  │   │ SALE / RETURN   │   │ POS_PURCHASE    │       │
//! │  │ append-only     │   │ append-only     │   │ POS_REFUND      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Collaborator rows: Customer, Product, Service, Appointment, Invoice,  │
//! │  QuoteItem, PaymentRecord (owned elsewhere, read or patched here)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id` fields are UUID v4 strings
//! - monetary fields are centavos and end in `_cents`; accessor methods
//!   return [`Money`]
//! - enum values are SCREAMING_SNAKE_CASE both on the wire and in SQLite

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cash Session
// =============================================================================

/// Status of the shared cash drawer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashSessionStatus {
    Open,
    Closed,
}

impl fmt::Display for CashSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CashSessionStatus::Open => "OPEN",
            CashSessionStatus::Closed => "CLOSED",
        })
    }
}

/// The drawer window that orders are opened against.
///
/// At most one session is OPEN at any time; sessions are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub status: CashSessionStatus,
    pub opened_by: String,
    pub opening_balance_cents: i64,
    pub closed_by: Option<String>,
    /// Amount counted in the drawer at close.
    pub closing_balance_cents: Option<i64>,
    /// Amount the drawer should hold at close, per the closing policy.
    pub expected_closing_balance_cents: Option<i64>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashSession {
    #[inline]
    pub fn opening_balance(&self) -> Money {
        Money::from_cents(self.opening_balance_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == CashSessionStatus::Open
    }

    /// Counted minus expected; negative means the drawer is short.
    pub fn discrepancy(&self) -> Option<Money> {
        match (self.closing_balance_cents, self.expected_closing_balance_cents) {
            (Some(counted), Some(expected)) => Some(Money::from_cents(counted - expected)),
            _ => None,
        }
    }
}

/// Per-method payment totals inside a cash session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub payment_count: i64,
    pub amount_cents: i64,
}

/// Read-only roll-up of a cash session's activity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSessionSummary {
    pub session: CashSession,
    pub order_count: i64,
    pub paid_count: i64,
    pub cancelled_count: i64,
    /// Σ final_amount of non-cancelled orders.
    pub gross_sales_cents: i64,
    /// Payments of non-cancelled orders grouped by method.
    pub totals_by_method: Vec<MethodTotal>,
}

// =============================================================================
// Order
// =============================================================================

/// Order lifecycle.
///
/// ```text
///   OPEN ──(Σ payments ≥ final)──► PAID
///     │                              │
///     └──────(cancel)──► CANCELLED ◄─┘   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Paid,
    Cancelled,
}

impl OrderStatus {
    /// Payments may still be recorded against the order.
    #[inline]
    pub fn accepts_payments(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    /// The order may still be cancelled.
    #[inline]
    pub fn can_cancel(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        })
    }
}

/// Commercial condition agreed at the counter. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentCondition {
    /// "À vista".
    #[default]
    CashOnDelivery,
    Installments,
    Deferred,
}

/// A POS order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Sequential display number ("PDV #42").
    pub seq_id: i64,
    /// None for walk-in sales.
    pub customer_id: Option<String>,
    pub cash_session_id: String,
    pub seller_id: Option<String>,
    pub payment_condition: PaymentCondition,
    pub status: OrderStatus,
    /// Σ unit_price × quantity.
    pub total_amount_cents: i64,
    /// Σ item discounts + global discount.
    pub discount_amount_cents: i64,
    /// max(0, total − discount).
    pub final_amount_cents: i64,
    pub return_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_amount_cents)
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn discount_amount(&self) -> Money {
        Money::from_cents(self.discount_amount_cents)
    }
}

/// A line item. Immutable once the order exists.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// quantity × unit_price − discount.
    pub total_price_cents: i64,
    /// Zero-based position in the original request.
    pub position: i64,
}

impl OrderItem {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Tender types accepted at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Pix,
    PixCpf,
    PixEmail,
    DebitCard,
    CreditCard,
    CreditCardInstallment,
    Deferred,
    Future,
    AccountCredit,
    /// Deducted from a staff member's pay.
    PayrollDeduction,
}

impl PaymentMethod {
    /// Wire/database spelling, also used in ledger descriptions.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Pix => "PIX",
            PaymentMethod::PixCpf => "PIX_CPF",
            PaymentMethod::PixEmail => "PIX_EMAIL",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::CreditCardInstallment => "CREDIT_CARD_INSTALLMENT",
            PaymentMethod::Deferred => "DEFERRED",
            PaymentMethod::Future => "FUTURE",
            PaymentMethod::AccountCredit => "ACCOUNT_CREDIT",
            PaymentMethod::PayrollDeduction => "PAYROLL_DEDUCTION",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment applied to an order. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderPayment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub installments: i64,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl OrderPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Direction of a ledger entry. DEBIT raises the customer balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    /// The entry type that cancels this one.
    #[inline]
    pub fn opposite(&self) -> EntryType {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerCategory {
    Quote,
    Payment,
    #[default]
    Adjustment,
    Discount,
    Penalty,
    /// Point-of-sale entries.
    Pdv,
}

/// One immutable line of a customer's ledger.
///
/// `Customer.balance_cents == Σ DEBIT − Σ CREDIT` holds after every commit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FinancialTransaction {
    pub id: String,
    pub customer_id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Always positive; the direction lives in `entry_type`.
    pub amount_cents: i64,
    pub category: LedgerCategory,
    pub description: String,
    pub notes: Option<String>,
    pub related_quote_id: Option<String>,
    pub related_invoice_id: Option<String>,
    pub related_order_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl FinancialTransaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Request to book a ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLedgerEntry {
    pub customer_id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount_cents: i64,
    #[serde(default)]
    pub category: LedgerCategory,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub related_quote_id: Option<String>,
    #[serde(default)]
    pub related_invoice_id: Option<String>,
    #[serde(default)]
    pub related_order_id: Option<String>,
    pub created_by: String,
}

impl NewLedgerEntry {
    /// A PDV-category entry tied to an order.
    pub fn pdv(
        customer_id: impl Into<String>,
        entry_type: EntryType,
        amount: Money,
        description: impl Into<String>,
        order_id: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        NewLedgerEntry {
            customer_id: customer_id.into(),
            entry_type,
            amount_cents: amount.cents(),
            category: LedgerCategory::Pdv,
            description: description.into(),
            notes: None,
            related_quote_id: None,
            related_invoice_id: None,
            related_order_id: Some(order_id.into()),
            created_by: created_by.into(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_invoice(mut self, invoice_id: Option<String>) -> Self {
        self.related_invoice_id = invoice_id;
        self
    }

    /// Compensating entry for `original`: opposite type, same amount,
    /// category and links, description prefixed with "ESTORNO: ".
    pub fn reversal_of(
        original: &FinancialTransaction,
        reason: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        NewLedgerEntry {
            customer_id: original.customer_id.clone(),
            entry_type: original.entry_type.opposite(),
            amount_cents: original.amount_cents,
            category: original.category,
            description: crate::settlement::reversal_description(&original.description),
            notes: Some(reason.into()),
            related_quote_id: original.related_quote_id.clone(),
            related_invoice_id: original.related_invoice_id.clone(),
            related_order_id: original.related_order_id.clone(),
            created_by: created_by.into(),
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Filters for the transaction history read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryFilter {
    #[serde(default, rename = "type")]
    pub entry_type: Option<EntryType>,
    #[serde(default)]
    pub category: Option<LedgerCategory>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub take: Option<i64>,
}

/// One page of ledger history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionPage {
    pub transactions: Vec<FinancialTransaction>,
    pub total: i64,
    pub has_more: bool,
}

/// Cached balance versus the balance replayed from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceDrift {
    pub customer_id: String,
    pub cached_cents: i64,
    pub replayed_cents: i64,
}

impl BalanceDrift {
    #[inline]
    pub fn has_drift(&self) -> bool {
        self.cached_cents != self.replayed_cents
    }
}

// =============================================================================
// Alerts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Warning,
    Critical,
}

/// A balance alert. At most one active alert per type and customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerAlert {
    pub id: String,
    pub customer_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub is_active: bool,
    pub title: String,
    pub message: String,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Sale,
    Return,
    Adjustment,
    Purchase,
}

/// One stock change. `Product.stock` is the running total of these.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Signed: negative for SALE, positive for RETURN.
    pub quantity: i64,
    pub order_id: Option<String>,
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payroll
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentDirection {
    /// Reduces net pay.
    Debit,
    /// Increases net pay.
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentKind {
    PosPurchase,
    PosRefund,
}

/// Payroll adjustment produced by a PAYROLL_DEDUCTION payment or its reversal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StaffPayAdjustment {
    pub id: String,
    pub staff_id: String,
    /// None until payroll assigns the adjustment to a period.
    pub pay_period_id: Option<String>,
    pub direction: AdjustmentDirection,
    pub kind: AdjustmentKind,
    pub amount_cents: i64,
    pub order_id: Option<String>,
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Collaborator Rows
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Cached Σ DEBIT − Σ CREDIT.
    pub balance_cents: i64,
    /// Login account; a customer is staff when this matches a staff profile.
    pub user_id: Option<String>,
}

impl Customer {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub sku: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub base_price_cents: i64,
    pub duration_minutes: Option<i64>,
    pub category: Option<String>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Service {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingStatus {
    Unbilled,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Appointment {
    pub id: String,
    pub customer_id: String,
    pub pet_name: String,
    pub quote_id: Option<String>,
    pub billing_status: BillingStatus,
    pub pos_order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct QuoteItem {
    pub id: String,
    pub quote_id: String,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub discount_cents: i64,
}

/// Invoice status, spelled as the billing subsystem stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Pendente,
    Pago,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    pub appointment_id: Option<String>,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
}

impl Invoice {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentRecord {
    pub id: String,
    pub invoice_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

/// A requested line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

impl NewOrderItem {
    pub fn product(
        product_id: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        NewOrderItem {
            product_id: Some(product_id.into()),
            service_id: None,
            description: description.into(),
            quantity,
            unit_price_cents: unit_price.cents(),
            discount_cents: 0,
        }
    }

    pub fn service(
        service_id: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        NewOrderItem {
            product_id: None,
            service_id: Some(service_id.into()),
            description: description.into(),
            quantity,
            unit_price_cents: unit_price.cents(),
            discount_cents: 0,
        }
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount_cents = discount.cents();
        self
    }

    /// quantity × unit_price before the line discount.
    #[inline]
    pub fn gross(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// quantity × unit_price − discount.
    #[inline]
    pub fn net(&self) -> Money {
        self.gross() - Money::from_cents(self.discount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub cash_session_id: String,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub payment_condition: Option<PaymentCondition>,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub global_discount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayment {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    #[serde(default = "default_installments")]
    pub installments: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_installments() -> i64 {
    1
}

impl NewPayment {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        NewPayment {
            method,
            amount_cents: amount.cents(),
            installments: 1,
            notes: None,
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Responses
// =============================================================================

/// An order with its items, payments and payment position.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<OrderPayment>,
    pub total_paid_cents: i64,
    /// max(0, final − paid).
    pub remaining_cents: i64,
}

impl OrderDetails {
    pub fn new(order: Order, items: Vec<OrderItem>, payments: Vec<OrderPayment>) -> Self {
        let total_paid: Money = payments.iter().map(OrderPayment::amount).sum();
        let remaining = (order.final_amount() - total_paid).clamp_non_negative();
        OrderDetails {
            order,
            items,
            payments,
            total_paid_cents: total_paid.cents(),
            remaining_cents: remaining.cents(),
        }
    }
}

/// Catalog matches for the POS item picker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PosSearchResults {
    pub products: Vec<Product>,
    pub services: Vec<Service>,
}

impl PosSearchResults {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.services.is_empty()
    }
}

/// Pre-filled checkout built from an appointment and its quote.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutDraft {
    pub appointment_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub pet_name: String,
    pub items: Vec<NewOrderItem>,
}

/// What the settlement step changed when an order became PAID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementReport {
    pub order_id: String,
    pub appointment_id: Option<String>,
    pub invoice_id: Option<String>,
    pub invoice_marked_paid: bool,
    pub stock_movements: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_wire_format() {
        let json = serde_json::to_string(&PaymentMethod::CreditCardInstallment).unwrap();
        assert_eq!(json, "\"CREDIT_CARD_INSTALLMENT\"");

        let parsed: PaymentMethod = serde_json::from_str("\"PAYROLL_DEDUCTION\"").unwrap();
        assert_eq!(parsed, PaymentMethod::PayrollDeduction);
        assert_eq!(parsed.to_string(), "PAYROLL_DEDUCTION");
    }

    #[test]
    fn test_invoice_status_wire_format() {
        assert_eq!(serde_json::to_string(&InvoiceStatus::Pago).unwrap(), "\"PAGO\"");
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Pendente).unwrap(),
            "\"PENDENTE\""
        );
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Open.accepts_payments());
        assert!(OrderStatus::Paid.accepts_payments());
        assert!(!OrderStatus::Cancelled.accepts_payments());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_entry_type_opposite() {
        assert_eq!(EntryType::Debit.opposite(), EntryType::Credit);
        assert_eq!(EntryType::Credit.opposite(), EntryType::Debit);
    }

    #[test]
    fn test_new_payment_defaults() {
        let payment: NewPayment =
            serde_json::from_str(r#"{"method":"PIX","amount_cents":4000}"#).unwrap();
        assert_eq!(payment.installments, 1);
        assert!(payment.notes.is_none());
    }

    #[test]
    fn test_ledger_entry_type_field_name() {
        let entry = NewLedgerEntry::pdv(
            "cus-1",
            EntryType::Debit,
            Money::from_cents(9000),
            "Compra PDV #1",
            "ord-1",
            "user-1",
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "DEBIT");
        assert_eq!(json["category"], "PDV");
    }

    #[test]
    fn test_reversal_mirrors_original() {
        let original = FinancialTransaction {
            id: "tx-1".into(),
            customer_id: "cus-1".into(),
            entry_type: EntryType::Credit,
            amount_cents: 4000,
            category: LedgerCategory::Pdv,
            description: "Pagamento PDV #7 (PIX)".into(),
            notes: None,
            related_quote_id: None,
            related_invoice_id: Some("inv-1".into()),
            related_order_id: Some("ord-1".into()),
            created_by: "user-1".into(),
            created_at: Utc::now(),
        };

        let reversal = NewLedgerEntry::reversal_of(&original, "cliente desistiu", "manager-1");
        assert_eq!(reversal.entry_type, EntryType::Debit);
        assert_eq!(reversal.amount_cents, 4000);
        assert_eq!(reversal.description, "ESTORNO: Pagamento PDV #7 (PIX)");
        assert_eq!(reversal.notes.as_deref(), Some("cliente desistiu"));
        assert_eq!(reversal.related_invoice_id.as_deref(), Some("inv-1"));
        assert_eq!(reversal.related_order_id.as_deref(), Some("ord-1"));
        assert_eq!(reversal.created_by, "manager-1");
    }

    #[test]
    fn test_order_item_net() {
        let item = NewOrderItem::product("p1", "Shampoo", 2, Money::from_cents(5000))
            .with_discount(Money::from_cents(1000));
        assert_eq!(item.gross().cents(), 10000);
        assert_eq!(item.net().cents(), 9000);
    }

    #[test]
    fn test_order_details_remaining_never_negative() {
        let now = Utc::now();
        let order = Order {
            id: "ord-1".into(),
            seq_id: 1,
            customer_id: None,
            cash_session_id: "cs-1".into(),
            seller_id: None,
            payment_condition: PaymentCondition::default(),
            status: OrderStatus::Paid,
            total_amount_cents: 9000,
            discount_amount_cents: 0,
            final_amount_cents: 9000,
            return_reason: None,
            created_at: now,
            updated_at: now,
            paid_at: Some(now),
            cancelled_at: None,
        };
        let payment = OrderPayment {
            id: "pay-1".into(),
            order_id: "ord-1".into(),
            method: PaymentMethod::Cash,
            amount_cents: 10000,
            installments: 1,
            paid_at: now,
            notes: None,
        };

        let details = OrderDetails::new(order, vec![], vec![payment]);
        assert_eq!(details.total_paid_cents, 10000);
        assert_eq!(details.remaining_cents, 0);
    }

    #[test]
    fn test_cash_session_discrepancy() {
        let now = Utc::now();
        let session = CashSession {
            id: "cs-1".into(),
            status: CashSessionStatus::Closed,
            opened_by: "u1".into(),
            opening_balance_cents: 10000,
            closed_by: Some("u1".into()),
            closing_balance_cents: Some(14500),
            expected_closing_balance_cents: Some(15000),
            notes: None,
            opened_at: now,
            closed_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(session.discrepancy(), Some(Money::from_cents(-500)));
        assert!(!session.is_open());
    }
}
