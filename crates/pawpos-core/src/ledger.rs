//! # Ledger Rules
//!
//! Balance arithmetic and the balance alert policy. The database layer
//! stores entries; this module decides what they mean.
//!
//! ## Balance Bands
//! ```text
//!   balance (centavos)
//!   ─────────────────────────────────────────────────────────────────►
//!          CRITICAL          │        WARNING         │    CLEAR
//!                            │                        │
//!                    critical (−100000)       warning (−50000)
//!
//!   CRITICAL: one active CRITICAL alert, active WARNING resolved
//!   WARNING:  one active WARNING alert, active CRITICAL resolved
//!   CLEAR:    every active WARNING / CRITICAL resolved
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{AlertType, EntryType};

// =============================================================================
// Balance
// =============================================================================

/// Signed effect of an entry on the customer balance.
///
/// ## Example
/// ```rust
/// use pawpos_core::ledger::balance_delta;
/// use pawpos_core::money::Money;
/// use pawpos_core::types::EntryType;
///
/// assert_eq!(balance_delta(EntryType::Debit, Money::from_cents(900)).cents(), 900);
/// assert_eq!(balance_delta(EntryType::Credit, Money::from_cents(900)).cents(), -900);
/// ```
#[inline]
pub fn balance_delta(entry_type: EntryType, amount: Money) -> Money {
    match entry_type {
        EntryType::Debit => amount,
        EntryType::Credit => -amount,
    }
}

/// Replays a sequence of entries into a balance (Σ DEBIT − Σ CREDIT).
pub fn replay<I>(entries: I) -> Money
where
    I: IntoIterator<Item = (EntryType, Money)>,
{
    entries
        .into_iter()
        .map(|(entry_type, amount)| balance_delta(entry_type, amount))
        .sum()
}

// =============================================================================
// Alert Policy
// =============================================================================

/// Balance thresholds, both strict lower bounds in centavos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Balances strictly below this raise a WARNING.
    pub warning: Money,
    /// Balances strictly below this raise a CRITICAL.
    pub critical: Money,
}

impl AlertThresholds {
    pub const DEFAULT_WARNING_CENTS: i64 = -50_000;
    pub const DEFAULT_CRITICAL_CENTS: i64 = -100_000;

    pub fn new(warning: Money, critical: Money) -> Self {
        AlertThresholds { warning, critical }
    }

    /// Thresholds are usable only when CRITICAL sits at or below WARNING.
    pub fn is_ordered(&self) -> bool {
        self.critical <= self.warning
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        AlertThresholds {
            warning: Money::from_cents(Self::DEFAULT_WARNING_CENTS),
            critical: Money::from_cents(Self::DEFAULT_CRITICAL_CENTS),
        }
    }
}

/// Where a balance falls relative to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertBand {
    Clear,
    Warning,
    Critical,
}

impl AlertBand {
    pub fn classify(balance: Money, thresholds: &AlertThresholds) -> Self {
        if balance < thresholds.critical {
            AlertBand::Critical
        } else if balance < thresholds.warning {
            AlertBand::Warning
        } else {
            AlertBand::Clear
        }
    }

    /// The alert type that must be active in this band, if any.
    pub fn required_alert(&self) -> Option<AlertType> {
        match self {
            AlertBand::Clear => None,
            AlertBand::Warning => Some(AlertType::Warning),
            AlertBand::Critical => Some(AlertType::Critical),
        }
    }
}

/// Changes needed to bring a customer's active alerts in line with a band.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertPlan {
    pub create: Option<AlertType>,
    pub resolve: Vec<AlertType>,
}

impl AlertPlan {
    pub fn is_noop(&self) -> bool {
        self.create.is_none() && self.resolve.is_empty()
    }
}

/// Plans alert changes given the band and the currently active alert types.
///
/// Running the plan and planning again yields a no-op, so repeated
/// evaluation never produces duplicates.
///
/// ## Example
/// ```rust
/// use pawpos_core::ledger::{plan_alerts, AlertBand};
/// use pawpos_core::types::AlertType;
///
/// let plan = plan_alerts(AlertBand::Critical, &[AlertType::Warning]);
/// assert_eq!(plan.create, Some(AlertType::Critical));
/// assert_eq!(plan.resolve, vec![AlertType::Warning]);
///
/// assert!(plan_alerts(AlertBand::Critical, &[AlertType::Critical]).is_noop());
/// ```
pub fn plan_alerts(band: AlertBand, active: &[AlertType]) -> AlertPlan {
    let required = band.required_alert();

    let create = required.filter(|wanted| !active.contains(wanted));

    let mut resolve: Vec<AlertType> = [AlertType::Warning, AlertType::Critical]
        .into_iter()
        .filter(|alert_type| Some(*alert_type) != required && active.contains(alert_type))
        .collect();
    resolve.dedup();

    AlertPlan { create, resolve }
}

/// Alert title shown in the customer screen.
pub fn alert_title(alert_type: AlertType) -> &'static str {
    match alert_type {
        AlertType::Critical => "🔴 Débito Crítico",
        AlertType::Warning => "⚠️ Débito Elevado",
    }
}

/// Alert body, quoting the debt as a positive amount.
pub fn alert_message(alert_type: AlertType, balance: Money) -> String {
    match alert_type {
        AlertType::Critical => format!(
            "Cliente possui débito de {}. Ação urgente necessária.",
            balance.abs()
        ),
        AlertType::Warning => format!(
            "Cliente deve {}. Monitorar próximos atendimentos.",
            balance.abs()
        ),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
