//! Engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                          | Default            |
//! |-----------------------------------|--------------------|
//! | `PAWPOS_DATABASE_PATH`            | `./pawpos.db`      |
//! | `PAWPOS_SETTLEMENT_TIMEOUT_SECS`  | `20`               |
//! | `PAWPOS_ALERT_WARNING_CENTS`      | `-50000`           |
//! | `PAWPOS_ALERT_CRITICAL_CENTS`     | `-100000`          |
//! | `PAWPOS_CLOSING_BALANCE_POLICY`   | `OPENING_PLUS_CASH`|
//! | `PAWPOS_RECENT_ORDERS_LIMIT`      | `50`               |

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use pawpos_core::ledger::AlertThresholds;
use pawpos_core::{Money, DEFAULT_HISTORY_PAGE_SIZE, MAX_PAGE_SIZE};

/// How `close_session` computes the expected drawer amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingBalancePolicy {
    /// Expected = opening balance.
    OpeningOnly,
    /// Expected = opening balance + Σ CASH payments of non-cancelled orders.
    #[default]
    OpeningPlusCash,
}

impl FromStr for ClosingBalancePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPENING_ONLY" => Ok(ClosingBalancePolicy::OpeningOnly),
            "OPENING_PLUS_CASH" => Ok(ClosingBalancePolicy::OpeningPlusCash),
            _ => Err(ConfigError::InvalidValue(
                "PAWPOS_CLOSING_BALANCE_POLICY".to_string(),
            )),
        }
    }
}

impl fmt::Display for ClosingBalancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosingBalancePolicy::OpeningOnly => write!(f, "OPENING_ONLY"),
            ClosingBalancePolicy::OpeningPlusCash => write!(f, "OPENING_PLUS_CASH"),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Deadline for the payment and cancellation units
    pub settlement_timeout: Duration,

    /// Balance thresholds for customer alerts
    pub alert_thresholds: AlertThresholds,

    /// Expected closing balance rule
    pub closing_balance_policy: ClosingBalancePolicy,

    /// Default size of `list_recent_orders`
    pub recent_orders_limit: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("./pawpos.db"),
            settlement_timeout: Duration::from_secs(20),
            alert_thresholds: AlertThresholds::default(),
            closing_balance_policy: ClosingBalancePolicy::default(),
            recent_orders_limit: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let database_path = lookup("PAWPOS_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let timeout_secs: u64 = parse_or(&lookup, "PAWPOS_SETTLEMENT_TIMEOUT_SECS", 20)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PAWPOS_SETTLEMENT_TIMEOUT_SECS".to_string(),
            ));
        }

        let warning: i64 = parse_or(
            &lookup,
            "PAWPOS_ALERT_WARNING_CENTS",
            AlertThresholds::DEFAULT_WARNING_CENTS,
        )?;
        let critical: i64 = parse_or(
            &lookup,
            "PAWPOS_ALERT_CRITICAL_CENTS",
            AlertThresholds::DEFAULT_CRITICAL_CENTS,
        )?;
        let alert_thresholds =
            AlertThresholds::new(Money::from_cents(warning), Money::from_cents(critical));
        if !alert_thresholds.is_ordered() {
            return Err(ConfigError::ThresholdsOutOfOrder { warning, critical });
        }

        let closing_balance_policy = match lookup("PAWPOS_CLOSING_BALANCE_POLICY") {
            Some(raw) => raw.parse()?,
            None => defaults.closing_balance_policy,
        };

        let recent_orders_limit: i64 =
            parse_or(&lookup, "PAWPOS_RECENT_ORDERS_LIMIT", defaults.recent_orders_limit)?;
        if !(1..=MAX_PAGE_SIZE).contains(&recent_orders_limit) {
            return Err(ConfigError::InvalidValue(
                "PAWPOS_RECENT_ORDERS_LIMIT".to_string(),
            ));
        }

        Ok(EngineConfig {
            database_path,
            settlement_timeout: Duration::from_secs(timeout_secs),
            alert_thresholds,
            closing_balance_policy,
            recent_orders_limit,
        })
    }

    /// Overrides the settlement deadline.
    pub fn settlement_timeout(mut self, timeout: Duration) -> Self {
        self.settlement_timeout = timeout;
        self
    }

    /// Overrides the closing balance rule.
    pub fn closing_balance_policy(mut self, policy: ClosingBalancePolicy) -> Self {
        self.closing_balance_policy = policy;
        self
    }

    /// Overrides the alert thresholds.
    pub fn alert_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.alert_thresholds = thresholds;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Critical threshold ({critical}) must not be above warning threshold ({warning})")]
    ThresholdsOutOfOrder { warning: i64, critical: i64 },
}
