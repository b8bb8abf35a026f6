//! # Balance Reconciliation
//!
//! Replays every customer's ledger and repairs cached balances that drifted
//! from it. Alerts are re-evaluated for each repaired customer.
//!
//! ## Usage
//! ```bash
//! # Report drift without writing anything
//! cargo run -p pawpos-engine --bin pawpos-reconcile -- --dry-run
//!
//! # Repair, against a specific database
//! PAWPOS_DATABASE_PATH=./data/pawpos.db cargo run -p pawpos-engine --bin pawpos-reconcile
//! ```

use std::env;

use pawpos_core::Money;
use pawpos_engine::telemetry::init_tracing;
use pawpos_engine::{EngineConfig, PosEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut dry_run = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" | "-n" => dry_run = true,
            "--help" | "-h" => {
                println!("PawPOS Balance Reconciliation");
                println!();
                println!("Usage: pawpos-reconcile [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --dry-run      Report drift without repairing it");
                println!("  -h, --help         Show this help message");
                println!();
                println!("The database is taken from PAWPOS_DATABASE_PATH (default: ./pawpos.db).");
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let config = EngineConfig::load()?;
    println!("Database: {}", config.database_path.display());

    let engine = PosEngine::connect(config).await?;

    let drifted = if dry_run {
        engine.drifted_balances().await?
    } else {
        engine.reconcile_all().await?
    };

    if drifted.is_empty() {
        println!("✓ All cached balances match the ledger");
        return Ok(());
    }

    for drift in &drifted {
        println!(
            "  {}  cached {}  ledger {}",
            drift.customer_id,
            Money::from_cents(drift.cached_cents),
            Money::from_cents(drift.replayed_cents),
        );
    }

    if dry_run {
        println!("⚠ {} customer(s) drifted (dry run, nothing written)", drifted.len());
    } else {
        println!("✓ {} customer(s) repaired", drifted.len());
    }

    engine.database().close().await;
    Ok(())
}
