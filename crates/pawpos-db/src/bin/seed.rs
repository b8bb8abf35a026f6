//! # Seed Data Generator
//!
//! Populates the database with a small pet-grooming shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p pawpos-db --bin seed
//!
//! # Specify database path
//! cargo run -p pawpos-db --bin seed -- --db ./data/pawpos.db
//! ```
//!
//! ## Generated Data
//! - Products: shampoos, accessories and snacks, each with a SKU and stock
//! - Services: bath, grooming and add-ons with durations
//! - Customers: walk-in regulars plus one staff member linked to a profile
//! - One unbilled appointment with a quote and a pending invoice, ready
//!   for a POS checkout

use pawpos_core::QuoteItem;
use pawpos_db::repository::{billing, catalog, customer};
use pawpos_db::{Database, DbConfig};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (sku, name, description, price_cents, stock)
const PRODUCTS: &[(&str, &str, &str, i64, i64)] = &[
    ("SHP-001", "Shampoo Neutro 500ml", "Pelagem sensível", 3590, 24),
    ("SHP-002", "Shampoo Antipulgas 500ml", "Controle de pulgas", 4290, 18),
    ("SHP-003", "Condicionador Pelos Longos", "Desembaraçante", 3890, 12),
    ("ACC-001", "Coleira Couro M", "Couro legítimo, tamanho M", 4990, 8),
    ("ACC-002", "Guia Retrátil 5m", "Até 20kg", 6990, 6),
    ("ACC-003", "Laço Decorativo", "Pacote com 10", 990, 60),
    ("SNK-001", "Petisco Bifinho 65g", "Sabor carne", 1290, 40),
    ("SNK-002", "Osso Mastigável", "Couro bovino", 1590, 35),
    ("HYG-001", "Perfume Pet 120ml", "Fragrância suave", 2990, 15),
    ("HYG-002", "Lenço Umedecido Pet", "Pacote com 50", 1890, 30),
];

/// (name, description, base_price_cents, duration_minutes, category)
const SERVICES: &[(&str, &str, i64, i64, &str)] = &[
    ("Banho Porte Pequeno", "Banho completo até 10kg", 5000, 60, "BANHO"),
    ("Banho Porte Grande", "Banho completo acima de 25kg", 9000, 90, "BANHO"),
    ("Tosa Higiênica", "Patas, barriga e região íntima", 3500, 30, "TOSA"),
    ("Tosa Completa", "Tosa na máquina ou tesoura", 8000, 120, "TOSA"),
    ("Hidratação", "Máscara hidratante", 3000, 20, "ADICIONAL"),
    ("Corte de Unhas", "Corte e lixa", 1500, 15, "ADICIONAL"),
];

const CUSTOMERS: &[&str] = &["Ana Souza", "Bruno Lima", "Carla Mendes", "Diego Rocha"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./pawpos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PawPOS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./pawpos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 PawPOS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut conn = db.pool().acquire().await?;

    let existing = catalog::count_products(&mut conn).await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }
    drop(conn);

    let mut tx = db.begin().await?;

    for (sku, name, description, price_cents, stock) in PRODUCTS {
        catalog::insert_product(
            &mut tx,
            &Uuid::new_v4().to_string(),
            Some(*sku),
            name,
            Some(*description),
            *price_cents,
            *stock,
        )
        .await?;
    }
    println!("✓ {} products", PRODUCTS.len());

    let mut service_ids = Vec::with_capacity(SERVICES.len());
    for (name, description, price_cents, duration, category) in SERVICES {
        let id = Uuid::new_v4().to_string();
        catalog::insert_service(
            &mut tx,
            &id,
            name,
            Some(*description),
            *price_cents,
            Some(*duration),
            Some(*category),
        )
        .await?;
        service_ids.push((id, *name, *price_cents));
    }
    println!("✓ {} services", SERVICES.len());

    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for name in CUSTOMERS {
        let id = Uuid::new_v4().to_string();
        customer::insert(&mut tx, &id, name, None).await?;
        customer_ids.push(id);
    }

    // Staff member who also shops as a customer (payroll deduction)
    let staff_user_id = Uuid::new_v4().to_string();
    customer::insert_staff_profile(&mut tx, &Uuid::new_v4().to_string(), &staff_user_id).await?;
    customer::insert(
        &mut tx,
        &Uuid::new_v4().to_string(),
        "Fernanda Tosadora",
        Some(staff_user_id.as_str()),
    )
    .await?;
    println!("✓ {} customers (1 staff)", CUSTOMERS.len() + 1);

    // An appointment waiting for checkout: bath + nail trim on a quote
    // that the billing side already invoiced.
    let owner = &customer_ids[0];
    let (bath_id, bath_name, bath_price) = &service_ids[0];
    let (nails_id, nails_name, nails_price) = &service_ids[5];

    let invoice_id = Uuid::new_v4().to_string();
    billing::insert_invoice(&mut tx, &invoice_id, owner, None, bath_price + nails_price).await?;

    let quote_id = Uuid::new_v4().to_string();
    billing::insert_quote(&mut tx, &quote_id, Some(invoice_id.as_str())).await?;
    for (position, (service_id, name, price)) in
        [(bath_id, bath_name, bath_price), (nails_id, nails_name, nails_price)]
            .into_iter()
            .enumerate()
    {
        let item = QuoteItem {
            id: Uuid::new_v4().to_string(),
            quote_id: quote_id.clone(),
            product_id: None,
            service_id: Some(service_id.clone()),
            description: name.to_string(),
            quantity: 1,
            price_cents: *price,
            discount_cents: 0,
        };
        billing::insert_quote_item(&mut tx, &item, position as i64).await?;
    }

    let appointment_id = Uuid::new_v4().to_string();
    billing::insert_appointment(&mut tx, &appointment_id, owner, "Thor", Some(quote_id.as_str()))
        .await?;
    billing::insert_appointment_service(&mut tx, &appointment_id, bath_id, 0).await?;
    billing::insert_appointment_service(&mut tx, &appointment_id, nails_id, 1).await?;

    tx.commit().await?;
    println!("✓ Appointment ready for checkout: {}", appointment_id);

    info!(db_path = %db_path, "Seed complete");
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
