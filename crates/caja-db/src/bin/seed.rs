//! # Seed Data Generator
//!
//! Populates a development database with a demo store: an open register,
//! a morning of mixed-tender sales and a couple of expenses.
//!
//! ## Usage
//! ```bash
//! cargo run -p caja-db --bin seed
//! cargo run -p caja-db --bin seed -- --db ./data/caja.db
//! ```

use std::env;

use chrono::{Duration, Utc};
use uuid::Uuid;

use caja_core::{
    Register, RegisterStatus, TenderLine, Transaction, TransactionKind, DEFAULT_CURRENCY,
};
use caja_db::{Database, DbConfig};

const STORE_ID: &str = "demo-store";

struct SeedSale {
    description: &'static str,
    amount_cents: i64,
    tenders: &'static [(&'static str, Option<i64>)],
    voucher: Option<&'static str>,
}

const SALES: &[SeedSale] = &[
    SeedSale {
        description: "Venta registrada: Coca Cola 500ml - Cantidad: 2, Precio Unitario: 3.50",
        amount_cents: 700,
        tenders: &[("Efectivo", None)],
        voucher: Some("B001-101"),
    },
    SeedSale {
        description: "Venta registrada: Pan Integral - Cantidad: 1.5, Precio Unitario: 8.90 | \
                      Cafe Molido 250g - Cantidad: 1, Precio Unitario: 18.00",
        amount_cents: 3135,
        tenders: &[("Efectivo", Some(1335)), ("Yape", Some(1800))],
        voucher: Some("B001-102"),
    },
    SeedSale {
        description: "Venta mostrador. Pago con Visa",
        amount_cents: 4590,
        tenders: &[("Visa", None)],
        voucher: Some("F001-018"),
    },
];

const EXPENSES: &[(&str, i64)] = &[
    ("Retiro para compra de insumos", 2000),
    ("Pago de movilidad", 800),
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut db_path = "./data/caja.db".to_string();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--db" {
            if let Some(path) = args.next() {
                db_path = path;
            }
        }
    }

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent).expect("create database directory");
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .expect("open database");

    if db
        .registers()
        .find_active(STORE_ID)
        .await
        .expect("query active register")
        .is_some()
    {
        println!("Demo store already has an open register, nothing to do.");
        return;
    }

    let opened_at = Utc::now() - Duration::hours(6);
    let register = Register {
        id: Uuid::new_v4().to_string(),
        store_id: STORE_ID.to_string(),
        name: "Caja Principal".to_string(),
        initial_balance_cents: 10_000,
        status: RegisterStatus::Open,
        created_at: opened_at,
    };
    db.registers().insert(&register).await.expect("insert register");

    let mut at = opened_at + Duration::minutes(15);
    for sale in SALES {
        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            register_id: register.id.clone(),
            kind: TransactionKind::Income,
            amount_cents: sale.amount_cents,
            currency: DEFAULT_CURRENCY.to_string(),
            employee: "Demo Cajero".to_string(),
            description: sale.description.to_string(),
            tenders: sale
                .tenders
                .iter()
                .map(|(label, amount)| TenderLine {
                    label: (*label).to_string(),
                    amount_cents: *amount,
                })
                .collect(),
            voucher: sale.voucher.map(str::to_string),
            client_name: None,
            client_document: None,
            client_document_type: None,
            created_at: at,
        };
        db.transactions().insert(&tx).await.expect("insert sale");
        at = at + Duration::minutes(45);
    }

    for (description, amount_cents) in EXPENSES {
        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            register_id: register.id.clone(),
            kind: TransactionKind::Expense,
            amount_cents: *amount_cents,
            currency: DEFAULT_CURRENCY.to_string(),
            employee: "Demo Cajero".to_string(),
            description: (*description).to_string(),
            tenders: vec![TenderLine::new("Efectivo")],
            voucher: None,
            client_name: None,
            client_document: None,
            client_document_type: None,
            created_at: at,
        };
        db.transactions().insert(&tx).await.expect("insert expense");
        at = at + Duration::minutes(20);
    }

    println!(
        "Seeded {} with register {} ({} sales, {} expenses) in {}",
        STORE_ID,
        register.id,
        SALES.len(),
        EXPENSES.len(),
        db_path
    );
}
