//! # Transaction Repository
//!
//! Database operations for ledger entries and their tender lines.
//!
//! Entries are immutable: there is insert and there is read, nothing
//! else. A transaction and its tender lines are written in one database
//! transaction so a crash can never leave a posting without its split.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use caja_core::{TenderLine, Transaction, TransactionKind};

/// Private row mirror of `cash_transactions`.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    register_id: String,
    kind: String,
    amount_cents: i64,
    currency: String,
    employee: String,
    description: String,
    voucher: Option<String>,
    client_name: Option<String>,
    client_document: Option<String>,
    client_document_type: Option<String>,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self, tenders: Vec<TenderLine>) -> DbResult<Transaction> {
        let kind = TransactionKind::parse(&self.kind)
            .ok_or_else(|| DbError::corrupt(format!("transaction kind '{}'", self.kind)))?;
        Ok(Transaction {
            id: self.id,
            register_id: self.register_id,
            kind,
            amount_cents: self.amount_cents,
            currency: self.currency,
            employee: self.employee,
            description: self.description,
            tenders,
            voucher: self.voucher,
            client_name: self.client_name,
            client_document: self.client_document,
            client_document_type: self.client_document_type,
            created_at: self.created_at,
        })
    }
}

/// Private row mirror of `transaction_tenders` (joined fetches).
#[derive(Debug, sqlx::FromRow)]
struct TenderRow {
    transaction_id: String,
    label: String,
    amount_cents: Option<i64>,
}

const SELECT_COLUMNS: &str = "c.id, c.register_id, c.kind, c.amount_cents, c.currency, \
     c.employee, c.description, c.voucher, c.client_name, c.client_document, \
     c.client_document_type, c.created_at";

/// Repository for ledger entries.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Inserts a ledger entry together with its tender lines, atomically.
    pub async fn insert(&self, transaction: &Transaction) -> DbResult<()> {
        debug!(
            id = %transaction.id,
            register_id = %transaction.register_id,
            kind = transaction.kind.as_str(),
            amount_cents = transaction.amount_cents,
            "Inserting transaction"
        );

        let mut db_tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO cash_transactions (
                id, register_id, kind, amount_cents, currency,
                employee, description, voucher,
                client_name, client_document, client_document_type,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.register_id)
        .bind(transaction.kind.as_str())
        .bind(transaction.amount_cents)
        .bind(&transaction.currency)
        .bind(&transaction.employee)
        .bind(&transaction.description)
        .bind(&transaction.voucher)
        .bind(&transaction.client_name)
        .bind(&transaction.client_document)
        .bind(&transaction.client_document_type)
        .bind(transaction.created_at)
        .execute(&mut *db_tx)
        .await?;

        for (position, tender) in transaction.tenders.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_tenders (
                    id, transaction_id, position, label, amount_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&transaction.id)
            .bind(position as i64)
            .bind(&tender.label)
            .bind(tender.amount_cents)
            .execute(&mut *db_tx)
            .await?;
        }

        db_tx.commit().await?;
        Ok(())
    }

    /// All entries of a register, oldest first.
    pub async fn for_register(&self, register_id: &str) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM cash_transactions c
            WHERE c.register_id = ?1
            ORDER BY c.created_at, c.id
            "#
        ))
        .bind(register_id)
        .fetch_all(&self.pool)
        .await?;

        let tenders: Vec<TenderRow> = sqlx::query_as(
            r#"
            SELECT t.transaction_id, t.label, t.amount_cents
            FROM transaction_tenders t
            JOIN cash_transactions c ON c.id = t.transaction_id
            WHERE c.register_id = ?1
            ORDER BY t.transaction_id, t.position
            "#,
        )
        .bind(register_id)
        .fetch_all(&self.pool)
        .await?;

        attach_tenders(rows, tenders)
    }

    /// Entries of a register strictly after `after`, oldest first.
    pub async fn for_register_since(
        &self,
        register_id: &str,
        after: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM cash_transactions c
            WHERE c.register_id = ?1 AND c.created_at > ?2
            ORDER BY c.created_at, c.id
            "#
        ))
        .bind(register_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;

        let tenders: Vec<TenderRow> = sqlx::query_as(
            r#"
            SELECT t.transaction_id, t.label, t.amount_cents
            FROM transaction_tenders t
            JOIN cash_transactions c ON c.id = t.transaction_id
            WHERE c.register_id = ?1 AND c.created_at > ?2
            ORDER BY t.transaction_id, t.position
            "#,
        )
        .bind(register_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;

        attach_tenders(rows, tenders)
    }

    /// Entries across all of a store's registers in `[start, end]`,
    /// oldest first.
    pub async fn for_store_between(
        &self,
        store_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM cash_transactions c
            JOIN registers r ON r.id = c.register_id
            WHERE r.store_id = ?1 AND c.created_at >= ?2 AND c.created_at <= ?3
            ORDER BY c.created_at, c.id
            "#
        ))
        .bind(store_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let tenders: Vec<TenderRow> = sqlx::query_as(
            r#"
            SELECT t.transaction_id, t.label, t.amount_cents
            FROM transaction_tenders t
            JOIN cash_transactions c ON c.id = t.transaction_id
            JOIN registers r ON r.id = c.register_id
            WHERE r.store_id = ?1 AND c.created_at >= ?2 AND c.created_at <= ?3
            ORDER BY t.transaction_id, t.position
            "#,
        )
        .bind(store_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        attach_tenders(rows, tenders)
    }
}

/// Zips tender rows onto their transactions (position order is preserved
/// by the query).
fn attach_tenders(rows: Vec<TransactionRow>, tenders: Vec<TenderRow>) -> DbResult<Vec<Transaction>> {
    let mut by_transaction: HashMap<String, Vec<TenderLine>> = HashMap::new();
    for tender in tenders {
        by_transaction
            .entry(tender.transaction_id)
            .or_default()
            .push(TenderLine {
                label: tender.label,
                amount_cents: tender.amount_cents,
            });
    }

    rows.into_iter()
        .map(|row| {
            let lines = by_transaction.remove(&row.id).unwrap_or_default();
            row.into_transaction(lines)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
