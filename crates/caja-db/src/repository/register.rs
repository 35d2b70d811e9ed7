//! # Register Repository
//!
//! Database operations for drawer sessions (registers).
//!
//! ## Register Lifecycle
//! ```text
//! 1. OPEN      insert(register)        → status 'open'
//!              └── partial unique index rejects a second open register
//!                  for the same store (ConflictError upstream)
//!
//! 2. POST      (transaction repository; the register row never changes)
//!
//! 3. CLOSE     set_closed(id)          → status 'closed', terminal
//!              └── guarded by WHERE status = 'open', so closing twice
//!                  reports the stale state instead of silently passing
//! ```
//!
//! There is no balance column to update anywhere — balances are derived
//! from the transaction stream by the engine.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::{Register, RegisterStatus};

/// Private row mirror of the `registers` table.
#[derive(Debug, sqlx::FromRow)]
struct RegisterRow {
    id: String,
    store_id: String,
    name: String,
    initial_balance_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl RegisterRow {
    fn into_register(self) -> DbResult<Register> {
        let status = RegisterStatus::parse(&self.status)
            .ok_or_else(|| DbError::corrupt(format!("register status '{}'", self.status)))?;
        Ok(Register {
            id: self.id,
            store_id: self.store_id,
            name: self.name,
            initial_balance_cents: self.initial_balance_cents,
            status,
            created_at: self.created_at,
        })
    }
}

/// Repository for register rows.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Inserts a new register.
    ///
    /// A UNIQUE violation on `idx_registers_one_open` means another open
    /// register already exists for the store; the error maps to
    /// [`DbError::UniqueViolation`] and the engine surfaces a conflict.
    pub async fn insert(&self, register: &Register) -> DbResult<()> {
        debug!(id = %register.id, store_id = %register.store_id, "Inserting register");

        sqlx::query(
            r#"
            INSERT INTO registers (
                id, store_id, name, initial_balance_cents, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&register.id)
        .bind(&register.store_id)
        .bind(&register.name)
        .bind(register.initial_balance_cents)
        .bind(register.status.as_str())
        .bind(register.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a register by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Register>> {
        let row: Option<RegisterRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, name, initial_balance_cents, status, created_at
            FROM registers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RegisterRow::into_register).transpose()
    }

    /// The store's open register, if any.
    pub async fn find_active(&self, store_id: &str) -> DbResult<Option<Register>> {
        let row: Option<RegisterRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, name, initial_balance_cents, status, created_at
            FROM registers
            WHERE store_id = ?1 AND status = 'open'
            "#,
        )
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RegisterRow::into_register).transpose()
    }

    /// All registers of a store, oldest first.
    pub async fn list_for_store(&self, store_id: &str) -> DbResult<Vec<Register>> {
        let rows: Vec<RegisterRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, name, initial_balance_cents, status, created_at
            FROM registers
            WHERE store_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RegisterRow::into_register).collect()
    }

    /// Marks an open register as closed (terminal).
    ///
    /// The `status = 'open'` guard makes the transition exactly-once:
    /// closing an already-closed register is reported as not found.
    pub async fn set_closed(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE registers SET status = 'closed'
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Register (open)", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
