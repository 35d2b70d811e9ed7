//! # Closure Repository
//!
//! Database operations for end-of-shift reconciliation records.
//!
//! The important write here is [`ClosureRepository::insert_and_close`]:
//! persisting the closure and flipping its register to `closed` happen in
//! one database transaction, so there is no window in which a closure
//! exists for a register that still accepts postings.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use caja_core::Closure;

/// Private row mirror of `closures`.
#[derive(Debug, sqlx::FromRow)]
struct ClosureRow {
    id: String,
    register_id: String,
    employee: String,
    opening_balance_cents: i64,
    closing_balance_cents: i64,
    expected_cash_cents: i64,
    discrepancy_cents: i64,
    total_income_cents: i64,
    total_expense_cents: i64,
    next_opening_balance_cents: i64,
    notes: String,
    created_at: DateTime<Utc>,
}

impl From<ClosureRow> for Closure {
    fn from(row: ClosureRow) -> Self {
        Closure {
            id: row.id,
            register_id: row.register_id,
            employee: row.employee,
            opening_balance_cents: row.opening_balance_cents,
            closing_balance_cents: row.closing_balance_cents,
            expected_cash_cents: row.expected_cash_cents,
            discrepancy_cents: row.discrepancy_cents,
            total_income_cents: row.total_income_cents,
            total_expense_cents: row.total_expense_cents,
            next_opening_balance_cents: row.next_opening_balance_cents,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "cl.id, cl.register_id, cl.employee, cl.opening_balance_cents, \
     cl.closing_balance_cents, cl.expected_cash_cents, cl.discrepancy_cents, \
     cl.total_income_cents, cl.total_expense_cents, cl.next_opening_balance_cents, \
     cl.notes, cl.created_at";

/// Repository for closure rows.
#[derive(Debug, Clone)]
pub struct ClosureRepository {
    pool: SqlitePool,
}

impl ClosureRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClosureRepository { pool }
    }

    /// Persists a closure and marks its register closed, atomically.
    ///
    /// The register update is guarded by `status = 'open'`; losing that
    /// race (someone else closed first) rolls the closure back.
    pub async fn insert_and_close(&self, closure: &Closure) -> DbResult<()> {
        debug!(
            id = %closure.id,
            register_id = %closure.register_id,
            discrepancy_cents = closure.discrepancy_cents,
            "Persisting closure"
        );

        let mut db_tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO closures (
                id, register_id, employee,
                opening_balance_cents, closing_balance_cents,
                expected_cash_cents, discrepancy_cents,
                total_income_cents, total_expense_cents,
                next_opening_balance_cents, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&closure.id)
        .bind(&closure.register_id)
        .bind(&closure.employee)
        .bind(closure.opening_balance_cents)
        .bind(closure.closing_balance_cents)
        .bind(closure.expected_cash_cents)
        .bind(closure.discrepancy_cents)
        .bind(closure.total_income_cents)
        .bind(closure.total_expense_cents)
        .bind(closure.next_opening_balance_cents)
        .bind(&closure.notes)
        .bind(closure.created_at)
        .execute(&mut *db_tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE registers SET status = 'closed'
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&closure.register_id)
        .execute(&mut *db_tx)
        .await?;

        if result.rows_affected() == 0 {
            db_tx.rollback().await?;
            return Err(DbError::not_found("Register (open)", &closure.register_id));
        }

        db_tx.commit().await?;
        info!(register_id = %closure.register_id, "Register closed");
        Ok(())
    }

    /// A store's closures, newest first.
    pub async fn for_store(&self, store_id: &str) -> DbResult<Vec<Closure>> {
        let rows: Vec<ClosureRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM closures cl
            JOIN registers r ON r.id = cl.register_id
            WHERE r.store_id = ?1
            ORDER BY cl.created_at DESC, cl.id DESC
            "#
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Closure::from).collect())
    }

    /// The register's closure, if it has one. A register is closed at
    /// most once, so this is the "last closure timestamp" query.
    pub async fn for_register(&self, register_id: &str) -> DbResult<Option<Closure>> {
        let row: Option<ClosureRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM closures cl
            WHERE cl.register_id = ?1
            ORDER BY cl.created_at DESC
            LIMIT 1
            "#
        ))
        .bind(register_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Closure::from))
    }

    /// Latest closure of a store within `[start, end]` — the daily-closure
    /// lookup behind the one-closure-per-day rule.
    pub async fn latest_for_store_between(
        &self,
        store_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Option<Closure>> {
        let row: Option<ClosureRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM closures cl
            JOIN registers r ON r.id = cl.register_id
            WHERE r.store_id = ?1 AND cl.created_at >= ?2 AND cl.created_at <= ?3
            ORDER BY cl.created_at DESC, cl.id DESC
            LIMIT 1
            "#
        ))
        .bind(store_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Closure::from))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use caja_core::{Register, RegisterStatus};
    use chrono::Duration;
    use uuid::Uuid;

    async fn open_register(db: &Database, store_id: &str) -> Register {
        let register = Register {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            name: "Caja Principal".to_string(),
            initial_balance_cents: 10_000,
            status: RegisterStatus::Open,
            created_at: Utc::now() - Duration::hours(8),
        };
        db.registers().insert(&register).await.unwrap();
        register
    }

    fn closure(register_id: &str, created_at: DateTime<Utc>) -> Closure {
        Closure {
            id: Uuid::new_v4().to_string(),
            register_id: register_id.to_string(),
            employee: "ana".to_string(),
            opening_balance_cents: 10_000,
            closing_balance_cents: 13_000,
            expected_cash_cents: 13_000,
            discrepancy_cents: 0,
            total_income_cents: 5000,
            total_expense_cents: 2000,
            next_opening_balance_cents: 13_000,
            notes: "Cierre sin novedades".to_string(),
            created_at,
        }
    }

    #[tokio::test]
    async fn insert_and_close_transitions_register() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let register = open_register(&db, "store-1").await;

        db.closures()
            .insert_and_close(&closure(&register.id, Utc::now()))
            .await
            .unwrap();

        let stored = db.registers().get_by_id(&register.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RegisterStatus::Closed);

        let found = db.closures().for_register(&register.id).await.unwrap();
        assert!(found.unwrap().is_balanced());
    }

    #[tokio::test]
    async fn closing_a_closed_register_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let register = open_register(&db, "store-1").await;

        db.closures()
            .insert_and_close(&closure(&register.id, Utc::now()))
            .await
            .unwrap();
        let err = db
            .closures()
            .insert_and_close(&closure(&register.id, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // The second closure row must not survive the rollback
        let all = db.closures().for_store("store-1").await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn store_queries_order_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = open_register(&db, "store-1").await;
        let earlier = Utc::now() - Duration::days(1);
        db.closures()
            .insert_and_close(&closure(&first.id, earlier))
            .await
            .unwrap();

        let second = open_register(&db, "store-1").await;
        let later = Utc::now();
        db.closures()
            .insert_and_close(&closure(&second.id, later))
            .await
            .unwrap();

        let all = db.closures().for_store("store-1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].register_id, second.id);

        let today = db
            .closures()
            .latest_for_store_between("store-1", later - Duration::hours(1), later)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(today.register_id, second.id);

        let none = db
            .closures()
            .latest_for_store_between(
                "store-1",
                later + Duration::hours(1),
                later + Duration::hours(2),
            )
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
