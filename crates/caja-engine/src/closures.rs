//! # Closure Reconciliation Engine
//!
//! End-of-shift drawer reconciliation.
//!
//! ## State Machine
//! ```text
//! OPEN ──(close_drawer)──► CLOSED          (terminal)
//!
//! A closed register never reopens; reopen_from_closure opens a NEW
//! register seeded with the previous closure's carry-forward balance.
//! The two are separate, explicit operations, so the one-open-register
//! invariant is never transiently violated by an implicit chain.
//! ```
//!
//! ## Reconciliation Math
//! ```text
//! expected cash = opening balance + Σ cash income − Σ cash expense
//! discrepancy   = counted cash − expected cash
//!                 (> 0 surplus, < 0 shortage, 0 balanced)
//! ```
//! Only CASH-classified tenders feed `expected cash`; card/wallet
//! movements are not physically countable, though they still appear in
//! the closure's total income/expense.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use caja_core::{merge::merge_transactions, summary, validation, Closure, Register};
use caja_db::{Database, DbError};

use crate::dates::day_bounds;
use crate::error::{EngineError, EngineResult};
use crate::registers::{OpenRegister, RegisterService};

/// Request to close the store's active drawer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseDrawer {
    pub store_id: String,
    /// Cash physically counted by the operator.
    pub counted_cash_cents: i64,
    pub employee: String,
    pub notes: String,
    /// Carry-forward suggestion override; defaults to the counted cash.
    pub next_opening_balance_cents: Option<i64>,
}

/// Request to open the next session seeded from the latest closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReopenRegister {
    pub store_id: String,
    pub name: Option<String>,
    /// Operator adjustment; defaults to the closure's carry-forward
    /// balance.
    pub initial_balance_cents: Option<i64>,
}

/// Service computing and persisting closures.
#[derive(Debug, Clone)]
pub struct ClosureService {
    db: Database,
    registers: RegisterService,
}

impl ClosureService {
    pub fn new(db: Database) -> Self {
        ClosureService {
            registers: RegisterService::new(db.clone()),
            db,
        }
    }

    /// Closes the store's active register and records the reconciliation.
    ///
    /// At most one closure per store per calendar day (UTC); a second
    /// attempt is a [`EngineError::Conflict`].
    pub async fn close_drawer(&self, request: CloseDrawer) -> EngineResult<Closure> {
        validation::validate_store_id(&request.store_id)?;
        validation::validate_employee(&request.employee)?;
        validation::validate_counted_cash(request.counted_cash_cents)?;
        if let Some(next) = request.next_opening_balance_cents {
            validation::validate_opening_balance(next)?;
        }

        let register = self.registers.require_active(&request.store_id).await?;

        let now = Utc::now();
        let (day_start, day_end) = day_bounds(now.date_naive());
        if self
            .db
            .closures()
            .latest_for_store_between(&request.store_id, day_start, day_end)
            .await?
            .is_some()
        {
            return Err(EngineError::conflict(format!(
                "a closure already exists today for store {}",
                request.store_id
            )));
        }

        let stream = self.db.transactions().for_register(&register.id).await?;
        let merged = merge_transactions(stream);
        let totals = summary::totals(&merged);
        let expected_cash = summary::expected_cash(register.initial_balance(), &merged);
        let discrepancy_cents = request.counted_cash_cents - expected_cash.cents();

        let closure = Closure {
            id: Uuid::new_v4().to_string(),
            register_id: register.id.clone(),
            employee: request.employee,
            opening_balance_cents: register.initial_balance_cents,
            closing_balance_cents: request.counted_cash_cents,
            expected_cash_cents: expected_cash.cents(),
            discrepancy_cents,
            total_income_cents: totals.income.cents(),
            total_expense_cents: totals.expense.cents(),
            next_opening_balance_cents: request
                .next_opening_balance_cents
                .unwrap_or(request.counted_cash_cents),
            notes: request.notes,
            created_at: now,
        };

        match self.db.closures().insert_and_close(&closure).await {
            Ok(()) => {}
            // Lost the race against a concurrent close
            Err(DbError::NotFound { .. }) => {
                return Err(EngineError::invalid_state(format!(
                    "register {} is already closed",
                    register.id
                )))
            }
            Err(other) => return Err(other.into()),
        }

        if closure.is_balanced() {
            info!(
                closure_id = %closure.id,
                register_id = %closure.register_id,
                "Drawer closed, balanced"
            );
        } else {
            warn!(
                closure_id = %closure.id,
                register_id = %closure.register_id,
                discrepancy_cents,
                "Drawer closed with discrepancy"
            );
        }

        Ok(closure)
    }

    /// Opens the next session for a store, seeding the initial balance
    /// from the latest closure's carry-forward suggestion (operator
    /// adjustable).
    ///
    /// Explicitly separate from [`Self::close_drawer`]: closing never
    /// opens anything by itself, so the one-open-register invariant holds
    /// between the two calls.
    pub async fn reopen_from_closure(
        &self,
        request: ReopenRegister,
    ) -> EngineResult<Register> {
        validation::validate_store_id(&request.store_id)?;

        let latest = self
            .latest_closure(&request.store_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Closure", &request.store_id))?;

        let initial_balance_cents = request
            .initial_balance_cents
            .unwrap_or(latest.next_opening_balance_cents);

        self.registers
            .open(OpenRegister {
                store_id: request.store_id,
                name: request.name,
                initial_balance_cents,
            })
            .await
    }

    /// The latest closure recorded for a store, if any.
    pub async fn latest_closure(&self, store_id: &str) -> EngineResult<Option<Closure>> {
        let mut closures = self.db.closures().for_store(store_id).await?;
        Ok(if closures.is_empty() {
            None
        } else {
            Some(closures.remove(0))
        })
    }

    /// Timestamp of a register's closure, if it has one. The single
    /// "since last closure" anchor used by balance, summary and history
    /// computations.
    pub async fn last_closure_at(
        &self,
        register_id: &str,
    ) -> EngineResult<Option<DateTime<Utc>>> {
        Ok(self
            .db
            .closures()
            .for_register(register_id)
            .await?
            .map(|closure| closure.created_at))
    }
}
