//! # Register State Manager
//!
//! Open-drawer lifecycle and derived balances.
//!
//! The one invariant everything else leans on: **at most one open register
//! per store**. It is not checked with a read-then-write here — the
//! partial unique index in caja-db decides, so two concurrent opens race
//! on the database and exactly one wins.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use caja_core::{
    merge::merge_transactions,
    summary::{self, Totals},
    validation, Money, Register, RegisterStatus,
};
use caja_db::{Database, DbError};

use crate::error::{EngineError, EngineResult};

/// Default display name for a drawer opened without one.
const DEFAULT_REGISTER_NAME: &str = "Caja Principal";

/// Request to open a drawer session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRegister {
    pub store_id: String,
    /// Display name; defaults to "Caja Principal".
    pub name: Option<String>,
    /// Operator-counted cash in the drawer at open.
    pub initial_balance_cents: i64,
}

/// The active register with its derived figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBalance {
    pub register: Register,
    /// initial + Σ income − Σ expense, over the merged stream.
    pub balance_cents: i64,
    pub total_income_cents: i64,
    pub total_expense_cents: i64,
    /// Cash the drawer should physically hold right now.
    pub expected_cash_cents: i64,
}

/// Service owning the register lifecycle.
#[derive(Debug, Clone)]
pub struct RegisterService {
    db: Database,
}

impl RegisterService {
    pub fn new(db: Database) -> Self {
        RegisterService { db }
    }

    /// Opens a new drawer session for a store.
    ///
    /// Fails with [`EngineError::Conflict`] when the store already has an
    /// open register. Two concurrent calls for the same store: exactly one
    /// succeeds.
    pub async fn open(&self, request: OpenRegister) -> EngineResult<Register> {
        validation::validate_store_id(&request.store_id)?;
        validation::validate_opening_balance(request.initial_balance_cents)?;

        let register = Register {
            id: Uuid::new_v4().to_string(),
            store_id: request.store_id.clone(),
            name: request
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REGISTER_NAME.to_string()),
            initial_balance_cents: request.initial_balance_cents,
            status: RegisterStatus::Open,
            created_at: Utc::now(),
        };

        match self.db.registers().insert(&register).await {
            Ok(()) => {
                info!(
                    register_id = %register.id,
                    store_id = %register.store_id,
                    initial_balance_cents = register.initial_balance_cents,
                    "Register opened"
                );
                Ok(register)
            }
            Err(DbError::UniqueViolation { .. }) => Err(EngineError::conflict(format!(
                "an open register already exists for store {}",
                request.store_id
            ))),
            Err(other) => Err(other.into()),
        }
    }

    /// The store's open register, if any.
    pub async fn active(&self, store_id: &str) -> EngineResult<Option<Register>> {
        Ok(self.db.registers().find_active(store_id).await?)
    }

    /// The store's open register, or [`EngineError::NotFound`].
    pub async fn require_active(&self, store_id: &str) -> EngineResult<Register> {
        self.active(store_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Active register", store_id))
    }

    /// Derived balance of the store's open register.
    ///
    /// Always computed from the transaction stream — there is no stored
    /// balance anywhere to drift from it.
    pub async fn balance(&self, store_id: &str) -> EngineResult<RegisterBalance> {
        let register = self.require_active(store_id).await?;
        let stream = self.db.transactions().for_register(&register.id).await?;
        let merged = merge_transactions(stream);

        let balance = summary::current_balance(register.initial_balance(), &merged);
        let Totals { income, expense } = summary::totals(&merged);
        let expected_cash = summary::expected_cash(register.initial_balance(), &merged);

        Ok(RegisterBalance {
            balance_cents: balance.cents(),
            total_income_cents: income.cents(),
            total_expense_cents: expense.cents(),
            expected_cash_cents: expected_cash.cents(),
            register,
        })
    }

    /// Derived balance for an arbitrary register id (closed ones
    /// included), used by reconciliation.
    pub(crate) async fn balance_of(&self, register: &Register) -> EngineResult<Money> {
        let stream = self.db.transactions().for_register(&register.id).await?;
        let merged = merge_transactions(stream);
        Ok(summary::current_balance(
            register.initial_balance(),
            &merged,
        ))
    }
}
