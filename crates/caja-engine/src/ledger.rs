//! # Ledger Query Facade
//!
//! The read side of the engine: pre-merged, time-ordered views for the
//! presentation layer.
//!
//! Every query here runs the same pipeline — fetch raw records, dedup by
//! id, merge ([`caja_core::merge`]), project closures, sort ascending —
//! so callers can never observe a half-canonical ledger.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use caja_core::{
    merge::merge_transactions,
    summary::{self, PaymentBreakdown, Totals},
    Closure, Register, Transaction, TransactionKind, CLOSURE_DESCRIPTION, DEFAULT_CURRENCY,
};
use caja_db::Database;

use crate::dates::{day_bounds, widened_bounds};
use crate::error::{EngineError, EngineResult};

/// A historical closure paired with the operations of its shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureWithOperations {
    pub closure: Closure,
    /// Merged entries between the prior closure and this one, ascending.
    pub operations: Vec<Transaction>,
    /// Per-category tender summary of those operations.
    pub breakdown: PaymentBreakdown,
}

/// Running summary of the store's open session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub register: Register,
    pub balance_cents: i64,
    pub total_income_cents: i64,
    pub total_expense_cents: i64,
    /// Cash the drawer should physically hold right now.
    pub expected_cash_cents: i64,
    pub breakdown: PaymentBreakdown,
}

/// The facade composing classifier, merge engine and repositories.
#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Database,
}

impl LedgerService {
    pub fn new(db: Database) -> Self {
        LedgerService { db }
    }

    /// All of a store's ledger entries for one calendar day (UTC),
    /// pre-merged, with the day's closures projected in, ascending by
    /// timestamp.
    ///
    /// The fetch window is widened by a day on each side to cover records
    /// written near timezone boundaries; the merge engine's idempotence
    /// makes the overlap harmless.
    pub async fn day_ledger(
        &self,
        store_id: &str,
        date: NaiveDate,
    ) -> EngineResult<Vec<Transaction>> {
        let (fetch_start, fetch_end) = widened_bounds(date);
        let raw = self
            .db
            .transactions()
            .for_store_between(store_id, fetch_start, fetch_end)
            .await?;

        let mut seen = HashSet::new();
        let day_records: Vec<Transaction> = raw
            .into_iter()
            .filter(|tx| seen.insert(tx.id.clone()))
            .filter(|tx| tx.created_at.date_naive() == date)
            .collect();

        let mut entries = merge_transactions(day_records);

        let (day_start, day_end) = day_bounds(date);
        for closure in self.db.closures().for_store(store_id).await? {
            if closure.created_at >= day_start && closure.created_at <= day_end {
                entries.push(closure_projection(&closure));
            }
        }

        // Ascending by timestamp; the stable sort keeps merge order for
        // same-second entries.
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    /// Merged entries of a register strictly after `after`, ascending.
    pub async fn transactions_since(
        &self,
        register_id: &str,
        after: DateTime<Utc>,
    ) -> EngineResult<Vec<Transaction>> {
        let raw = self
            .db
            .transactions()
            .for_register_since(register_id, after)
            .await?;
        Ok(merge_transactions(raw))
    }

    /// Per-category tender summary of a batch of merged entries.
    ///
    /// Exposed for callers that already hold a day view; the session and
    /// history queries apply it themselves.
    pub fn payment_breakdown(entries: &[Transaction]) -> PaymentBreakdown {
        summary::payment_breakdown(entries)
    }

    /// Running summary of the store's open session: derived balance,
    /// totals, countable cash and tender breakdown.
    pub async fn session_summary(&self, store_id: &str) -> EngineResult<SessionSummary> {
        let register = self
            .db
            .registers()
            .find_active(store_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Active register", store_id))?;

        let raw = self.db.transactions().for_register(&register.id).await?;
        let merged = merge_transactions(raw);

        let balance = summary::current_balance(register.initial_balance(), &merged);
        let Totals { income, expense } = summary::totals(&merged);
        let expected_cash = summary::expected_cash(register.initial_balance(), &merged);
        let breakdown = summary::payment_breakdown(&merged);

        Ok(SessionSummary {
            balance_cents: balance.cents(),
            total_income_cents: income.cents(),
            total_expense_cents: expense.cents(),
            expected_cash_cents: expected_cash.cents(),
            breakdown,
            register,
        })
    }

    /// Closure history for a store, newest first, each closure paired
    /// with the merged operations between it and the prior closure.
    pub async fn closure_history(
        &self,
        store_id: &str,
    ) -> EngineResult<Vec<ClosureWithOperations>> {
        let closures = self.db.closures().for_store(store_id).await?;
        let mut history = Vec::with_capacity(closures.len());

        for (index, closure) in closures.iter().enumerate() {
            // The prior closure (next in the newest-first list) bounds
            // this shift from below.
            let since = closures
                .get(index + 1)
                .map(|prior| prior.created_at)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            let raw = self
                .db
                .transactions()
                .for_store_between(store_id, since, closure.created_at)
                .await?;
            let operations: Vec<Transaction> = merge_transactions(raw)
                .into_iter()
                .filter(|tx| tx.created_at > since && tx.created_at <= closure.created_at)
                .collect();

            let breakdown = summary::payment_breakdown(&operations);
            history.push(ClosureWithOperations {
                closure: closure.clone(),
                operations,
                breakdown,
            });
        }

        Ok(history)
    }

    /// The latest closure of a given calendar day (UTC), if any — the
    /// "balance of a past day" panel query.
    pub async fn closure_for_date(
        &self,
        store_id: &str,
        date: NaiveDate,
    ) -> EngineResult<Option<Closure>> {
        let (start, end) = day_bounds(date);
        Ok(self
            .db
            .closures()
            .latest_for_store_between(store_id, start, end)
            .await?)
    }
}

/// Projects a closure into the ledger stream as a CLOSURE-kind entry:
/// amount = counted cash, description = operator notes (or the default),
/// no tenders.
fn closure_projection(closure: &Closure) -> Transaction {
    Transaction {
        id: format!("closure-{}", closure.id),
        register_id: closure.register_id.clone(),
        kind: TransactionKind::Closure,
        amount_cents: closure.closing_balance_cents,
        currency: DEFAULT_CURRENCY.to_string(),
        employee: closure.employee.clone(),
        description: if closure.notes.trim().is_empty() {
            CLOSURE_DESCRIPTION.to_string()
        } else {
            closure.notes.clone()
        },
        tenders: Vec::new(),
        voucher: None,
        client_name: None,
        client_document: None,
        client_document_type: None,
        created_at: closure.created_at,
    }
}
