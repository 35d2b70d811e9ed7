//! # Derived Balances & Payment Summaries
//!
//! Every figure here is computed on demand from the transaction stream —
//! there is no stored running balance anywhere in the system, so the
//! ledger can never drift from its own entries.
//!
//! ```text
//! current balance  = initial + Σ income − Σ expense        (all tenders)
//! expected cash    = opening + Σ cash income − Σ cash expense
//! discrepancy      = counted − expected cash
//! ```
//!
//! Closure projections in the stream are markers, not balance
//! contributors: they gate the "since last closure" window but never move
//! a total.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::tender::{self, entry_from_line, TenderKind};
use crate::types::{Transaction, TransactionKind};

// =============================================================================
// Balance & Totals
// =============================================================================

/// Running balance over a register's stream: initial + income − expense.
/// Closure entries contribute nothing.
pub fn current_balance(initial: Money, transactions: &[Transaction]) -> Money {
    transactions
        .iter()
        .fold(initial, |balance, tx| match tx.kind {
            TransactionKind::Income => balance + tx.amount(),
            TransactionKind::Expense => balance - tx.amount(),
            TransactionKind::Closure => balance,
        })
}

/// Income/expense totals over all tenders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub income: Money,
    pub expense: Money,
}

pub fn totals(transactions: &[Transaction]) -> Totals {
    let mut result = Totals::default();
    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => result.income += tx.amount(),
            TransactionKind::Expense => result.expense += tx.amount(),
            TransactionKind::Closure => {}
        }
    }
    result
}

// =============================================================================
// Payment Breakdown
// =============================================================================

/// Signed total for one canonical tender category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderTotal {
    /// Display label ("EFECTIVO", "TARJETA", or the raw uppercased label
    /// for uncategorized tenders).
    pub category: String,
    pub kind: TenderKind,
    pub amount_cents: i64,
}

impl TenderTotal {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Per-category tender summary over a batch of ledger entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    /// Currency symbol resolved from the entries (first non-empty wins).
    pub currency: String,
    /// First-seen category order.
    pub totals: Vec<TenderTotal>,
}

impl PaymentBreakdown {
    /// Total for one category, zero when absent.
    pub fn total_for(&self, category: &str) -> Money {
        self.totals
            .iter()
            .find(|t| t.category == category)
            .map(TenderTotal::amount)
            .unwrap_or_else(Money::zero)
    }
}

/// Classifies every entry's tenders, resolves implicit amounts, signs them
/// by transaction kind and sums per canonical category.
///
/// Used for both the open-session running summary and each historical
/// closure's summary.
pub fn payment_breakdown(transactions: &[Transaction]) -> PaymentBreakdown {
    let mut breakdown = PaymentBreakdown {
        currency: crate::DEFAULT_CURRENCY.to_string(),
        totals: Vec::new(),
    };
    let mut currency_resolved = false;

    for tx in transactions {
        if tx.kind == TransactionKind::Closure {
            continue;
        }
        if !currency_resolved && !tx.currency.trim().is_empty() {
            breakdown.currency = tx.currency.trim().to_string();
            currency_resolved = true;
        }

        for resolved in resolve_transaction_tenders(tx) {
            let category = tender::category_label(&resolved.label);
            match breakdown
                .totals
                .iter_mut()
                .find(|total| total.category == category)
            {
                Some(total) => total.amount_cents += resolved.amount.cents(),
                None => breakdown.totals.push(TenderTotal {
                    category,
                    kind: resolved.kind,
                    amount_cents: resolved.amount.cents(),
                }),
            }
        }
    }

    breakdown
}

/// One transaction's tenders with resolved, signed amounts.
fn resolve_transaction_tenders(tx: &Transaction) -> Vec<tender::ResolvedTender> {
    let entries: Vec<_> = tx.tenders.iter().map(entry_from_line).collect();
    tender::resolve_amounts(&entries, tx.amount(), tx.kind)
}

// =============================================================================
// Cash Reconciliation
// =============================================================================

/// Net physical-cash movement over the stream: Σ resolved cash-tender
/// amounts, signed by transaction kind. Non-cash tenders are not
/// physically countable and are excluded.
pub fn cash_movement(transactions: &[Transaction]) -> Money {
    transactions
        .iter()
        .filter(|tx| tx.kind != TransactionKind::Closure)
        .flat_map(resolve_transaction_tenders)
        .filter(|resolved| resolved.kind == TenderKind::Cash)
        .map(|resolved| resolved.amount)
        .sum()
}

/// Cash the drawer should physically hold: opening balance plus the net
/// cash movement since the register opened.
pub fn expected_cash(opening: Money, transactions: &[Transaction]) -> Money {
    opening + cash_movement(transactions)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TenderLine;
    use chrono::Utc;

    fn tx(kind: TransactionKind, amount_cents: i64, tenders: Vec<TenderLine>) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            register_id: "reg-1".to_string(),
            kind,
            amount_cents,
            currency: "S/.".to_string(),
            employee: "ana".to_string(),
            description: String::new(),
            tenders,
            voucher: None,
            client_name: None,
            client_document: None,
            client_document_type: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn balance_conservation() {
        let stream = vec![
            tx(TransactionKind::Income, 5000, vec![]),
            tx(TransactionKind::Expense, 2000, vec![]),
            tx(TransactionKind::Income, 1500, vec![]),
            tx(TransactionKind::Closure, 9999, vec![]),
            tx(TransactionKind::Expense, 500, vec![]),
        ];
        // 100.00 + 50.00 − 20.00 + 15.00 − 5.00; the closure is a marker
        assert_eq!(
            current_balance(Money::from_cents(10_000), &stream),
            Money::from_cents(14_000)
        );

        let t = totals(&stream);
        assert_eq!(t.income, Money::from_cents(6500));
        assert_eq!(t.expense, Money::from_cents(2500));
    }

    #[test]
    fn expected_cash_counts_only_cash_tenders() {
        let stream = vec![
            tx(
                TransactionKind::Income,
                5000,
                vec![TenderLine::new("Efectivo")],
            ),
            tx(
                TransactionKind::Expense,
                2000,
                vec![TenderLine::new("Efectivo")],
            ),
            // Non-cash income is not countable cash
            tx(TransactionKind::Income, 8000, vec![TenderLine::new("Yape")]),
        ];
        // 100.00 + 50.00 − 20.00 = 130.00
        assert_eq!(
            expected_cash(Money::from_cents(10_000), &stream),
            Money::from_cents(13_000)
        );
    }

    #[test]
    fn split_tender_uses_explicit_cash_amount() {
        let stream = vec![tx(
            TransactionKind::Income,
            10_000,
            vec![
                TenderLine::with_amount("Efectivo", 6000),
                TenderLine::with_amount("Tarjeta", 4000),
            ],
        )];
        assert_eq!(cash_movement(&stream), Money::from_cents(6000));
    }

    #[test]
    fn implicit_cash_share_splits_evenly() {
        let stream = vec![tx(
            TransactionKind::Income,
            10_000,
            vec![TenderLine::new("Efectivo"), TenderLine::new("Yape")],
        )];
        assert_eq!(cash_movement(&stream), Money::from_cents(5000));
    }

    #[test]
    fn breakdown_signs_amounts_by_kind() {
        let stream = vec![
            tx(
                TransactionKind::Income,
                10_000,
                vec![
                    TenderLine::with_amount("Tarjeta", 6000),
                    TenderLine::with_amount("Yape", 4000),
                ],
            ),
            tx(
                TransactionKind::Expense,
                1500,
                vec![TenderLine::new("Efectivo")],
            ),
            tx(TransactionKind::Income, 2500, vec![TenderLine::new("Visa")]),
        ];

        let breakdown = payment_breakdown(&stream);
        assert_eq!(breakdown.currency, "S/.");
        // Visa folds into the TARJETA category
        assert_eq!(breakdown.total_for("TARJETA"), Money::from_cents(8500));
        assert_eq!(breakdown.total_for("YAPE"), Money::from_cents(4000));
        assert_eq!(breakdown.total_for("EFECTIVO"), Money::from_cents(-1500));
        assert_eq!(breakdown.total_for("PLIN"), Money::zero());
    }

    #[test]
    fn uncategorized_labels_keep_their_own_bucket() {
        let stream = vec![tx(
            TransactionKind::Income,
            3000,
            vec![TenderLine::new("Vale de despensa")],
        )];
        let breakdown = payment_breakdown(&stream);
        assert_eq!(
            breakdown.total_for("VALE DE DESPENSA"),
            Money::from_cents(3000)
        );
        assert_eq!(breakdown.totals[0].kind, TenderKind::Other);
    }

    #[test]
    fn closure_entries_are_excluded_from_breakdown() {
        let stream = vec![tx(
            TransactionKind::Closure,
            13_000,
            vec![TenderLine::new("Efectivo")],
        )];
        assert!(payment_breakdown(&stream).totals.is_empty());
        assert_eq!(cash_movement(&stream), Money::zero());
    }
}
