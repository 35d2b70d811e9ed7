//! # Domain Types
//!
//! Core domain types for the cash-drawer ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Register     │   │   Transaction   │   │     Closure     │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │        │
//! │  │  store_id       │   │  register_id    │   │  register_id    │        │
//! │  │  initial_balance│   │  kind, amount   │   │  counted cash   │        │
//! │  │  status         │   │  tenders[]      │   │  discrepancy    │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  Register 1 ──── N Transaction;  Register 1 ──── 0..1 Closure           │
//! │  A closure is terminal: a closed register never reopens.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Balance is intentionally absent from [`Register`]: it is always derived
//! from the transaction stream (see [`crate::summary`]), never stored
//! mutable state that could drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Register Status
// =============================================================================

/// Lifecycle state of a drawer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    /// Drawer is open and accepting postings.
    Open,
    /// Terminal state, reached exactly once via a closure.
    Closed,
}

impl RegisterStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RegisterStatus::Open => "open",
            RegisterStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(RegisterStatus::Open),
            "closed" => Some(RegisterStatus::Closed),
            _ => None,
        }
    }
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// Ledger entry kind. The amount itself is always non-negative; the sign
/// of a movement is implied by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money into the drawer (sales, deposits).
    Income,
    /// Money out of the drawer (withdrawals, supplier payments).
    Expense,
    /// Projection of an end-of-shift closure into the ledger stream.
    /// Never persisted as a cash transaction; closures are their own
    /// records and are projected at query time.
    Closure,
}

impl TransactionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Closure => "closure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            "closure" => Some(TransactionKind::Closure),
            _ => None,
        }
    }
}

// =============================================================================
// Register
// =============================================================================

/// One open-to-close lifecycle of a physical cash drawer for a store.
///
/// Invariant (enforced at the data layer): at most one register with
/// `status == Open` per store at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Register {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store this drawer belongs to.
    pub store_id: String,

    /// Display name ("Caja Principal").
    pub name: String,

    /// Operator-counted cash at open, in cents.
    pub initial_balance_cents: i64,

    pub status: RegisterStatus,

    pub created_at: DateTime<Utc>,
}

impl Register {
    #[inline]
    pub fn initial_balance(&self) -> Money {
        Money::from_cents(self.initial_balance_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == RegisterStatus::Open
    }
}

// =============================================================================
// Tender Line
// =============================================================================

/// One tender of a transaction, as recorded.
///
/// `amount_cents` is the structured split amount when the caller supplied
/// one; `None` means the amount is implicit and is resolved at aggregation
/// time (see [`crate::tender`]). Legacy labels may also embed the amount as
/// a trailing "label: 20.50" suffix, which the classifier extracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderLine {
    pub label: String,
    pub amount_cents: Option<i64>,
}

impl TenderLine {
    pub fn new(label: impl Into<String>) -> Self {
        TenderLine {
            label: label.into(),
            amount_cents: None,
        }
    }

    pub fn with_amount(label: impl Into<String>, amount_cents: i64) -> Self {
        TenderLine {
            label: label.into(),
            amount_cents: Some(amount_cents),
        }
    }

    #[inline]
    pub fn amount(&self) -> Option<Money> {
        self.amount_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An immutable ledger entry.
///
/// Never mutated after creation; corrections are new compensating entries.
/// The same type doubles as the merged, canonical view the query facade
/// hands out (including closure projections, `kind == Closure`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub register_id: String,
    pub kind: TransactionKind,

    /// Always non-negative; the sign of the movement is implied by `kind`.
    pub amount_cents: i64,

    /// Display currency symbol, carried but never converted.
    pub currency: String,

    /// Operator who recorded the entry.
    pub employee: String,

    /// Free text; sale entries embed line items and tender hints.
    pub description: String,

    /// Ordered tender list.
    pub tenders: Vec<TenderLine>,

    /// Receipt reference, "serie-correlativo".
    pub voucher: Option<String>,

    pub client_name: Option<String>,
    pub client_document: Option<String>,
    pub client_document_type: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Trimmed currency symbol, falling back to the workspace default.
    pub fn currency_symbol(&self) -> &str {
        let trimmed = self.currency.trim();
        if trimmed.is_empty() {
            crate::DEFAULT_CURRENCY
        } else {
            trimmed
        }
    }
}

// =============================================================================
// Closure
// =============================================================================

/// End-of-shift reconciliation record; terminal for its register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Closure {
    pub id: String,
    pub register_id: String,
    pub employee: String,

    /// The register's initial balance at open.
    pub opening_balance_cents: i64,

    /// Operator-counted cash in the drawer.
    pub closing_balance_cents: i64,

    /// Derived: opening + cash income − cash expense since open.
    pub expected_cash_cents: i64,

    /// counted − expected. Positive = surplus, negative = shortage.
    pub discrepancy_cents: i64,

    /// All tenders, not just cash.
    pub total_income_cents: i64,
    pub total_expense_cents: i64,

    /// Carry-forward suggestion for the next session's opening balance.
    /// Defaults to the counted cash; operator-overridable.
    pub next_opening_balance_cents: i64,

    pub notes: String,

    pub created_at: DateTime<Utc>,
}

impl Closure {
    #[inline]
    pub fn discrepancy(&self) -> Money {
        Money::from_cents(self.discrepancy_cents)
    }

    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.discrepancy_cents == 0
    }
}

// =============================================================================
// Structured Tender Input
// =============================================================================

/// A structured `{method, amount}` pair supplied by a caller when posting.
///
/// This is the preferred path: structured tenders bypass the free-text
/// fallback entirely, so ledger correctness never depends on text parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderInput {
    pub method: String,
    pub amount_cents: Option<i64>,
}

impl TenderInput {
    pub fn implicit(method: impl Into<String>) -> Self {
        TenderInput {
            method: method.into(),
            amount_cents: None,
        }
    }

    pub fn with_amount(method: impl Into<String>, amount_cents: i64) -> Self {
        TenderInput {
            method: method.into(),
            amount_cents: Some(amount_cents),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
