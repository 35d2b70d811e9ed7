//! # caja-core: Pure Ledger Logic
//!
//! This crate is the heart of the Caja cash-drawer engine. It contains the
//! register ledger's business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Caja Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                caja-engine (services, facade)                   │    │
//! │  │   open register ──► post income/expense ──► close drawer        │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ caja-core (THIS CRATE) ★                        │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐   │    │
//! │  │   │  money  │ │ tender  │ │  merge  │ │ summary │ │validate │   │    │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘   │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                    caja-db (SQLite repositories)                │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Register, Transaction, Closure, ...)
//! - [`money`] - Integer-cent money and milli-unit quantities
//! - [`tender`] - Payment-tender classification and amount resolution
//! - [`sale_items`] - Sale line-item extraction from free-text descriptions
//! - [`merge`] - Deduplication/aggregation of raw transaction records
//! - [`summary`] - Derived balances, totals and payment breakdowns
//! - [`validation`] - Business-rule validation
//! - [`error`] - Validation error types
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output, always
//! 2. **Integer money**: all monetary values in cents (i64), no floats
//! 3. **Derived balances**: a balance is never stored state, it is computed
//!    from the transaction stream on demand
//! 4. **Isolated text parsing**: the best-effort extraction of tenders and
//!    sale items from descriptions lives in [`tender`] and [`sale_items`];
//!    the ledger math never depends on its accuracy

pub mod error;
pub mod merge;
pub mod money;
pub mod sale_items;
pub mod summary;
pub mod tender;
pub mod types;
pub mod validation;

pub use error::{ValidationError, ValidationResult};
pub use money::{Money, Quantity};
pub use types::*;

/// Currency symbol used when a transaction does not carry one.
///
/// Currency is carried per transaction and never converted; this is only
/// the display default for records created without an explicit symbol.
pub const DEFAULT_CURRENCY: &str = "S/.";

/// Description given to closure entries that carry no operator notes.
pub const CLOSURE_DESCRIPTION: &str = "Cierre de caja";
