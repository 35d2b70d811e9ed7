//! # Repository Module
//!
//! Repository implementations for the ledger schema.
//!
//! ## Repository Pattern
//! ```text
//! engine service
//!      │  db.registers().find_active("store-1")
//!      ▼
//! RegisterRepository ── SQL ──► SQLite
//! ```
//!
//! Each repository owns the SQL for one aggregate and hands out
//! `caja_core` domain types; row structs never leave this module.
//!
//! ## Available Repositories
//!
//! - [`register::RegisterRepository`] - drawer session lifecycle rows
//! - [`transaction::TransactionRepository`] - immutable ledger entries + tenders
//! - [`closure::ClosureRepository`] - end-of-shift reconciliation records

pub mod closure;
pub mod register;
pub mod transaction;
