//! # caja-db: Database Layer
//!
//! SQLite persistence for the cash-drawer ledger.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Register, transaction and closure repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/caja.db")).await?;
//! let active = db.registers().find_active("store-1").await?;
//! ```
//!
//! The repositories speak [`caja_core`] domain types; SQL row structs stay
//! private to this crate. All queries go through the runtime `sqlx` API,
//! so the crate builds without a live database.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::closure::ClosureRepository;
pub use repository::register::RegisterRepository;
pub use repository::transaction::TransactionRepository;
