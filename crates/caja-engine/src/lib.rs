//! # caja-engine: Drawer Session Services
//!
//! The operational surface of the cash-drawer ledger. A transport layer
//! (HTTP handler, desktop IPC command) calls these services and never
//! touches SQL or merge internals directly.
//!
//! ## Control Flow
//! ```text
//! raw records ──► tender classifier ──► merge engine ──► canonical ledger
//!                       (caja-core)      (caja-core)          │
//!                                                             ▼
//!   RegisterService ── running balance            LedgerService ── day view,
//!   PostingService ── validated entries                  session summary,
//!   ClosureService ── reconciliation                     closure history
//! ```
//!
//! ## Modules
//!
//! - [`registers`] - open-drawer lifecycle and derived balances
//! - [`postings`] - validated manual income/expense entries
//! - [`closures`] - end-of-shift reconciliation and reopen
//! - [`ledger`] - the query facade (pre-merged views)
//! - [`error`] - the engine's business-rule error taxonomy

pub mod closures;
pub mod error;
pub mod ledger;
pub mod postings;
pub mod registers;

mod dates;

pub use closures::{CloseDrawer, ClosureService, ReopenRegister};
pub use error::{EngineError, EngineResult};
pub use ledger::{ClosureWithOperations, LedgerService, SessionSummary};
pub use postings::{NewPosting, PostingService};
pub use registers::{OpenRegister, RegisterBalance, RegisterService};
