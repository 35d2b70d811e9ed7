//! # Posting Service
//!
//! Validated manual income/expense entries.
//!
//! Validation order, all before any write:
//! 1. kind is income or expense (closure entries are engine-generated)
//! 2. amount is strictly positive
//! 3. structured tender split adds up and has no duplicate category
//! 4. the register exists and is open — postings against a closed
//!    register are rejected outright, never re-attributed to the next
//!    session
//! 5. an expense may not drive the derived balance below zero

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use caja_core::{
    validation, TenderInput, TenderLine, Transaction, TransactionKind, DEFAULT_CURRENCY,
};
use caja_db::Database;

use crate::error::{EngineError, EngineResult};
use crate::registers::RegisterService;

/// Request to post a manual ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPosting {
    pub register_id: String,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    /// Display currency; defaults to the workspace currency.
    pub currency: Option<String>,
    pub employee: String,
    pub description: String,
    /// Structured tender split (preferred over free-text labels).
    pub tenders: Vec<TenderInput>,
    pub voucher: Option<String>,
    pub client_name: Option<String>,
    pub client_document: Option<String>,
    pub client_document_type: Option<String>,
}

/// Service recording validated postings.
#[derive(Debug, Clone)]
pub struct PostingService {
    db: Database,
    registers: RegisterService,
}

impl PostingService {
    pub fn new(db: Database) -> Self {
        PostingService {
            registers: RegisterService::new(db.clone()),
            db,
        }
    }

    /// Posts a manual income or expense against an open register.
    pub async fn post(&self, request: NewPosting) -> EngineResult<Transaction> {
        validation::validate_posting_kind(request.kind)?;
        validation::validate_posting_amount(request.amount_cents)?;
        validation::validate_employee(&request.employee)?;
        validation::validate_tender_split(&request.tenders, request.amount_cents)?;

        let register = self
            .db
            .registers()
            .get_by_id(&request.register_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Register", &request.register_id))?;

        if !register.is_open() {
            return Err(EngineError::invalid_state(format!(
                "register {} is closed, postings are rejected",
                register.id
            )));
        }

        if request.kind == TransactionKind::Expense {
            let balance = self.registers.balance_of(&register).await?;
            validation::validate_resulting_balance(
                balance.cents() - request.amount_cents,
            )?;
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            register_id: register.id.clone(),
            kind: request.kind,
            amount_cents: request.amount_cents,
            currency: request
                .currency
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            employee: request.employee,
            description: request.description,
            tenders: request
                .tenders
                .into_iter()
                .map(|tender| TenderLine {
                    label: tender.method,
                    amount_cents: tender.amount_cents,
                })
                .collect(),
            voucher: request.voucher,
            client_name: request.client_name,
            client_document: request.client_document,
            client_document_type: request.client_document_type,
            created_at: Utc::now(),
        };

        self.db.transactions().insert(&transaction).await?;

        info!(
            transaction_id = %transaction.id,
            register_id = %transaction.register_id,
            kind = transaction.kind.as_str(),
            amount_cents = transaction.amount_cents,
            "Posting recorded"
        );
        Ok(transaction)
    }
}
