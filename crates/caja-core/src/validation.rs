//! # Business-Rule Validation
//!
//! Input validation for postings, register lifecycle and closures.
//!
//! Validation runs before any state is touched; the data layer's
//! constraints (uniqueness, foreign keys) are the second line of defense
//! behind these checks, not a replacement for them.

use crate::error::{ValidationError, ValidationResult};
use crate::tender::category_label;
use crate::types::{TenderInput, TransactionKind};

/// A store identifier must be present.
pub fn validate_store_id(store_id: &str) -> ValidationResult<()> {
    if store_id.trim().is_empty() {
        return Err(ValidationError::required("store_id"));
    }
    Ok(())
}

/// The operator recording an entry must be named.
pub fn validate_employee(employee: &str) -> ValidationResult<()> {
    if employee.trim().is_empty() {
        return Err(ValidationError::required("employee"));
    }
    Ok(())
}

/// Posting amounts are strictly positive; the sign of the movement is
/// carried by the transaction kind, never the amount.
pub fn validate_posting_amount(amount_cents: i64) -> ValidationResult<()> {
    if amount_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Manual postings are income or expense; closure entries are produced by
/// the reconciliation engine only.
pub fn validate_posting_kind(kind: TransactionKind) -> ValidationResult<()> {
    match kind {
        TransactionKind::Income | TransactionKind::Expense => Ok(()),
        TransactionKind::Closure => Err(ValidationError::InvalidFormat {
            field: "kind".to_string(),
            reason: "must be income or expense".to_string(),
        }),
    }
}

/// Counted cash at closure can be zero (empty drawer) but never negative.
pub fn validate_counted_cash(amount_cents: i64) -> ValidationResult<()> {
    if amount_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "counted_cash".to_string(),
        });
    }
    Ok(())
}

/// Opening balances (register open, carry-forward override) are
/// non-negative.
pub fn validate_opening_balance(amount_cents: i64) -> ValidationResult<()> {
    if amount_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "opening_balance".to_string(),
        });
    }
    Ok(())
}

/// Validates a structured tender split against the posting amount.
///
/// - No duplicate canonical category in one transaction.
/// - Explicit split amounts are strictly positive.
/// - When every tender carries an amount, the amounts must sum exactly to
///   the posting amount.
/// - When some tenders are implicit, the explicit amounts must leave a
///   positive remainder for them to absorb.
///
/// An empty tender list is valid: the posting then has no split to check.
pub fn validate_tender_split(tenders: &[TenderInput], amount_cents: i64) -> ValidationResult<()> {
    let mut categories: Vec<String> = Vec::new();
    let mut explicit_sum: i64 = 0;
    let mut implicit = 0usize;

    for tender in tenders {
        if tender.method.trim().is_empty() {
            return Err(ValidationError::required("tender method"));
        }

        let category = category_label(&tender.method);
        if categories.contains(&category) {
            return Err(ValidationError::DuplicateTender { category });
        }
        categories.push(category);

        match tender.amount_cents {
            Some(cents) => {
                if cents <= 0 {
                    return Err(ValidationError::MustBePositive {
                        field: "tender amount".to_string(),
                    });
                }
                explicit_sum += cents;
            }
            None => implicit += 1,
        }
    }

    if tenders.is_empty() {
        return Ok(());
    }

    if implicit == 0 {
        if explicit_sum != amount_cents {
            return Err(ValidationError::TenderSumMismatch {
                expected_cents: amount_cents,
                actual_cents: explicit_sum,
            });
        }
    } else if explicit_sum >= amount_cents {
        return Err(ValidationError::TenderSumMismatch {
            expected_cents: amount_cents,
            actual_cents: explicit_sum,
        });
    }

    Ok(())
}

/// A posting must not drive the drawer's running balance below zero.
pub fn validate_resulting_balance(balance_cents: i64) -> ValidationResult<()> {
    if balance_cents < 0 {
        return Err(ValidationError::NegativeBalance {
            balance_cents,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
