//! # Validation Errors
//!
//! Input-validation error types for caja-core.
//!
//! Validation errors carry the offending field so callers can surface them
//! verbatim. Business-rule rejections (conflicts, state violations) live in
//! the engine crate's error taxonomy; this module only covers malformed or
//! out-of-range input.
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Errors are enum variants, never String
//! 3. Each variant maps to a user-facing message

use thiserror::Error;

/// Input validation errors.
///
/// Surfaced to the caller verbatim with the offending field; a validation
/// failure indicates bad input, never a transient fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive (amounts of postings).
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative (counted cash, opening balances).
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (unparseable amount, bad enum label).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same canonical tender category appears twice in one transaction.
    #[error("duplicate tender category: {category}")]
    DuplicateTender { category: String },

    /// Explicit tender splits do not add up to the transaction amount.
    #[error("tender amounts sum to {actual_cents} cents, expected {expected_cents}")]
    TenderSumMismatch {
        expected_cents: i64,
        actual_cents: i64,
    },

    /// The posting would drive the drawer's running balance below zero.
    #[error("balance cannot go negative: {balance_cents} cents after posting")]
    NegativeBalance { balance_cents: i64 },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
