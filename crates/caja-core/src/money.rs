//! # Money and Quantity
//!
//! Integer-based monetary values and sale-item quantities.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A drawer reconciliation that is off by a binary rounding artifact      │
//! │  reads as a real cash shortage to the operator.                         │
//! │                                                                         │
//! │  OUR SOLUTION: integer cents for money, integer milli-units for         │
//! │  quantities. 1.5 kg × S/. 10.50 = 1500 × 1050 / 1000 = 1575 cents,      │
//! │  exactly.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Raw records arrive with textual amounts ("20.50", "20,50"); parsing
//! accepts both `,` and `.` as decimal separators, treating the separator
//! that appears last as the decimal point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// =============================================================================
// Money
// =============================================================================

/// A monetary value in integer cents.
///
/// - **i64 (signed)**: expenses and shortages need negative values
/// - **Single-field tuple struct**: zero-cost wrapper over i64
/// - Two-decimal precision throughout; currency symbols are carried
///   separately per transaction and never converted
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Absolute value (for surplus/shortage display).
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Parses a decimal amount string into cents.
    ///
    /// Accepts both `,` and `.` as separators. The separator appearing
    /// *last* is the decimal point; any earlier separators are treated as
    /// grouping and ignored:
    ///
    /// ```
    /// use caja_core::Money;
    ///
    /// assert_eq!(Money::parse("20.50"), Some(Money::from_cents(2050)));
    /// assert_eq!(Money::parse("20,50"), Some(Money::from_cents(2050)));
    /// assert_eq!(Money::parse("1.234,56"), Some(Money::from_cents(123_456)));
    /// assert_eq!(Money::parse("-3,4"), Some(Money::from_cents(-340)));
    /// assert_eq!(Money::parse("abc"), None);
    /// ```
    ///
    /// Fractions beyond two digits round half-up to the cent.
    pub fn parse(input: &str) -> Option<Money> {
        let compact: String = input.trim().chars().filter(|c| !c.is_whitespace()).collect();
        let (negative, digits) = match compact.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, compact.as_str()),
        };
        // A dangling separator ("3.50," captured from running text) is not
        // a decimal point.
        let digits = digits.trim_end_matches(['.', ',']);
        if digits.is_empty() {
            return None;
        }

        let (int_part, frac_part) = match digits.rfind(|c| c == '.' || c == ',') {
            Some(idx) => (&digits[..idx], &digits[idx + 1..]),
            None => (digits, ""),
        };

        // Earlier separators in the integer part are grouping marks.
        let int_digits: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
        if int_part.chars().any(|c| !c.is_ascii_digit() && c != '.' && c != ',') {
            return None;
        }
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if int_digits.is_empty() && frac_part.is_empty() {
            return None;
        }

        let whole: i64 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().ok()?
        };

        let frac_cents = match frac_part.len() {
            0 => 0,
            1 => frac_part.parse::<i64>().ok()? * 10,
            _ => {
                let cents: i64 = frac_part[..2].parse().ok()?;
                let round_up = frac_part[2..]
                    .chars()
                    .next()
                    .map(|c| c >= '5')
                    .unwrap_or(false);
                cents + i64::from(round_up)
            }
        };

        let cents = whole.checked_mul(100)?.checked_add(frac_cents)?;
        Some(Money(if negative { -cents } else { cents }))
    }
}

/// Renders as a plain two-decimal amount ("12.50", "-3.40").
///
/// Currency symbols are prepended by the caller, which knows the
/// transaction's currency.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A sale-item quantity in integer milli-units (1.5 → 1500).
///
/// Weighed goods make quantities fractional; milli-units keep the merge
/// arithmetic exact where f64 would drift across repeated aggregation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Whole units (3 → 3000 milli).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a quantity token ("2", "1.5", "0,25").
    ///
    /// Same separator rules as [`Money::parse`]; fractions beyond three
    /// digits round half-up to the milli-unit.
    pub fn parse(input: &str) -> Option<Quantity> {
        let compact: String = input.trim().chars().filter(|c| !c.is_whitespace()).collect();
        let (negative, digits) = match compact.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, compact.as_str()),
        };
        let digits = digits.trim_end_matches(['.', ',']);
        if digits.is_empty() {
            return None;
        }

        let (int_part, frac_part) = match digits.rfind(|c| c == '.' || c == ',') {
            Some(idx) => (&digits[..idx], &digits[idx + 1..]),
            None => (digits, ""),
        };

        let int_digits: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
        if int_part.chars().any(|c| !c.is_ascii_digit() && c != '.' && c != ',') {
            return None;
        }
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if int_digits.is_empty() && frac_part.is_empty() {
            return None;
        }

        let whole: i64 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().ok()?
        };

        let frac_milli = match frac_part.len() {
            0 => 0,
            n if n <= 3 => {
                let padded = format!("{frac_part:0<3}");
                padded.parse::<i64>().ok()?
            }
            _ => {
                let milli: i64 = frac_part[..3].parse().ok()?;
                let round_up = frac_part[3..]
                    .chars()
                    .next()
                    .map(|c| c >= '5')
                    .unwrap_or(false);
                milli + i64::from(round_up)
            }
        };

        let milli = whole.checked_mul(1000)?.checked_add(frac_milli)?;
        Some(Quantity(if negative { -milli } else { milli }))
    }

    /// Line total: quantity × unit price, rounded half-up to the cent.
    pub fn times(&self, unit_price: Money) -> Money {
        // i128 intermediate so large lines cannot overflow
        let raw = self.0 as i128 * unit_price.cents() as i128;
        let rounded = if raw >= 0 { (raw + 500) / 1000 } else { (raw - 500) / 1000 };
        Money::from_cents(rounded as i64)
    }
}

/// Integral quantities render without decimals ("3"), fractional ones with
/// two ("1.50") — the format sale descriptions use. A third decimal is
/// emitted only when needed so rendering always re-parses to the same
/// value.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        if abs % 1000 == 0 {
            write!(f, "{}{}", sign, abs / 1000)
        } else if abs % 10 == 0 {
            write!(f, "{}{}.{:02}", sign, abs / 1000, (abs % 1000) / 10)
        } else {
            write!(f, "{}{}.{:03}", sign, abs / 1000, abs % 1000)
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
