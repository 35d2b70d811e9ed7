//! # Sale Line-Item Extraction
//!
//! Sale postings arrive with their line items embedded in the description:
//!
//! ```text
//! "Venta registrada: Coca Cola 500ml - Cantidad: 2, Precio Unitario: 3.50 |
//!  Pan Integral - Cantidad: 1.5, Precio Unitario: 8.90"
//! ```
//!
//! This module parses that grammar back into [`SaleItem`] values for the
//! merge engine and reporting. Parsing is strictly best-effort: a
//! description that yields no items is not an error — the record still
//! merges using its raw amount.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::money::{Money, Quantity};
use crate::tender::normalize_whitespace;

// =============================================================================
// Sale Item
// =============================================================================

/// A sale line item, derived from a transaction description. Never
/// persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl SaleItem {
    /// Line total: quantity × unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.quantity.times(self.unit_price)
    }

    /// Merge key: items with the same name (case-insensitive) and unit
    /// price fold into one line with summed quantity.
    fn merge_key(&self) -> (String, i64) {
        (self.name.to_lowercase(), self.unit_price.cents())
    }
}

// =============================================================================
// Extraction
// =============================================================================

static ITEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([A-Za-z0-9().\- ]+?)(?: -)? *Cantidad: *([0-9.,]+) *,? *Precio *Unitario: *([0-9.,]+)",
    )
    .expect("sale item regex")
});

/// Extracts sale items from a description, folding repeated
/// `name + unit price` pairs into summed quantities.
///
/// Unparseable input yields an empty vector, never an error.
pub fn extract_sale_items(description: &str) -> Vec<SaleItem> {
    let cleaned = normalize_whitespace(description);
    let mut items: Vec<SaleItem> = Vec::new();

    for captures in ITEM_PATTERN.captures_iter(&cleaned) {
        let name = normalize_whitespace(captures.get(1).map(|m| m.as_str()).unwrap_or(""));
        if name.is_empty() {
            continue;
        }
        let Some(quantity) = captures.get(2).and_then(|m| Quantity::parse(m.as_str())) else {
            continue;
        };
        let Some(unit_price) = captures.get(3).and_then(|m| Money::parse(m.as_str())) else {
            continue;
        };

        merge_item(
            &mut items,
            SaleItem {
                name,
                quantity,
                unit_price,
            },
        );
    }

    items
}

/// Folds an item into the list: same name + unit price sums quantities,
/// otherwise appends (insertion order is preserved for rendering).
pub fn merge_item(items: &mut Vec<SaleItem>, item: SaleItem) {
    let key = item.merge_key();
    match items.iter_mut().find(|existing| existing.merge_key() == key) {
        Some(existing) => existing.quantity += item.quantity,
        None => items.push(item),
    }
}

/// Order-independent signature of an item set, used by the duplicate
/// fingerprint: sorted `name|price|quantity` tuples.
pub fn items_signature(items: &[SaleItem]) -> String {
    let mut parts: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "{}|{}|{}",
                item.name.to_lowercase(),
                item.unit_price.cents(),
                item.quantity.milli()
            )
        })
        .collect();
    parts.sort();
    parts.join(";")
}

/// Total over a merged item set.
pub fn items_total(items: &[SaleItem]) -> Money {
    items.iter().map(SaleItem::line_total).sum()
}

/// Renders items back into the canonical description grammar, so merged
/// descriptions re-parse to the same items.
pub fn render_items(items: &[SaleItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{} - Cantidad: {}, Precio Unitario: {}",
                item.name, item.quantity, item.unit_price
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

// =============================================================================
// Description Splitting
// =============================================================================

/// The "venta registrada:" marker dividing a sale description into the
/// operator prefix and the line-item suffix.
const SALE_MARKER: &str = "venta registrada:";

static PAYMENT_DETAIL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)pago\s+v[ií]a[^.,;|]*",
        r"(?i)pago\s+con[^.,;|]*",
        r"(?i)m[eé]todos?\s+de\s+pago\s*:[^.|;]*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("payment detail regex"))
    .collect()
});

static PUNCT_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;]+").expect("punct run regex"));

/// Removes embedded payment-method phrases from a description fragment, so
/// two fetches of the same sale with and without tender hints normalize to
/// the same key.
pub fn strip_payment_details(value: &str) -> String {
    let mut sanitized = value.to_string();
    for pattern in PAYMENT_DETAIL_PATTERNS.iter() {
        sanitized = pattern.replace_all(&sanitized, " ").into_owned();
    }
    let sanitized = PUNCT_RUNS.replace_all(&sanitized, " ");
    normalize_whitespace(&sanitized)
}

/// A sale description split at the "venta registrada:" marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionParts {
    /// Operator text before the marker (whole description if no marker).
    pub prefix: String,
    /// The marker and everything after it; empty if no marker.
    pub suffix: String,
    /// Lowercased, whitespace-collapsed prefix with payment details
    /// stripped — the description component of the aggregation key.
    pub normalized: String,
}

/// Splits a description for keying: prefix / suffix / normalized prefix.
pub fn split_sale_description(description: &str) -> DescriptionParts {
    let lower = description.to_lowercase();

    let (prefix, suffix) = match lower.find(SALE_MARKER) {
        Some(idx) => (
            description[..idx].trim().to_string(),
            description[idx..].trim().to_string(),
        ),
        None => (description.trim().to_string(), String::new()),
    };

    let stripped = strip_payment_details(&prefix);
    let base = if stripped.is_empty() { prefix.clone() } else { stripped };

    DescriptionParts {
        normalized: normalize_whitespace(&base.to_lowercase()),
        prefix,
        suffix,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
