//! # Tender Classification
//!
//! Normalizes payment-method labels into canonical tender categories and
//! resolves per-tender amounts.
//!
//! ## Two-Stage Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Structured path (preferred)                                            │
//! │    caller supplies {method, amount} pairs ──► classify ──► done         │
//! │                                                                         │
//! │  Text fallback (isolated, best-effort)                                  │
//! │    "Pago vía Visa y Efectivo: 20.50"                                    │
//! │         │ strip intro phrases                                           │
//! │         │ split on separators (, / | ; & + dashes, " y ", " and ")      │
//! │         │ extract trailing amount tokens                                │
//! │         ▼                                                               │
//! │    ["Visa", "Efectivo: 20.50"] ──► classify ──► [Card, Cash(20.50)]     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Classification is case- and diacritic-insensitive substring matching,
//! first match wins, checked in a fixed order (cash before cards, so
//! "efectivo contra tarjeta" notes classify as cash).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{TenderLine, TransactionKind};

// =============================================================================
// Canonical Categories
// =============================================================================

/// Canonical tender category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderKind {
    /// Physical cash ("efectivo") — the only tender counted in drawer
    /// reconciliation.
    Cash,
    /// Card brands and generic card labels.
    Card,
    /// Bank transfer.
    Transfer,
    /// Yape mobile wallet.
    Yape,
    /// Plin mobile wallet.
    Plin,
    /// Anything unrecognized; the trimmed original label is kept as-is.
    Other,
}

impl TenderKind {
    /// Uppercase display label for breakdown summaries. `Other` has no
    /// fixed label; use [`category_label`] for the per-entry fallback.
    pub const fn canonical_label(&self) -> &'static str {
        match self {
            TenderKind::Cash => "EFECTIVO",
            TenderKind::Card => "TARJETA",
            TenderKind::Transfer => "TRANSFERENCIA",
            TenderKind::Yape => "YAPE",
            TenderKind::Plin => "PLIN",
            TenderKind::Other => "OTRO",
        }
    }
}

/// A classified tender with its (possibly still implicit) amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderEntry {
    /// Trimmed original label.
    pub label: String,
    pub kind: TenderKind,
    /// Explicit amount, either structured or extracted from a trailing
    /// "label: 20.50" suffix. `None` = implicit, resolved by
    /// [`resolve_amounts`].
    pub amount: Option<Money>,
}

/// A tender entry with its resolved, signed amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTender {
    pub label: String,
    pub kind: TenderKind,
    pub amount: Money,
}

// =============================================================================
// Classification
// =============================================================================

/// Lowercases and strips the Spanish diacritics that show up in tender
/// labels, so "Crédito" and "credito" classify identically.
pub fn fold(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            _ => c,
        })
        .collect()
}

const CARD_KEYWORDS: &[&str] = &[
    "tarjeta",
    "visa",
    "master",
    "credito",
    "debito",
    "amex",
    "american express",
];

/// Classifies a raw label into its canonical category.
///
/// First match wins, checked in order: cash, card, transfer, yape, plin.
pub fn classify(label: &str) -> TenderKind {
    let folded = fold(label);
    if folded.contains("efectivo") {
        TenderKind::Cash
    } else if CARD_KEYWORDS.iter().any(|kw| folded.contains(kw)) {
        TenderKind::Card
    } else if folded.contains("transfer") {
        TenderKind::Transfer
    } else if folded.contains("yape") {
        TenderKind::Yape
    } else if folded.contains("plin") {
        TenderKind::Plin
    } else {
        TenderKind::Other
    }
}

/// Breakdown grouping key: the canonical label for recognized categories,
/// the uppercased original label for everything else.
pub fn category_label(label: &str) -> String {
    match classify(label) {
        TenderKind::Other => normalize_whitespace(label).to_uppercase(),
        kind => kind.canonical_label().to_string(),
    }
}

// =============================================================================
// Amount Extraction
// =============================================================================

static AMOUNT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("amount token regex"));

/// Extracts the explicit amount from a "label: amount" style string: the
/// last numeric token, with `,` and `.` both accepted as decimal
/// separators (the one appearing last is the decimal point).
///
/// Returns `None` when the label carries no numeric token at all — the
/// amount is implicit and must be resolved by the caller.
pub fn extract_amount(label: &str) -> Option<Money> {
    let token = AMOUNT_TOKEN.find_iter(label).last()?;
    Money::parse(token.as_str())
}

// =============================================================================
// Label Splitting (text fallback)
// =============================================================================

static METHOD_INTROS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)m[eé]todos?\s+de\s+pago\s*[:\-]?\s*",
        r"(?i)pago\s+v[ií]a\s*",
        r"(?i)pago\s+con\s*",
        r"(?i)pagado\s+con\s*",
        r"(?i)pagado\s+v[ií]a\s*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("method intro regex"))
    .collect()
});

static CONNECTIVES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:y|e|and)\s+").expect("connective regex"));

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/,|;]+").expect("separator regex"));

/// Collapses runs of whitespace and trims.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a free-form tender string into individual method candidates.
///
/// "Pago vía Visa y Efectivo" → ["Visa", "Efectivo"]. Returns an empty
/// vector when nothing survives the cleanup.
pub fn split_candidates(value: &str) -> Vec<String> {
    let mut sanitized = value.to_string();
    for intro in METHOD_INTROS.iter() {
        sanitized = intro.replace_all(&sanitized, "").into_owned();
    }

    let sanitized = sanitized.replace(['–', '—'], ",");
    let sanitized = CONNECTIVES.replace_all(&sanitized, ",");
    let sanitized = sanitized.replace(['&', '+'], ",");
    let sanitized = SEPARATORS.replace_all(&sanitized, ",");

    sanitized
        .split(',')
        .map(|segment| normalize_whitespace(segment.trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '-')))
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Normalizes a batch of raw tender labels: splits composite labels,
/// dedupes case-insensitively, preserves first-seen order and casing.
pub fn normalize_methods<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut result: Vec<String> = Vec::new();

    let mut push = |candidate: String| {
        let cleaned = normalize_whitespace(candidate.trim_matches('|'));
        if cleaned.is_empty() {
            return;
        }
        let key = cleaned.to_uppercase();
        if !seen.contains(&key) {
            seen.push(key);
            result.push(cleaned);
        }
    };

    for label in labels {
        let candidates = split_candidates(label);
        if candidates.is_empty() {
            push(label.to_string());
        } else {
            for candidate in candidates {
                push(candidate);
            }
        }
    }

    result
}

// =============================================================================
// Free-Text Method Recovery
// =============================================================================

static TEXT_METHOD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)pago\s+v[ií]a\s+([^.;]+)",
        r"(?i)m[eé]todos?\s+de\s+pago[:\s]+([^.;]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("text method regex"))
    .collect()
});

static TEXT_METHOD_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[,/|]|\by\b").expect("text method split regex"));

/// Scans a sale description for tender hints ("pago vía X", "método de
/// pago: X") and returns the uppercased method names found, first-seen
/// order, deduplicated.
///
/// Best-effort only: feeds the merge engine's tender union, never the
/// ledger math.
pub fn methods_from_text(value: &str) -> Vec<String> {
    let normalized = normalize_whitespace(value);
    let mut found: Vec<String> = Vec::new();

    for pattern in TEXT_METHOD_PATTERNS.iter() {
        for captures in pattern.captures_iter(&normalized) {
            let segment = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            for part in TEXT_METHOD_SPLIT.split(segment) {
                let cleaned = normalize_whitespace(
                    part.trim_matches(|c: char| c.is_whitespace() || c == '-'),
                );
                if cleaned.len() > 1 {
                    let upper = cleaned.to_uppercase();
                    if !found.contains(&upper) {
                        found.push(upper);
                    }
                }
            }
        }
    }

    found
}

// =============================================================================
// Entry Construction & Amount Resolution
// =============================================================================

/// Builds a classified entry from a recorded tender line.
///
/// A structured amount wins; otherwise the trailing amount suffix of the
/// label is extracted as the explicit amount.
pub fn entry_from_line(line: &TenderLine) -> TenderEntry {
    let label = normalize_whitespace(&line.label);
    TenderEntry {
        kind: classify(&label),
        amount: line.amount().or_else(|| extract_amount(&label)),
        label,
    }
}

/// Resolves implicit amounts and applies the sign policy.
///
/// - Explicit amounts are respected as-is.
/// - The remainder (transaction amount − explicit sum, when positive) goes
///   to the sole implicit entry, or is split evenly across several implicit
///   entries (leftover cents to the earliest entries).
/// - A sole implicit tender therefore takes the full transaction amount.
/// - For expense transactions, unsigned amounts become negative cash
///   movements; amounts already carrying a sign are respected.
pub fn resolve_amounts(
    entries: &[TenderEntry],
    total: Money,
    kind: TransactionKind,
) -> Vec<ResolvedTender> {
    let explicit_sum: i64 = entries
        .iter()
        .filter_map(|e| e.amount.map(|m| m.cents()))
        .sum();
    let implicit_count = entries.iter().filter(|e| e.amount.is_none()).count() as i64;

    let remainder = (total.cents() - explicit_sum).max(0);
    let (share, mut leftover) = if implicit_count > 0 {
        (remainder / implicit_count, remainder % implicit_count)
    } else {
        (0, 0)
    };

    entries
        .iter()
        .map(|entry| {
            let unsigned = match entry.amount {
                Some(amount) => amount,
                None => {
                    let extra = if leftover > 0 { 1 } else { 0 };
                    leftover -= extra;
                    Money::from_cents(share + extra)
                }
            };
            let amount = match kind {
                TransactionKind::Expense if !unsigned.is_negative() => -unsigned,
                _ => unsigned,
            };
            ResolvedTender {
                label: entry.label.clone(),
                kind: entry.kind,
                amount,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
