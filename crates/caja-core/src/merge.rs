//! # Transaction Merge Engine
//!
//! Deduplicates and aggregates raw transaction records into a canonical,
//! time-ordered ledger view.
//!
//! ## Why This Exists
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The same logical sale can surface as several raw records:              │
//! │                                                                         │
//! │  1. Split postings — one record per payment leg:                        │
//! │       [Tarjeta]   30.00  "Venta registrada: ..."                        │
//! │       [Efectivo]  70.00  "Venta registrada: ..."                        │
//! │                                                                         │
//! │  2. Overlapping fetches — the caller widens date windows to cover       │
//! │     timezone boundaries, so the identical record arrives twice.         │
//! │                                                                         │
//! │  Both must collapse into ONE ledger entry totalling 100.00, and         │
//! │  re-running the merge on an already-merged set must be a no-op.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm
//! 1. Each record gets an **aggregation key** `(kind, voucher, normalized
//!    description prefix, timestamp to the second, register, client)`.
//!    Records sharing the key are candidate halves of one logical sale.
//! 2. Each record also gets a **fingerprint** `(stripped prefix, voucher,
//!    sorted sale-item signature)`. An already-seen fingerprint within a
//!    group marks a true duplicate (overlapping fetch) and is discarded;
//!    a new fingerprint marks a legitimate addition (payment leg, extra
//!    line items) and is merged.
//! 3. Within a group: sale items fold by `name + unit price`, tenders
//!    union case-insensitively, the earliest voucher wins, and per-tender
//!    amounts accumulate once per distinct `(category, amount)` pair.
//! 4. The merged amount is recomputed from merged items when any parsed,
//!    else from the distinct raw amounts seen.
//! 5. Output preserves the first-seen order of each group.
//!
//! Closure projections pass through untouched: a closure partitions the
//! stream, it is never merge material.

use std::collections::{HashMap, HashSet};

use crate::money::Money;
use crate::sale_items::{
    extract_sale_items, items_signature, items_total, merge_item, render_items,
    split_sale_description, strip_payment_details, DescriptionParts, SaleItem,
};
use crate::tender::{
    self, category_label, entry_from_line, methods_from_text, normalize_whitespace,
    split_candidates,
};
use crate::types::{TenderLine, Transaction, TransactionKind};

// =============================================================================
// Merge
// =============================================================================

/// Merges a batch of raw records into the canonical ledger view.
///
/// Idempotent: `merge_transactions(merge_transactions(x)) ==
/// merge_transactions(x)` for any batch `x`. Records that cannot be parsed
/// for sale items still merge using their raw amount — nothing is dropped.
pub fn merge_transactions(records: Vec<Transaction>) -> Vec<Transaction> {
    let mut passthrough: Vec<(usize, Transaction)> = Vec::new();
    let mut groups: Vec<Aggregation> = Vec::new();
    let mut group_by_key: HashMap<String, usize> = HashMap::new();

    for (order, tx) in records.into_iter().enumerate() {
        if tx.kind == TransactionKind::Closure {
            passthrough.push((order, tx));
            continue;
        }

        let items = extract_sale_items(&tx.description);
        let parts = split_sale_description(&tx.description);
        let key = aggregation_key(&tx, &parts);
        let fingerprint = duplicate_fingerprint(&tx, &parts, &items);

        let group_index = match group_by_key.get(&key) {
            Some(&index) => index,
            None => {
                groups.push(Aggregation::start(order, &tx, &parts));
                group_by_key.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[group_index].absorb(tx, parts, items, fingerprint);
    }

    let mut merged: Vec<(usize, Transaction)> = passthrough;
    merged.extend(groups.into_iter().map(|group| (group.order, group.finish())));
    merged.sort_by_key(|(order, _)| *order);
    merged.into_iter().map(|(_, tx)| tx).collect()
}

/// Key under which records are candidate duplicates of one logical
/// transaction.
fn aggregation_key(tx: &Transaction, parts: &DescriptionParts) -> String {
    [
        tx.kind.as_str(),
        tx.voucher.as_deref().unwrap_or(""),
        &parts.normalized,
        &tx.created_at.timestamp().to_string(),
        &tx.register_id,
        tx.client_document.as_deref().unwrap_or(""),
        tx.client_name.as_deref().unwrap_or(""),
    ]
    .join("|")
}

/// Distinguishes a true duplicate (same fingerprint: overlapping fetch)
/// from a legitimate addition that happens to share the aggregation key.
///
/// A record with no sale items and no voucher fingerprints to its bare
/// description, so unrelated manual entries never collapse together.
fn duplicate_fingerprint(tx: &Transaction, parts: &DescriptionParts, items: &[SaleItem]) -> String {
    let stripped = strip_payment_details(&parts.prefix);
    let base = if stripped.is_empty() {
        parts.prefix.as_str()
    } else {
        stripped.as_str()
    };
    format!(
        "{}|{}|{}",
        normalize_whitespace(&base.to_lowercase()),
        tx.voucher.as_deref().unwrap_or(""),
        items_signature(items)
    )
}

// =============================================================================
// Aggregation State
// =============================================================================

/// One group of raw records being folded into a single ledger entry.
struct Aggregation {
    /// First record of the group, used as the template for the output.
    template: Transaction,
    /// Arrival position of the first record (output ordering).
    order: usize,

    prefix: String,
    /// Line-item suffixes (marker stripped) kept for display when no items
    /// parse at all.
    fallback_suffixes: Vec<String>,

    /// Merged sale items, insertion-ordered.
    items: Vec<SaleItem>,

    /// Union of tender lines, deduplicated case-insensitively by label.
    tenders: Vec<TenderLine>,
    tender_keys: HashSet<String>,

    /// Per-category amounts (insertion-ordered), each distinct
    /// `(category, amount)` contribution counted once.
    breakdown: Vec<(String, i64)>,
    contributions_seen: HashSet<(String, i64)>,

    fingerprints: HashSet<String>,

    /// Distinct raw amounts in arrival order — the total fallback when no
    /// items parse.
    raw_amounts: Vec<i64>,
}

impl Aggregation {
    fn start(order: usize, tx: &Transaction, parts: &DescriptionParts) -> Self {
        Aggregation {
            template: tx.clone(),
            order,
            prefix: parts.prefix.clone(),
            fallback_suffixes: Vec::new(),
            items: Vec::new(),
            tenders: Vec::new(),
            tender_keys: HashSet::new(),
            breakdown: Vec::new(),
            contributions_seen: HashSet::new(),
            fingerprints: HashSet::new(),
            raw_amounts: Vec::new(),
        }
    }

    fn absorb(
        &mut self,
        tx: Transaction,
        parts: DescriptionParts,
        items: Vec<SaleItem>,
        fingerprint: String,
    ) {
        let is_duplicate = !self.fingerprints.insert(fingerprint);

        if !is_duplicate {
            if let Some(body) = suffix_body(&parts.suffix) {
                self.fallback_suffixes.push(body);
            }
            for item in items {
                merge_item(&mut self.items, item);
            }
        }

        // Distinct raw amounts, arrival-ordered (duplicates included: the
        // identical amount collapses anyway).
        if !self.raw_amounts.contains(&tx.amount_cents) {
            self.raw_amounts.push(tx.amount_cents);
        }

        // Earliest voucher/invoice reference wins.
        if self.template.voucher.is_none() {
            self.template.voucher = tx.voucher.clone();
        }

        // Recorded tender lines: composite labels split into candidates,
        // single labels keep their structured amount.
        let lines = split_tender_lines(&tx.tenders);
        for line in &lines {
            self.push_tender(line.clone());
        }
        // Best-effort recovery from the description text; union only,
        // never part of the amount math.
        let text_source = if parts.prefix.is_empty() {
            tx.description.as_str()
        } else {
            parts.prefix.as_str()
        };
        for method in methods_from_text(text_source) {
            self.push_tender(TenderLine::new(method));
        }

        // Per-tender amounts: structured lines resolved against the raw
        // record amount, each distinct (category, amount) counted once so
        // overlapping fetches cannot double a leg.
        let entries: Vec<_> = lines.iter().map(entry_from_line).collect();
        let resolved =
            tender::resolve_amounts(&entries, tx.amount(), TransactionKind::Income);
        for tender in resolved {
            let category = category_label(&tender.label);
            let contribution = (category.clone(), tender.amount.cents());
            if self.contributions_seen.insert(contribution) {
                match self
                    .breakdown
                    .iter_mut()
                    .find(|(label, _)| *label == category)
                {
                    Some((_, sum)) => *sum += tender.amount.cents(),
                    None => self.breakdown.push((category, tender.amount.cents())),
                }
            }
        }
    }

    fn push_tender(&mut self, line: TenderLine) {
        let key = line.label.to_uppercase();
        if key.is_empty() || !self.tender_keys.insert(key) {
            return;
        }
        self.tenders.push(line);
    }

    fn finish(self) -> Transaction {
        let mut tx = self.template;

        // Amount: recomputed from merged items when any parsed, else the
        // sum of distinct raw amounts (a sale with no parseable items
        // still totals correctly).
        let total = if self.items.is_empty() {
            Money::from_cents(self.raw_amounts.iter().sum())
        } else {
            items_total(&self.items)
        };
        tx.amount_cents = total.cents();

        // Canonical description: cleaned prefix + re-rendered item list.
        let mut description_parts: Vec<String> = Vec::new();
        let cleaned_prefix = strip_payment_details(&self.prefix);
        if !cleaned_prefix.is_empty() {
            description_parts.push(cleaned_prefix.clone());
        }
        if !self.items.is_empty() {
            description_parts.push(format!("Venta registrada: {}", render_items(&self.items)));
        } else if let Some(suffix) = self.fallback_suffixes.first() {
            description_parts.push(format!("Venta registrada: {suffix}"));
        } else if cleaned_prefix.is_empty() && !tx.description.is_empty() {
            description_parts.push(normalize_whitespace(&tx.description));
        }
        tx.description = description_parts.join(" ");

        // Tenders: the per-category breakdown when amounts are known,
        // otherwise the raw union.
        tx.tenders = if self.breakdown.is_empty() {
            self.tenders
        } else {
            self.breakdown
                .into_iter()
                .map(|(label, cents)| TenderLine::with_amount(label, cents))
                .collect()
        };

        tx
    }
}

/// Splits recorded tender lines with composite labels ("Visa y Efectivo")
/// into individual lines; a composite's structured amount is dropped as
/// ambiguous, single labels keep theirs.
fn split_tender_lines(lines: &[TenderLine]) -> Vec<TenderLine> {
    let mut result = Vec::with_capacity(lines.len());
    for line in lines {
        let candidates = split_candidates(&line.label);
        match candidates.len() {
            0 => {
                let label = normalize_whitespace(&line.label);
                if !label.is_empty() {
                    result.push(TenderLine {
                        label,
                        amount_cents: line.amount_cents,
                    });
                }
            }
            1 => result.push(TenderLine {
                label: candidates.into_iter().next().unwrap_or_default(),
                amount_cents: line.amount_cents,
            }),
            _ => result.extend(candidates.into_iter().map(TenderLine::new)),
        }
    }
    result
}

/// The item suffix without its "venta registrada:" marker.
fn suffix_body(suffix: &str) -> Option<String> {
    if suffix.is_empty() {
        return None;
    }
    let body = match suffix.to_lowercase().find("venta registrada:") {
        Some(idx) => &suffix[idx + "venta registrada:".len()..],
        None => suffix,
    };
    let body = normalize_whitespace(body);
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
