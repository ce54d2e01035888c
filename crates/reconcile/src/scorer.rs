use std::collections::{BTreeSet, HashSet};

use bandi_core::{BankTransaction, Expense};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::reference::{extract_references, references_overlap};
use crate::similarity::{significant_words, word_overlap};
use crate::supplier::fuzzy_supplier_match;

pub const MAX_CONFIDENCE: u8 = 100;

/// Outcome of scoring one bank transaction against one expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationMatch {
    pub transaction: BankTransaction,
    /// Sum of the factor scores, clamped to 100.
    pub confidence: u8,
    /// One entry per contributing factor, in evaluation order.
    pub reasons: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

impl ReconciliationMatch {
    /// Reasons flattened for the `reconciliation_notes` column.
    pub fn notes(&self) -> String {
        self.reasons.join("; ")
    }
}

/// Points awarded per factor, each already capped at its maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub amount: u8,
    pub supplier: u8,
    pub reference: u8,
    pub description: u8,
    pub date: u8,
    pub category: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        let sum = [
            self.amount,
            self.supplier,
            self.reference,
            self.description,
            self.date,
            self.category,
        ]
        .iter()
        .map(|&p| u16::from(p))
        .sum::<u16>();
        sum.min(u16::from(MAX_CONFIDENCE)) as u8
    }
}

// ── Tier tables ───────────────────────────────────────────────────────────────
//
// Each factor is an ordered list of (predicate, points, reason). The first
// tier whose predicate holds wins; no tier means zero points and no reason.

struct Tier<T> {
    applies: fn(&T) -> bool,
    points: u8,
    reason: &'static str,
}

fn first_tier<'t, T>(tiers: &'t [Tier<T>], input: &T) -> Option<&'t Tier<T>> {
    tiers.iter().find(|tier| (tier.applies)(input))
}

#[derive(Debug, Clone, Copy)]
struct AmountDelta {
    /// `| |tx.amount| - expense.amount |`
    diff: Decimal,
    /// `diff / expense.amount * 100`, absent when the expense amount is not positive.
    percent: Option<Decimal>,
}

fn percent_below(d: &AmountDelta, limit: i64) -> bool {
    d.percent.is_some_and(|p| p < Decimal::from(limit))
}

const AMOUNT_TIERS: &[Tier<AmountDelta>] = &[
    Tier { applies: |d| d.diff < Decimal::new(1, 2), points: 50, reason: "exact amount match" },
    Tier { applies: |d| percent_below(d, 2), points: 45, reason: "amount within 2%" },
    Tier { applies: |d| percent_below(d, 5), points: 35, reason: "amount within 5%" },
    Tier { applies: |d| percent_below(d, 10), points: 20, reason: "amount within 10%" },
    Tier { applies: |d| percent_below(d, 20), points: 10, reason: "amount within 20%" },
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum SupplierEvidence {
    CounterpartContains,
    DescriptionContains,
    Fuzzy(f64),
    Absent,
}

const SUPPLIER_TIERS: &[Tier<SupplierEvidence>] = &[
    Tier {
        applies: |e| *e == SupplierEvidence::CounterpartContains,
        points: 30,
        reason: "supplier exact match",
    },
    Tier {
        applies: |e| *e == SupplierEvidence::DescriptionContains,
        points: 25,
        reason: "supplier named in description",
    },
    Tier {
        applies: |e| matches!(e, SupplierEvidence::Fuzzy(s) if *s > 60.0),
        points: 20,
        reason: "supplier similar to counterpart",
    },
    Tier {
        applies: |e| matches!(e, SupplierEvidence::Fuzzy(s) if *s > 30.0),
        points: 10,
        reason: "supplier partially similar to counterpart",
    },
];

const REFERENCE_TIERS: &[Tier<bool>] = &[Tier {
    applies: |hit| *hit,
    points: 20,
    reason: "invoice/reference number match",
}];

const DESCRIPTION_TIERS: &[Tier<f64>] = &[
    Tier { applies: |s| *s > 50.0, points: 15, reason: "very similar descriptions" },
    Tier { applies: |s| *s > 25.0, points: 10, reason: "similar descriptions" },
    Tier { applies: |s| *s > 10.0, points: 5, reason: "partially similar descriptions" },
];

const DATE_TIERS: &[Tier<i64>] = &[
    Tier { applies: |days| *days == 0, points: 10, reason: "same date" },
    Tier { applies: |days| *days <= 3, points: 8, reason: "date within 3 days" },
    Tier { applies: |days| *days <= 7, points: 5, reason: "date within a week" },
    Tier { applies: |days| *days <= 30, points: 3, reason: "date within a month" },
];

const CATEGORY_TIERS: &[Tier<bool>] = &[Tier {
    applies: |same| *same,
    points: 5,
    reason: "category match",
}];

// ── Expense profile ──────────────────────────────────────────────────────────

/// Expense-side inputs to the scorer, computed once and reused for every
/// candidate transaction.
#[derive(Debug, Clone)]
pub struct ExpenseProfile<'e> {
    expense: &'e Expense,
    supplier: Option<&'e str>,
    supplier_lower: Option<String>,
    references: BTreeSet<String>,
    description_words: HashSet<String>,
}

/// Scores accumulated for one candidate before it is turned into a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub confidence: u8,
    pub reasons: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

impl Evaluation {
    pub fn into_match(self, transaction: &BankTransaction) -> ReconciliationMatch {
        ReconciliationMatch {
            transaction: transaction.clone(),
            confidence: self.confidence,
            reasons: self.reasons,
            breakdown: self.breakdown,
        }
    }
}

impl<'e> ExpenseProfile<'e> {
    pub fn new(expense: &'e Expense) -> Self {
        let supplier = expense
            .supplier_name
            .as_deref()
            .filter(|s| !s.is_empty());

        let mut references = extract_references(&expense.description);
        if let Some(receipt) = expense.receipt_number.as_deref() {
            references.extend(extract_references(receipt));
        }

        Self {
            expense,
            supplier,
            supplier_lower: supplier.map(str::to_lowercase),
            references,
            description_words: significant_words(&expense.description),
        }
    }

    pub fn expense(&self) -> &'e Expense {
        self.expense
    }

    pub fn evaluate(&self, tx: &BankTransaction) -> Evaluation {
        let mut reasons = Vec::new();
        let mut award = |points: Option<(u8, &'static str)>| match points {
            Some((p, reason)) => {
                reasons.push(reason.to_string());
                p
            }
            None => 0,
        };

        let breakdown = ScoreBreakdown {
            amount: award(pick(AMOUNT_TIERS, &self.amount_delta(tx))),
            supplier: award(self.supplier_evidence(tx).and_then(|e| pick(SUPPLIER_TIERS, &e))),
            reference: award(pick(REFERENCE_TIERS, &self.reference_hit(tx))),
            description: award(pick(DESCRIPTION_TIERS, &self.description_similarity(tx))),
            date: award(pick(DATE_TIERS, &self.days_apart(tx))),
            category: award(pick(CATEGORY_TIERS, &self.same_category(tx))),
        };

        Evaluation {
            confidence: breakdown.total(),
            reasons,
            breakdown,
        }
    }

    pub fn score(&self, tx: &BankTransaction) -> ReconciliationMatch {
        self.evaluate(tx).into_match(tx)
    }

    fn amount_delta(&self, tx: &BankTransaction) -> AmountDelta {
        let expected = self.expense.amount.as_decimal();
        let diff = (tx.amount.as_decimal().abs() - expected).abs();
        let percent = if expected > Decimal::ZERO {
            diff.checked_div(expected)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        } else {
            None
        };
        AmountDelta { diff, percent }
    }

    /// `None` when the expense has no supplier, so the factor is skipped.
    fn supplier_evidence(&self, tx: &BankTransaction) -> Option<SupplierEvidence> {
        let supplier = self.supplier?;
        let supplier_lower = self.supplier_lower.as_deref()?;
        let counterpart = tx
            .counterpart_name
            .as_deref()
            .filter(|c| !c.is_empty());

        let evidence = if counterpart.is_some_and(|c| c.to_lowercase().contains(supplier_lower)) {
            SupplierEvidence::CounterpartContains
        } else if tx.description.to_lowercase().contains(supplier_lower) {
            SupplierEvidence::DescriptionContains
        } else if let Some(c) = counterpart {
            SupplierEvidence::Fuzzy(fuzzy_supplier_match(c, supplier))
        } else {
            SupplierEvidence::Absent
        };
        Some(evidence)
    }

    fn reference_hit(&self, tx: &BankTransaction) -> bool {
        if self.references.is_empty() {
            return false;
        }
        references_overlap(&extract_references(&tx.description), &self.references)
    }

    fn description_similarity(&self, tx: &BankTransaction) -> f64 {
        word_overlap(&significant_words(&tx.description), &self.description_words)
    }

    fn days_apart(&self, tx: &BankTransaction) -> i64 {
        (tx.transaction_date - self.expense.expense_date).num_days().abs()
    }

    fn same_category(&self, tx: &BankTransaction) -> bool {
        match (tx.category.as_deref(), self.expense.category.as_deref()) {
            (Some(a), Some(b)) => !a.is_empty() && a == b,
            _ => false,
        }
    }
}

fn pick<T>(tiers: &[Tier<T>], input: &T) -> Option<(u8, &'static str)> {
    first_tier(tiers, input).map(|tier| (tier.points, tier.reason))
}

/// Score one transaction against one expense. Pure and deterministic.
pub fn score_match(transaction: &BankTransaction, expense: &Expense) -> ReconciliationMatch {
    ExpenseProfile::new(expense).score(transaction)
}
