use bandi_core::{BankTransaction, Expense, ExpenseId};

use crate::scorer::{ExpenseProfile, ReconciliationMatch};

pub const DEFAULT_MIN_CONFIDENCE: u8 = 70;

/// The transaction that best explains `expense`, if any scores at least
/// `min_confidence`.
///
/// Every transaction is scored. On equal confidence the earliest one in
/// input order is kept.
pub fn find_best_match(
    expense: &Expense,
    transactions: &[BankTransaction],
    min_confidence: u8,
) -> Option<ReconciliationMatch> {
    best_among(&ExpenseProfile::new(expense), transactions.iter(), min_confidence)
}

/// Same as [`find_best_match`] over any sequence of candidates, reusing an
/// already built profile.
pub fn best_among<'a>(
    profile: &ExpenseProfile<'_>,
    candidates: impl IntoIterator<Item = &'a BankTransaction>,
    min_confidence: u8,
) -> Option<ReconciliationMatch> {
    let scored = candidates.into_iter().map(|tx| {
        let evaluation = profile.evaluate(tx);
        tracing::debug!(
            expense = %profile.expense().id,
            transaction = %tx.id,
            confidence = evaluation.confidence,
            "scored candidate"
        );
        (evaluation.confidence, (tx, evaluation))
    });

    pick_best(scored, min_confidence).map(|(_, (tx, evaluation))| evaluation.into_match(tx))
}

/// Highest-confidence item at or above `min_confidence`. Only a strictly
/// greater score displaces the current best.
fn pick_best<T>(scored: impl IntoIterator<Item = (u8, T)>, min_confidence: u8) -> Option<(u8, T)> {
    let mut best: Option<(u8, T)> = None;
    for (confidence, item) in scored {
        if confidence < min_confidence {
            continue;
        }
        if best.as_ref().map_or(true, |(top, _)| confidence > *top) {
            best = Some((confidence, item));
        }
    }
    best
}

/// Whether some transaction is linked to `expense_id` and flagged reconciled.
pub fn is_reconciled(expense_id: &ExpenseId, transactions: &[BankTransaction]) -> bool {
    transactions.iter().any(|tx| tx.reconciles(expense_id))
}
