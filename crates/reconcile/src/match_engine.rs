use std::collections::HashSet;

use bandi_core::{BankTransaction, Expense, ExpenseId, TransactionId};
use serde::Serialize;

use crate::config::MatchConfig;
use crate::scorer::{ExpenseProfile, ReconciliationMatch};
use crate::selector::{best_among, DEFAULT_MIN_CONFIDENCE};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A transaction already carries this expense and is flagged reconciled.
    AlreadyReconciled { transaction_id: TransactionId },
    Matched { proposal: ReconciliationMatch },
    NoMatch,
    /// The expense cannot be scored (zero or negative amount).
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub expense_id: ExpenseId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Batch reconciliation over many expenses against one statement.
pub struct MatchEngine {
    pub min_confidence: u8,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl MatchEngine {
    pub fn new(min_confidence: u8) -> Self {
        Self { min_confidence }
    }

    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(config.min_confidence)
    }

    /// One outcome per expense, in input order.
    ///
    /// Reconciled transactions are never offered, and a transaction proposed
    /// for an earlier expense is withheld from later ones in the same run.
    pub fn find_matches(
        &self,
        expenses: &[Expense],
        transactions: &[BankTransaction],
    ) -> Vec<MatchOutcome> {
        let mut claimed: HashSet<TransactionId> = HashSet::new();
        let mut outcomes = Vec::with_capacity(expenses.len());

        for expense in expenses {
            let outcome = self.match_one(expense, transactions, &claimed);
            if let Outcome::Matched { proposal } = &outcome {
                claimed.insert(proposal.transaction.id.clone());
            }
            outcomes.push(MatchOutcome {
                expense_id: expense.id.clone(),
                outcome,
            });
        }

        let matched = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Matched { .. }))
            .count();
        tracing::info!(
            expenses = expenses.len(),
            transactions = transactions.len(),
            matched,
            min_confidence = self.min_confidence,
            "reconciliation run finished"
        );

        outcomes
    }

    fn match_one(
        &self,
        expense: &Expense,
        transactions: &[BankTransaction],
        claimed: &HashSet<TransactionId>,
    ) -> Outcome {
        if let Some(tx) = transactions.iter().find(|t| t.reconciles(&expense.id)) {
            return Outcome::AlreadyReconciled {
                transaction_id: tx.id.clone(),
            };
        }
        if let Err(e) = expense.validate() {
            tracing::warn!(expense = %expense.id, "skipping expense: {e}");
            return Outcome::Rejected {
                reason: e.to_string(),
            };
        }

        let profile = ExpenseProfile::new(expense);
        let open = transactions
            .iter()
            .filter(|t| !t.is_reconciled && !claimed.contains(&t.id));

        match best_among(&profile, open, self.min_confidence) {
            Some(proposal) => {
                tracing::debug!(
                    expense = %expense.id,
                    transaction = %proposal.transaction.id,
                    confidence = proposal.confidence,
                    "match proposed"
                );
                Outcome::Matched { proposal }
            }
            None => Outcome::NoMatch,
        }
    }
}
