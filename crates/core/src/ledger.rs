use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        TransactionId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub String);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExpenseId {
    fn from(s: &str) -> Self {
        ExpenseId(s.to_string())
    }
}

/// A bank statement line. Reconciliation state lives here and nowhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: TransactionId,
    pub transaction_date: NaiveDate,
    pub description: String,
    /// Signed: debits are negative.
    pub amount: Money,
    pub counterpart_name: Option<String>,
    pub category: Option<String>,
    pub expense_id: Option<ExpenseId>,
    pub is_reconciled: bool,
    pub reconciliation_confidence: Option<u8>,
    pub reconciliation_notes: Option<String>,
}

impl BankTransaction {
    /// An unreconciled transaction with no counterpart or category.
    pub fn new(id: TransactionId, date: NaiveDate, description: &str, amount: Money) -> Self {
        BankTransaction {
            id,
            transaction_date: date,
            description: description.to_string(),
            amount,
            counterpart_name: None,
            category: None,
            expense_id: None,
            is_reconciled: false,
            reconciliation_confidence: None,
            reconciliation_notes: None,
        }
    }

    /// True when this line has been accepted as the payment of `expense_id`.
    pub fn reconciles(&self, expense_id: &ExpenseId) -> bool {
        self.is_reconciled && self.expense_id.as_ref() == Some(expense_id)
    }
}

/// A recorded project cost awaiting a matching bank movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Money,
    pub expense_date: NaiveDate,
    pub supplier_name: Option<String>,
    pub receipt_number: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpenseError {
    #[error("Expense {0} has non-positive amount {1}")]
    NonPositiveAmount(ExpenseId, Money),
}

impl Expense {
    pub fn new(id: ExpenseId, date: NaiveDate, description: &str, amount: Money) -> Self {
        Expense {
            id,
            description: description.to_string(),
            amount,
            expense_date: date,
            supplier_name: None,
            receipt_number: None,
            category: None,
        }
    }

    /// Scoring divides by the amount, so zero or negative expenses are
    /// turned away before they reach the matcher.
    pub fn validate(&self) -> Result<(), ExpenseError> {
        if !self.amount.is_positive() {
            return Err(ExpenseError::NonPositiveAmount(self.id.clone(), self.amount));
        }
        Ok(())
    }
}
