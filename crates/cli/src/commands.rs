//! CLI command implementations
//!
//! Each command returns a serializable report; `main` prints it as JSON.

use std::path::Path;

use anyhow::{bail, Context, Result};
use bandi_core::{BankTransaction, DateRange, Expense, ExpenseId, Money, TransactionId};
use bandi_reconcile::{
    find_best_match, import_statement, is_reconciled, score_match, MatchEngine, MatchOutcome,
    Outcome, ReconciliationMatch, StatementProfile,
};
use bandi_storage::{
    apply_reconciliation, clear_reconciliation, create_db, get_expense, get_transaction,
    insert_expense, insert_transactions, list_expenses, list_transactions, new_id, DbPool,
    ExpenseFilter, TransactionFilter,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct InitReport {
    pub database: String,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub transaction_ids: Vec<TransactionId>,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub expense_id: ExpenseId,
    pub reconciled: bool,
    pub proposal: Option<ReconciliationMatch>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    pub applied: usize,
    pub outcomes: Vec<MatchOutcome>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub expense_id: ExpenseId,
    pub reconciled: bool,
    pub transactions: Vec<BankTransaction>,
}

/// Fields for `add-expense`.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub id: Option<String>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub supplier: Option<String>,
    pub receipt: Option<String>,
    pub category: Option<String>,
}

pub async fn open_db(path: &Path) -> Result<DbPool> {
    create_db(path)
        .await
        .with_context(|| format!("failed to open database {}", path.display()))
}

async fn require_expense(db: &DbPool, id: &ExpenseId) -> Result<Expense> {
    match get_expense(db, id).await? {
        Some(expense) => Ok(expense),
        None => bail!("expense {id} not found"),
    }
}

async fn require_transaction(db: &DbPool, id: &TransactionId) -> Result<BankTransaction> {
    match get_transaction(db, id).await? {
        Some(tx) => Ok(tx),
        None => bail!("transaction {id} not found"),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_init(db_path: &Path) -> Result<InitReport> {
    open_db(db_path).await?;
    tracing::info!("database ready at {}", db_path.display());
    Ok(InitReport {
        database: db_path.display().to_string(),
    })
}

pub async fn cmd_import(db: &DbPool, file: &Path, profile: Option<&Path>) -> Result<ImportReport> {
    let profile = match profile {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read profile {}", path.display()))?;
            StatementProfile::from_toml(&content)?
        }
        None => StatementProfile::home_banking(),
    };

    let data = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let lines = import_statement(data.as_slice(), &profile)?;

    let txs: Vec<BankTransaction> = lines
        .into_iter()
        .map(|line| {
            let mut tx = BankTransaction::new(
                TransactionId(new_id()),
                line.date,
                &line.description,
                line.amount,
            );
            tx.counterpart_name = line.counterpart_name;
            tx.category = line.category;
            tx
        })
        .collect();
    insert_transactions(db, &txs).await?;
    let transaction_ids: Vec<TransactionId> = txs.into_iter().map(|tx| tx.id).collect();

    tracing::info!(
        file = %file.display(),
        profile = %profile.name,
        imported = transaction_ids.len(),
        "statement imported"
    );
    Ok(ImportReport {
        imported: transaction_ids.len(),
        transaction_ids,
    })
}

pub async fn cmd_add_expense(db: &DbPool, new: NewExpense) -> Result<Expense> {
    let id = ExpenseId(new.id.unwrap_or_else(new_id));
    let mut expense = Expense::new(id, new.date, &new.description, Money::from_decimal(new.amount));
    expense.supplier_name = new.supplier;
    expense.receipt_number = new.receipt;
    expense.category = new.category;
    expense.validate()?;

    insert_expense(db, &expense).await?;
    Ok(expense)
}

pub async fn cmd_preview(
    db: &DbPool,
    expense_id: &ExpenseId,
    transaction_id: &TransactionId,
) -> Result<ReconciliationMatch> {
    let expense = require_expense(db, expense_id).await?;
    let tx = require_transaction(db, transaction_id).await?;
    Ok(score_match(&tx, &expense))
}

pub async fn cmd_suggest(db: &DbPool, expense_id: &ExpenseId, min_confidence: u8) -> Result<Suggestion> {
    let expense = require_expense(db, expense_id).await?;

    let linked = list_transactions(
        db,
        &TransactionFilter {
            expense_id: Some(expense_id.clone()),
            ..TransactionFilter::default()
        },
    )
    .await?;
    if is_reconciled(expense_id, &linked) {
        return Ok(Suggestion {
            expense_id: expense_id.clone(),
            reconciled: true,
            proposal: None,
        });
    }

    expense.validate()?;
    let open = list_transactions(
        db,
        &TransactionFilter {
            unreconciled_only: true,
            ..TransactionFilter::default()
        },
    )
    .await?;

    Ok(Suggestion {
        expense_id: expense_id.clone(),
        reconciled: false,
        proposal: find_best_match(&expense, &open, min_confidence),
    })
}

/// Matches every expense in `period` (all of them when `None`) against the
/// whole statement. With `apply`, all proposals are stored in one database
/// transaction.
pub async fn cmd_reconcile(
    db: &DbPool,
    min_confidence: u8,
    period: Option<DateRange>,
    apply: bool,
) -> Result<ReconcileReport> {
    if let Some(period) = period {
        tracing::info!(%period, "reconciling expenses in period");
    }
    let expenses = list_expenses(db, &ExpenseFilter { period }).await?;
    let transactions = list_transactions(db, &TransactionFilter::default()).await?;

    let outcomes = MatchEngine::new(min_confidence).find_matches(&expenses, &transactions);

    let mut applied = 0;
    if apply {
        let mut db_tx = db.begin().await?;
        for outcome in &outcomes {
            if let Outcome::Matched { proposal } = &outcome.outcome {
                apply_reconciliation(
                    &mut db_tx,
                    &proposal.transaction.id,
                    &outcome.expense_id,
                    proposal.confidence,
                    &proposal.notes(),
                )
                .await?;
                applied += 1;
            }
        }
        db_tx.commit().await?;
    }

    Ok(ReconcileReport { applied, outcomes })
}

pub async fn cmd_status(db: &DbPool, expense_id: &ExpenseId) -> Result<StatusReport> {
    require_expense(db, expense_id).await?;
    let transactions = list_transactions(
        db,
        &TransactionFilter {
            expense_id: Some(expense_id.clone()),
            ..TransactionFilter::default()
        },
    )
    .await?;

    Ok(StatusReport {
        expense_id: expense_id.clone(),
        reconciled: is_reconciled(expense_id, &transactions),
        transactions,
    })
}

pub async fn cmd_unlink(db: &DbPool, transaction_id: &TransactionId) -> Result<BankTransaction> {
    clear_reconciliation(db, transaction_id).await?;
    require_transaction(db, transaction_id).await
}
