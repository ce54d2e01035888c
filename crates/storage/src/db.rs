use bandi_core::{BankTransaction, DateRange, Expense, ExpenseId, Money, TransactionId};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Acquire, Executor, Pool, QueryBuilder, Sqlite};
use std::path::Path;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(Money),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            expense_date TEXT NOT NULL,
            supplier_name TEXT,
            receipt_number TEXT,
            category TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bank_transactions (
            id TEXT PRIMARY KEY,
            transaction_date TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            amount_cents INTEGER NOT NULL,
            counterpart_name TEXT,
            category TEXT,
            expense_id TEXT,
            is_reconciled INTEGER NOT NULL DEFAULT 0,
            reconciliation_confidence INTEGER,
            reconciliation_notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (expense_id) REFERENCES expenses(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_bank_transactions_expense ON bank_transactions(expense_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Fresh opaque id for a new ledger record.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ── Filters ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub period: Option<DateRange>,
    /// Only lines not yet flagged reconciled.
    pub unreconciled_only: bool,
    pub expense_id: Option<ExpenseId>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub period: Option<DateRange>,
}

// ── Bank transactions ─────────────────────────────────────────────────────────

type TransactionRow = (
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    Option<i64>,
    Option<String>,
);

const TRANSACTION_COLUMNS: &str = "SELECT id, transaction_date, description, amount_cents, counterpart_name, category, expense_id, is_reconciled, reconciliation_confidence, reconciliation_notes FROM bank_transactions";

fn cents(amount: Money) -> Result<i64, StorageError> {
    amount
        .to_cents()
        .ok_or(StorageError::AmountOutOfRange(amount))
}

fn parse_date(raw: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StorageError::InvalidRow(format!("bad date '{raw}': {e}")))
}

fn transaction_from_row(r: TransactionRow) -> Result<BankTransaction, StorageError> {
    let confidence = r
        .8
        .map(|c| {
            u8::try_from(c)
                .map_err(|_| StorageError::InvalidRow(format!("confidence {c} out of range")))
        })
        .transpose()?;

    Ok(BankTransaction {
        id: TransactionId(r.0),
        transaction_date: parse_date(&r.1)?,
        description: r.2,
        amount: Money::from_cents(r.3),
        counterpart_name: r.4,
        category: r.5,
        expense_id: r.6.map(ExpenseId),
        is_reconciled: r.7 != 0,
        reconciliation_confidence: confidence,
        reconciliation_notes: r.9,
    })
}

pub async fn insert_transaction<'e, E>(executor: E, tx: &BankTransaction) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO bank_transactions (id, transaction_date, description, amount_cents, counterpart_name, category, expense_id, is_reconciled, reconciliation_confidence, reconciliation_notes) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&tx.id.0)
    .bind(tx.transaction_date.to_string())
    .bind(&tx.description)
    .bind(cents(tx.amount)?)
    .bind(&tx.counterpart_name)
    .bind(&tx.category)
    .bind(tx.expense_id.as_ref().map(|e| e.0.as_str()))
    .bind(tx.is_reconciled)
    .bind(tx.reconciliation_confidence.map(i64::from))
    .bind(&tx.reconciliation_notes)
    .execute(executor)
    .await?;

    Ok(())
}

/// Stores a whole batch or nothing.
pub async fn insert_transactions(pool: &DbPool, txs: &[BankTransaction]) -> Result<(), StorageError> {
    let mut db_tx = pool.begin().await?;
    for tx in txs {
        insert_transaction(&mut *db_tx, tx).await?;
    }
    db_tx.commit().await?;
    Ok(())
}

pub async fn get_transaction(
    pool: &DbPool,
    id: &TransactionId,
) -> Result<Option<BankTransaction>, StorageError> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!("{TRANSACTION_COLUMNS} WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(pool)
        .await?;

    row.map(transaction_from_row).transpose()
}

/// Transactions matching `filter`, oldest first, ties in insertion order.
pub async fn list_transactions(
    pool: &DbPool,
    filter: &TransactionFilter,
) -> Result<Vec<BankTransaction>, StorageError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(TRANSACTION_COLUMNS);
    qb.push(" WHERE 1 = 1");
    if let Some(period) = filter.period {
        qb.push(" AND transaction_date >= ")
            .push_bind(period.start.to_string())
            .push(" AND transaction_date <= ")
            .push_bind(period.end.to_string());
    }
    if filter.unreconciled_only {
        qb.push(" AND is_reconciled = 0");
    }
    if let Some(expense_id) = &filter.expense_id {
        qb.push(" AND expense_id = ").push_bind(expense_id.0.clone());
    }
    qb.push(" ORDER BY transaction_date, rowid");

    let rows = qb.build_query_as::<TransactionRow>().fetch_all(pool).await?;
    rows.into_iter().map(transaction_from_row).collect()
}

/// Writes an accepted match back onto the transaction record. Accepts a
/// pool or an open database transaction.
pub async fn apply_reconciliation<'a, A>(
    db: A,
    tx_id: &TransactionId,
    expense_id: &ExpenseId,
    confidence: u8,
    notes: &str,
) -> Result<(), StorageError>
where
    A: Acquire<'a, Database = Sqlite>,
{
    let mut conn = db.acquire().await?;
    if get_expense(&mut *conn, expense_id).await?.is_none() {
        return Err(StorageError::NotFound(format!("expense {expense_id}")));
    }

    let result = sqlx::query(
        "UPDATE bank_transactions SET expense_id = ?, is_reconciled = 1, reconciliation_confidence = ?, reconciliation_notes = ? WHERE id = ?"
    )
    .bind(&expense_id.0)
    .bind(i64::from(confidence))
    .bind(notes)
    .bind(&tx_id.0)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound(format!("transaction {tx_id}")));
    }
    tracing::info!(transaction = %tx_id, expense = %expense_id, confidence, "reconciliation stored");
    Ok(())
}

/// Unlinks a transaction from its expense.
pub async fn clear_reconciliation<'e, E>(executor: E, tx_id: &TransactionId) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE bank_transactions SET expense_id = NULL, is_reconciled = 0, reconciliation_confidence = NULL, reconciliation_notes = NULL WHERE id = ?"
    )
    .bind(&tx_id.0)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound(format!("transaction {tx_id}")));
    }
    Ok(())
}

// ── Expenses ──────────────────────────────────────────────────────────────────

type ExpenseRow = (
    String,
    String,
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

const EXPENSE_COLUMNS: &str = "SELECT id, description, amount_cents, expense_date, supplier_name, receipt_number, category FROM expenses";

fn expense_from_row(r: ExpenseRow) -> Result<Expense, StorageError> {
    Ok(Expense {
        id: ExpenseId(r.0),
        description: r.1,
        amount: Money::from_cents(r.2),
        expense_date: parse_date(&r.3)?,
        supplier_name: r.4,
        receipt_number: r.5,
        category: r.6,
    })
}

pub async fn insert_expense(pool: &DbPool, expense: &Expense) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO expenses (id, description, amount_cents, expense_date, supplier_name, receipt_number, category) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&expense.id.0)
    .bind(&expense.description)
    .bind(cents(expense.amount)?)
    .bind(expense.expense_date.to_string())
    .bind(&expense.supplier_name)
    .bind(&expense.receipt_number)
    .bind(&expense.category)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_expense<'e, E>(executor: E, id: &ExpenseId) -> Result<Option<Expense>, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ExpenseRow>(&format!("{EXPENSE_COLUMNS} WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(executor)
        .await?;

    row.map(expense_from_row).transpose()
}

pub async fn list_expenses(pool: &DbPool, filter: &ExpenseFilter) -> Result<Vec<Expense>, StorageError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(EXPENSE_COLUMNS);
    if let Some(period) = filter.period {
        qb.push(" WHERE expense_date >= ")
            .push_bind(period.start.to_string())
            .push(" AND expense_date <= ")
            .push_bind(period.end.to_string());
    }
    qb.push(" ORDER BY expense_date, rowid");

    let rows = qb.build_query_as::<ExpenseRow>().fetch_all(pool).await?;
    rows.into_iter().map(expense_from_row).collect()
}
