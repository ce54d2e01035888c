pub mod db;

pub use db::{
    apply_reconciliation, clear_reconciliation, create_db, get_expense, get_transaction,
    insert_expense, insert_transaction, insert_transactions, list_expenses, list_transactions,
    new_id, DbPool, ExpenseFilter, StorageError, TransactionFilter,
};
