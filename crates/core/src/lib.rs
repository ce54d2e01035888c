pub mod ledger;
pub mod money;
pub mod period;

pub use ledger::{BankTransaction, Expense, ExpenseError, ExpenseId, TransactionId};
pub use money::Money;
pub use period::DateRange;
