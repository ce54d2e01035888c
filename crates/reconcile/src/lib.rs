//! Bank-transaction to expense reconciliation.
//!
//! [`score_match`] rates one transaction against one expense,
//! [`find_best_match`] picks the best candidate for an expense, and
//! [`is_reconciled`] reports whether an expense is already settled.
//! [`MatchEngine`] runs the selector over a whole batch of expenses.

pub mod config;
pub mod csv;
pub mod match_engine;
pub mod reference;
pub mod scorer;
pub mod selector;
pub mod similarity;
pub mod supplier;

pub use config::{ConfigError, MatchConfig};
pub use csv::{import_statement, CsvError, StatementColumns, StatementLine, StatementProfile};
pub use match_engine::{MatchEngine, MatchOutcome, Outcome};
pub use reference::extract_references;
pub use scorer::{score_match, ExpenseProfile, ReconciliationMatch, ScoreBreakdown, MAX_CONFIDENCE};
pub use selector::{find_best_match, is_reconciled, DEFAULT_MIN_CONFIDENCE};
pub use similarity::semantic_similarity;
pub use supplier::fuzzy_supplier_match;
