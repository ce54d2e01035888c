//! CLI tests: argument parsing, config resolution and the command workflow.

use std::path::{Path, PathBuf};

use bandi_core::{DateRange, ExpenseId, Money};
use bandi_reconcile::Outcome;
use bandi_storage::{list_transactions, DbPool, TransactionFilter};
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;

use crate::cli::{Cli, Commands};
use crate::commands::{self, NewExpense};
use crate::config::AppConfig;

const STATEMENT: &str = "Data;Descrizione;Importo;Controparte\n\
                         08/03/2024;POS CARTOLERIA;-15,90;\n\
                         10/03/2024;BONIFICO FATTURA 4521;-120,00;ACME SRL\n\
                         12/03/2024;ACCREDITO CONTRIBUTO BANDO;10.000,00;REGIONE LAZIO\n";

async fn setup_test_db(dir: &Path) -> DbPool {
    commands::open_db(&dir.join("test.db")).await.unwrap()
}

fn acme_expense() -> NewExpense {
    NewExpense {
        id: Some("exp-1".to_string()),
        date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        amount: Decimal::new(12_000, 2),
        description: "Acquisto materiali".to_string(),
        supplier: Some("ACME SRL".to_string()),
        receipt: Some("4521".to_string()),
        category: None,
    }
}

fn write_statement(dir: &Path) -> PathBuf {
    let path = dir.join("statement.csv");
    std::fs::write(&path, STATEMENT).unwrap();
    path
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_reconcile_flags() {
    let cli = Cli::try_parse_from(["bandi", "reconcile", "--min-confidence", "80", "--apply"]).unwrap();
    match cli.command {
        Commands::Reconcile {
            min_confidence,
            from,
            apply,
            ..
        } => {
            assert_eq!(from, None);
            assert_eq!(min_confidence, Some(80));
            assert!(apply);
        }
        _ => panic!("expected reconcile"),
    }
}

#[test]
fn test_reconcile_period_needs_both_ends() {
    assert!(Cli::try_parse_from(["bandi", "reconcile", "--from", "2024-03-01"]).is_err());
    assert!(Cli::try_parse_from(["bandi", "reconcile", "--from", "2024-03-01", "--to", "2024-03-31"]).is_ok());
}

#[test]
fn test_min_confidence_above_100_rejected() {
    assert!(Cli::try_parse_from(["bandi", "suggest", "--expense", "e1", "--min-confidence", "101"]).is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["bandi", "status", "--expense", "e1", "--db", "other.db", "-v"]).unwrap();
    assert_eq!(cli.db, Some(PathBuf::from("other.db")));
    assert!(cli.verbose);
    assert_eq!(cli.config, PathBuf::from("bandi.toml"));
}

#[test]
fn test_parse_add_expense() {
    let cli = Cli::try_parse_from([
        "bandi",
        "add-expense",
        "--date",
        "2024-03-10",
        "--amount",
        "120.00",
        "--supplier",
        "ACME SRL",
    ])
    .unwrap();
    match cli.command {
        Commands::AddExpense {
            id,
            date,
            amount,
            supplier,
            ..
        } => {
            assert_eq!(id, None);
            assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
            assert_eq!(amount, Decimal::new(12_000, 2));
            assert_eq!(supplier.as_deref(), Some("ACME SRL"));
        }
        _ => panic!("expected add-expense"),
    }
}

#[test]
fn test_add_expense_requires_date() {
    assert!(Cli::try_parse_from(["bandi", "add-expense", "--amount", "10"]).is_err());
}

// ========== Config Tests ==========

#[test]
fn test_config_sections() {
    let config = AppConfig::from_toml(
        r#"
        [database]
        path = "grants.db"

        [matching]
        min_confidence = 85
        "#,
    )
    .unwrap();
    assert_eq!(config.database.path, Some(PathBuf::from("grants.db")));
    assert_eq!(config.min_confidence(None), 85);
    assert_eq!(config.min_confidence(Some(60)), 60);
}

#[test]
fn test_config_db_path_precedence() {
    let config = AppConfig::from_toml("[database]\npath = \"grants.db\"").unwrap();
    assert_eq!(config.db_path(Some(Path::new("cli.db"))), PathBuf::from("cli.db"));
    assert_eq!(config.db_path(None), PathBuf::from("grants.db"));
    assert_eq!(AppConfig::default().db_path(None), PathBuf::from("bandi.db"));
}

#[test]
fn test_config_rejects_out_of_range_confidence() {
    assert!(AppConfig::from_toml("[matching]\nmin_confidence = 150").is_err());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.min_confidence(None), 70);
}

// ========== Command Tests ==========

#[tokio::test]
async fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");
    let report = commands::cmd_init(&path).await.unwrap();
    assert!(path.exists());
    assert_eq!(report.database, path.display().to_string());
}

#[tokio::test]
async fn test_cmd_import_default_profile() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_test_db(dir.path()).await;
    let file = write_statement(dir.path());

    let report = commands::cmd_import(&db, &file, None).await.unwrap();
    assert_eq!(report.imported, 3);
    assert_eq!(report.transaction_ids.len(), 3);
}

#[tokio::test]
async fn test_cmd_import_failing_row_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_test_db(dir.path()).await;
    let file = dir.path().join("broken.csv");
    std::fs::write(
        &file,
        "Data;Descrizione;Importo;Controparte\n\
         10/03/2024;BONIFICO FATTURA 4521;-120,00;ACME SRL\n\
         11/03/2024;GIROCONTO;99999999999999999999,00;\n",
    )
    .unwrap();

    assert!(commands::cmd_import(&db, &file, None).await.is_err());
    let stored = list_transactions(&db, &TransactionFilter::default()).await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_cmd_reconcile_limited_to_period() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_test_db(dir.path()).await;
    let file = write_statement(dir.path());
    commands::cmd_import(&db, &file, None).await.unwrap();
    commands::cmd_add_expense(&db, acme_expense()).await.unwrap();

    let april = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    );
    let report = commands::cmd_reconcile(&db, 70, Some(april), true).await.unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(report.applied, 0);

    let march = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    );
    let report = commands::cmd_reconcile(&db, 70, Some(march), true).await.unwrap();
    assert_eq!(report.applied, 1);
}

#[tokio::test]
async fn test_cmd_add_expense_rejects_zero_amount() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_test_db(dir.path()).await;
    let mut expense = acme_expense();
    expense.amount = Decimal::ZERO;
    assert!(commands::cmd_add_expense(&db, expense).await.is_err());
}

#[tokio::test]
async fn test_cmd_add_expense_generates_id() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_test_db(dir.path()).await;
    let mut expense = acme_expense();
    expense.id = None;
    let stored = commands::cmd_add_expense(&db, expense).await.unwrap();
    assert!(!stored.id.0.is_empty());
    assert_eq!(stored.amount, Money::from_cents(12_000));
}

#[tokio::test]
async fn test_cmd_preview_unknown_expense() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_test_db(dir.path()).await;
    let result = commands::cmd_preview(&db, &"nope".into(), &"nope".into()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_suggest_reconcile_status_unlink_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_test_db(dir.path()).await;
    let file = write_statement(dir.path());
    let imported = commands::cmd_import(&db, &file, None).await.unwrap();
    commands::cmd_add_expense(&db, acme_expense()).await.unwrap();
    let expense_id = ExpenseId::from("exp-1");
    let payment = imported.transaction_ids[1].clone();

    let preview = commands::cmd_preview(&db, &expense_id, &payment).await.unwrap();
    assert_eq!(preview.confidence, 100);

    let suggestion = commands::cmd_suggest(&db, &expense_id, 70).await.unwrap();
    assert!(!suggestion.reconciled);
    let proposal = suggestion.proposal.expect("a proposal");
    assert_eq!(proposal.transaction.id, payment);

    // Dry run leaves the ledger untouched
    let dry = commands::cmd_reconcile(&db, 70, None, false).await.unwrap();
    assert_eq!(dry.applied, 0);
    assert!(!commands::cmd_status(&db, &expense_id).await.unwrap().reconciled);

    let run = commands::cmd_reconcile(&db, 70, None, true).await.unwrap();
    assert_eq!(run.applied, 1);
    assert!(matches!(run.outcomes[0].outcome, Outcome::Matched { .. }));

    let status = commands::cmd_status(&db, &expense_id).await.unwrap();
    assert!(status.reconciled);
    assert_eq!(status.transactions.len(), 1);
    assert_eq!(status.transactions[0].reconciliation_confidence, Some(100));

    let again = commands::cmd_suggest(&db, &expense_id, 70).await.unwrap();
    assert!(again.reconciled);
    assert!(again.proposal.is_none());

    let rerun = commands::cmd_reconcile(&db, 70, None, true).await.unwrap();
    assert_eq!(rerun.applied, 0);
    assert_eq!(
        rerun.outcomes[0].outcome,
        Outcome::AlreadyReconciled {
            transaction_id: payment.clone()
        }
    );

    let unlinked = commands::cmd_unlink(&db, &payment).await.unwrap();
    assert!(!unlinked.is_reconciled);
    assert_eq!(unlinked.expense_id, None);
    assert!(!commands::cmd_status(&db, &expense_id).await.unwrap().reconciled);
}
