//! CLI argument definitions using clap

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Bandi - reconcile grant expenses against bank statements
#[derive(Parser)]
#[command(name = "bandi")]
#[command(about = "Match bank statement lines to grant expenses", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = "bandi.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import bank transactions from a statement CSV
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Statement profile (TOML); Italian home-banking layout if omitted
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },

    /// Record an expense
    AddExpense {
        /// Expense id (generated if omitted)
        #[arg(long)]
        id: Option<String>,

        /// Expense date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Amount, positive, e.g. 120.00
        #[arg(long)]
        amount: Decimal,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        supplier: Option<String>,

        /// Invoice or receipt number
        #[arg(long)]
        receipt: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Score one transaction against one expense
    Preview {
        #[arg(long)]
        expense: String,

        #[arg(long)]
        transaction: String,
    },

    /// Propose the best open transaction for an expense
    Suggest {
        #[arg(long)]
        expense: String,

        /// Minimum confidence (overrides the config file)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_confidence: Option<u8>,
    },

    /// Match every expense against the open transactions
    Reconcile {
        /// Minimum confidence (overrides the config file)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_confidence: Option<u8>,

        /// Only expenses dated on or after this day (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Only expenses dated on or before this day (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Store the proposed matches
        #[arg(long)]
        apply: bool,
    },

    /// Show whether an expense is reconciled and which transactions carry it
    Status {
        #[arg(long)]
        expense: String,
    },

    /// Remove the reconciliation from a transaction
    Unlink {
        #[arg(long)]
        transaction: String,
    },
}
