//! Bandi CLI - grant expense reconciliation
//!
//! Usage:
//!   bandi init                               Initialize database
//!   bandi import --file CSV                  Import a bank statement
//!   bandi suggest --expense ID               Best open transaction for an expense
//!   bandi reconcile --apply                  Match and store every expense

mod cli;
mod commands;
mod config;

#[cfg(test)]
mod tests;

use anyhow::Result;
use bandi_core::DateRange;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use config::AppConfig;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load(&cli.config)?;
    let db_path = config.db_path(cli.db.as_deref());

    if let Commands::Init = cli.command {
        return print_json(&commands::cmd_init(&db_path).await?);
    }

    let db = commands::open_db(&db_path).await?;
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Import { file, profile } => {
            print_json(&commands::cmd_import(&db, &file, profile.as_deref()).await?)
        }
        Commands::AddExpense {
            id,
            date,
            amount,
            description,
            supplier,
            receipt,
            category,
        } => {
            let new = commands::NewExpense {
                id,
                date,
                amount,
                description,
                supplier,
                receipt,
                category,
            };
            print_json(&commands::cmd_add_expense(&db, new).await?)
        }
        Commands::Preview {
            expense,
            transaction,
        } => print_json(
            &commands::cmd_preview(&db, &expense.as_str().into(), &transaction.as_str().into())
                .await?,
        ),
        Commands::Suggest {
            expense,
            min_confidence,
        } => {
            let min = config.min_confidence(min_confidence);
            print_json(&commands::cmd_suggest(&db, &expense.as_str().into(), min).await?)
        }
        Commands::Reconcile {
            min_confidence,
            from,
            to,
            apply,
        } => {
            let min = config.min_confidence(min_confidence);
            let period = from.zip(to).map(|(start, end)| DateRange::new(start, end));
            print_json(&commands::cmd_reconcile(&db, min, period, apply).await?)
        }
        Commands::Status { expense } => {
            print_json(&commands::cmd_status(&db, &expense.as_str().into()).await?)
        }
        Commands::Unlink { transaction } => {
            print_json(&commands::cmd_unlink(&db, &transaction.as_str().into()).await?)
        }
    }
}
