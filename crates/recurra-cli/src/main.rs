use clap::Parser;
use owo_colors::{OwoColorize, Style};
use recurra_core::coordinator::SeriesCoordinator;
use recurra_core::db;
use recurra_core::error::CoreError;
use recurra_core::rule::RuleFormatError;
use recurra_core::store::SqliteStore;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

use commands::Session;

const LOG_ENV: &str = "RECURRA_LOG";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    if let Err(e) = run(cli).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let config = config::Config::new()?;
    let calendar = config.calendar()?;
    let pool = db::establish_connection(&config.database_path.to_string_lossy()).await?;
    tracing::debug!(database = %config.database_path.display(), timezone = %calendar.timezone(), "configuration loaded");

    let coordinator = SeriesCoordinator::new(SqliteStore::new(pool), calendar, config.recurrence.clone());
    let session = Session::new(coordinator, config.workspace_id);

    match cli.command {
        cli::Commands::Add(command) => commands::add::add_entry(&session, command).await,
        cli::Commands::List(command) => commands::list::list_entries(&session, command).await,
        cli::Commands::Show(command) => commands::show::show_series(&session, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_entry(&session, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_entry(&session, command).await,
        cli::Commands::Preview(command) => commands::preview::preview_dates(&session, command).await,
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(rule_error) = err.downcast_ref::<RuleFormatError>() {
        print_rule_error(rule_error, error_style);
    } else if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::RuleFormat(rule_error) => print_rule_error(rule_error, error_style),
            CoreError::InconsistentSeries(s) => {
                eprintln!(
                    "{} Series data is inconsistent: {}",
                    "Error:".style(error_style),
                    s.yellow()
                );
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}

fn print_rule_error(rule_error: &RuleFormatError, error_style: Style) {
    eprintln!(
        "{} Invalid recurrence rule '{}': {}",
        "Error:".style(error_style),
        rule_error.rule.yellow(),
        rule_error.reason
    );
}
