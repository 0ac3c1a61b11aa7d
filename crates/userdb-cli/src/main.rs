//! userdb CLI - an account store on an embedded key-value database
//!
//! This is the command-line interface for userdb. Every store operation is a
//! subcommand; `bench` drives the throughput benchmark.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod output;
mod ui;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use userdb_core::{UserDbError, VERSION};

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::commands::{bench, list, misc, users};
use crate::constants::DEFAULT_LOG_FILTER;
use crate::errors::CliError;
use crate::ui::{emit_error, Terminal};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_deref()) {
        e.exit();
    }

    let ctx = AppContext::new(&cli);
    if let Err(e) = run(&ctx, &cli).await {
        if let Some(cli_err) = e.downcast_ref::<CliError>() {
            cli_err.exit();
        }
        if let Some(cli_err) = e.downcast_ref::<UserDbError>().and_then(CliError::from_store) {
            cli_err.exit();
        }
        emit_error(&Terminal::detect(false), &format!("{:#}", e), None);
        std::process::exit(1);
    }
}

/// Install the stderr log subscriber.
///
/// `--log-level` applies to userdb's own targets and overrides `RUST_LOG`.
fn init_tracing(level: Option<&str>) -> Result<(), CliError> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(format!("userdb={}", level))
            .map_err(|e| CliError::invalid_input(format!("Invalid --log-level: {}", e)))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(ctx: &AppContext<'_>, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Add(args)) => {
            users::handle_add(ctx, args).await?;
        }
        Some(Commands::Find(args)) => {
            users::handle_find(ctx, args).await?;
        }
        Some(Commands::CheckPassword(args)) => {
            users::handle_check_password(ctx, args).await?;
        }
        Some(Commands::ChangeEmail(args)) => {
            users::handle_change_email(ctx, args).await?;
        }
        Some(Commands::ChangePassword(args)) => {
            users::handle_change_password(ctx, args).await?;
        }
        Some(Commands::Modify(args)) => {
            users::handle_modify(ctx, args).await?;
        }
        Some(Commands::Delete(args)) => {
            users::handle_delete(ctx, args).await?;
        }
        Some(Commands::List(args)) => {
            list::handle_list(ctx, args).await?;
        }
        Some(Commands::Bench(args)) => {
            bench::handle_bench(ctx, args).await?;
        }
        Some(Commands::Completions(args)) => {
            misc::handle_completions(args)?;
        }
        None => {
            println!("userdb v{}", VERSION);
            println!("\nQuickstart:");
            println!("  userdb add someone@example.com --data '{{\"plan\":\"free\"}}'");
            println!("  userdb check-password someone@example.com");
            println!("  userdb list");
            println!("\nRun `userdb --help` for full usage.");
        }
    }

    Ok(())
}
