//! Notekeep CLI - terminal front end for the Notekeep notes service

mod cli;
mod commands;
mod error;
mod token_store;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::categories::run_categories;
use crate::commands::common::GlobalOptions;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::edit::{run_edit, EditArgs};
use crate::commands::list::run_list;
use crate::commands::new::run_new;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "notekeep=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        api_url: cli.api_url,
        token_file: cli.token_file,
    };

    match cli.command {
        Commands::List {
            category,
            all,
            json,
        } => run_list(category, all, json, &options).await?,
        Commands::New { category } => run_new(category, &options).await?,
        Commands::Edit {
            id,
            title,
            content,
            category,
            force,
        } => {
            let args = EditArgs {
                id,
                title,
                content,
                category,
                force,
            };
            run_edit(args, &options).await?;
        }
        Commands::Categories { command } => run_categories(command, &options).await?,
        Commands::Auth { command } => run_auth(command, &options).await?,
        Commands::Config { command } => run_config(command, &options)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
