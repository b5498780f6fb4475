mod app;
mod auth;
mod cli;
mod config;
mod error;
mod infisical;
mod input;
mod keystore;
mod kubeconfig;
mod model;
mod modes;
mod picker;
mod select;
mod shell;
mod ui;

use anyhow::{Context, Result};
use auth::{CredentialManager, TerminalPrompter};
use clap::Parser;
use cli::CliArgs;
use config::AppConfig;
use error::{AuthError, Failure, compact_error};
use infisical::InfisicalConnector;
use keystore::KeyringStore;
use model::Mode;
use modes::{Outcome, SelectOptions, Session};
use picker::TerminalPicker;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    if let Err(error) = init_tracing(&args.log_filter) {
        eprintln!("{}", compact_error(&error));
    }

    let verbose = args.verbose;
    match run(args).await {
        Ok(outcome) => {
            debug!("finished: {outcome:?}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            println!("{}", failure.render(verbose));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();

    Ok(())
}

async fn run(args: CliArgs) -> Result<Outcome, Failure> {
    let config = AppConfig::from_env(&args)?;
    debug!("server={} project={}", config.server, config.project_id);

    let connector = InfisicalConnector::new(&config.server, config.project_id.clone())
        .map_err(|e| Failure::with_detail("Failed to authenticate", e))?;

    let store = KeyringStore::new();
    let mut prompter = TerminalPrompter;
    let mut stdout = io::stdout();
    let client = CredentialManager::new(
        config.credentials.clone(),
        &store,
        &mut prompter,
        &mut stdout,
        config.verbose,
    )
    .authenticate(&connector)
    .await
    .map_err(|e| auth_failure(&e))?;

    let mode = Mode::resolve(config.delete, io::stdin().is_terminal());
    debug!("mode={mode:?}");

    let mut session = Session::new(&client, &mut stdout, config.verbose);
    let mut picker = TerminalPicker;
    match mode {
        Mode::Store => {
            let input = io::read_to_string(io::stdin())
                .context("failed to read kubeconfig from stdin")
                .map_err(|e| Failure::from_chain("Error reading from stdin", &e))?;
            session.store(&input).await
        }
        Mode::Select => {
            let options = SelectOptions {
                filter: &config.filter,
                ephemeral: config.ephemeral,
                shell: &config.shell,
                home: config.home.as_deref(),
            };
            session.select(&mut picker, &options).await
        }
        Mode::Delete => {
            session
                .delete(&mut picker, &mut prompter, &config.filter)
                .await
        }
    }
}

fn auth_failure(error: &AuthError) -> Failure {
    let summary = format!("Failed to authenticate: {error}");
    match std::error::Error::source(error) {
        Some(source) => Failure::with_detail(summary, source),
        None => Failure::new(summary),
    }
}
