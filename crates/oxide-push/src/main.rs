//! oxide-push CLI
//!
//! Pushes a desired schema to a database.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_push::{
    PushConfig, PushEngine, PushError, PushOutcome, RunOptions, SqlxDriver, TerminalPrompt,
};
use oxide_sqlgen::adapter_for;

/// Schema push for PostgreSQL, MySQL and SQLite.
#[derive(Parser)]
#[command(name = "oxide-push")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make the database match the desired schema.
    Push {
        /// Config file.
        #[arg(short, long, default_value = "oxide.toml")]
        config: PathBuf,

        /// Database URL, overriding the config file.
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        /// Desired schema JSON, overriding the config file.
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Apply destructive changes without asking.
        #[arg(long, alias = "force")]
        accept_data_loss: bool,

        /// Drop all tables and enums before pushing.
        #[arg(long)]
        force_reset: bool,

        /// Show and confirm every statement before executing.
        #[arg(long)]
        strict: bool,

        /// Enable verbose output.
        #[arg(short, long)]
        verbose: bool,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Commands::Push {
        config,
        database_url,
        schema,
        accept_data_loss,
        force_reset,
        strict,
        verbose,
        dry_run,
    } = cli.command;

    // Flags win over the file.
    let explicit = config.as_os_str() != "oxide.toml";
    let mut settings = PushConfig::load_or_default(&config, explicit)?;
    if database_url.is_some() {
        settings.url = database_url;
    }
    if schema.is_some() {
        settings.schema = schema;
    }
    settings.strict |= strict;
    settings.verbose |= verbose;

    // Setup logging
    let log_level = if settings.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = RunOptions {
        accept_data_loss,
        dry_run,
        force_reset,
        strict: settings.strict,
        transaction: settings.transaction,
    };

    tokio::select! {
        result = push(&settings, options) => match result {
            Err(e) if e.is_cancellation() => {
                info!("{e}");
                Ok(())
            }
            other => other.map_err(Into::into),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, nothing more will be executed.");
            Ok(())
        }
    }
}

async fn push(settings: &PushConfig, options: RunOptions) -> Result<(), PushError> {
    let kind = settings.dialect()?;
    let desired = settings.load_schema()?;
    let mut driver = SqlxDriver::with_kind(settings.url()?, kind);
    let engine = PushEngine::new(adapter_for(kind, settings.extensions), options);
    let mut prompt = TerminalPrompt::new();
    let mut confirm = prompt.clone();

    info!(dialect = %kind, tables = desired.tables.len(), "pushing schema");
    match engine
        .push(&mut driver, &desired, &mut prompt, &mut confirm)
        .await?
    {
        PushOutcome::NoChanges => info!("No changes."),
        PushOutcome::DryRun { statements, report } => {
            for section in &report {
                print!("{section}");
            }
            println!();
            for sql in &statements {
                println!("{sql};");
            }
            info!("Dry run mode - {} statement(s) not executed.", statements.len());
        }
        PushOutcome::Applied { statements, .. } => {
            info!("Applied {} statement(s).", statements.len());
        }
    }
    Ok(())
}
