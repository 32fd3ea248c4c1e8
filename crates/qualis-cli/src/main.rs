//! Qualis CLI
//!
//! Imports Bitbucket Server repositories as Qualis projects and manages the
//! database schema.

mod commands;

use clap::{Parser, Subcommand};
use commands::{BitbucketCommand, MigrateCommand};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "QUALIS_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "QUALIS_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and import Bitbucket Server repositories
    Bitbucket(BitbucketCommand),
    /// Apply or roll back database migrations
    Migrate(MigrateCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) if std::env::var("RUST_LOG").is_ok() => filter,
        _ => tracing_subscriber::EnvFilter::try_new(format!(
            "qualis_cli={level},\
             qualis_alm={level},\
             qualis_core={level},\
             qualis_migrations={level},\
             sea_orm_migration={level},\
             sqlx=warn,\
             sea_orm=warn,\
             hyper=warn,\
             reqwest=warn",
            level = cli.log_level
        ))?,
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Bitbucket(bitbucket_cmd) => bitbucket_cmd.execute(),
        Commands::Migrate(migrate_cmd) => migrate_cmd.execute(),
    }
}
