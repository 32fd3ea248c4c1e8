use clap::{Args, Subcommand};
use colored::Colorize;
use qualis_core::DatabaseConfig;
use qualis_migrations::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::{MigrationStatus, MigratorTrait};
use tracing::info;

#[derive(Args)]
pub struct MigrateCommand {
    /// Database connection URL
    #[arg(long, env = "QUALIS_DATABASE_URL")]
    pub database_url: String,

    #[command(subcommand)]
    pub command: MigrateCommands,
}

#[derive(Subcommand)]
pub enum MigrateCommands {
    /// Apply all pending migrations
    Up,
    /// Roll back the most recent migrations
    Down {
        /// Number of migrations to roll back
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations are applied
    Status,
}

impl MigrateCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let db = connect(&DatabaseConfig::new(self.database_url)).await?;

        match self.command {
            MigrateCommands::Up => {
                info!("Applying pending migrations");
                Migrator::up(&db, None).await?;
                println!("{}", "✅ Database is up to date".bright_green());
            }
            MigrateCommands::Down { steps } => {
                info!("Rolling back {} migration(s)", steps);
                Migrator::down(&db, Some(steps)).await?;
                println!(
                    "{} {}",
                    "✅ Rolled back".bright_green(),
                    format!("{} migration(s)", steps).bright_white()
                );
            }
            MigrateCommands::Status => {
                for migration in Migrator::get_migration_with_status(&db).await? {
                    let status = match migration.status() {
                        MigrationStatus::Applied => "applied".bright_green(),
                        MigrationStatus::Pending => "pending".bright_yellow(),
                    };
                    println!("{:<50} {}", migration.name(), status);
                }
            }
        }

        Ok(())
    }
}

async fn connect(config: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    Ok(Database::connect(options).await?)
}
