mod db;
mod email;
mod import;
mod shipments;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::email::EmailCommands;
use crate::import::ImportCommands;
use crate::shipments::ShipmentCommands;

#[derive(Debug, Parser)]
#[command(name = "f2f-cli")]
#[command(about = "Farm2Fork back-office command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import catalog and orders from the legacy WooCommerce store
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Shipment batching tools
    Shipments {
        #[command(subcommand)]
        command: ShipmentCommands,
    },
    /// Email template tools
    Email {
        #[command(subcommand)]
        command: EmailCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Insert email templates from the seed file for triggers that have none
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("f2f-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = f2f_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Commands::Import {
        command: ImportCommands::Ping,
    } = &command
    {
        return import::run_import_ping(&config).await;
    }

    let pool_config = f2f_db::PoolConfig::from_app_config(&config);
    let pool = f2f_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_db_ping(&pool).await,
            DbCommands::Migrate => db::run_db_migrate(&pool).await,
            DbCommands::Seed => db::run_db_seed(&pool, &config).await,
        },
        Commands::Import { command } => import::run(&pool, &config, &command).await,
        Commands::Shipments { command } => shipments::run(&pool, command).await,
        Commands::Email { command } => email::run(&pool, &config, command).await,
    }
}
