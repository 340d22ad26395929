use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use assetdesk_api::{config, db, migrator::Migrator};

#[derive(Parser)]
#[command(name = "migration", about = "Apply or roll back the AssetDesk schema", version)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        #[arg(long, help = "Apply at most this many migrations")]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1, help = "Number of migrations to roll back")]
        steps: u32,
    },
    /// Drop every table and reapply all migrations
    Fresh,
    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let db_config = match cli.database_url {
        Some(url) => {
            config::init_tracing("info", false);
            db::DbConfig {
                url,
                ..db::DbConfig::default()
            }
        }
        None => {
            let cfg = config::load_config().context("failed to load configuration")?;
            config::init_tracing(cfg.log_level(), cfg.log_json);
            db::DbConfig::from(&cfg)
        }
    };

    let conn = db::establish_connection_with_config(&db_config)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&conn, steps).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&conn, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Fresh => {
            Migrator::fresh(&conn).await?;
            info!("Schema recreated");
        }
        Command::Status => Migrator::status(&conn).await?,
    }

    Ok(())
}
