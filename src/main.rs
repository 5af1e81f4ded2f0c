use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod knowledge;
mod metrics;
mod models;
mod normalize;
mod quality;
mod report;
mod risk;
mod tables;
mod tickets;
mod trends;

use config::{RequestContext, Settings};
use report::{Action, Response};
use tables::{CsvDirectory, MemoryTables};

const LOG_ENV: &str = "SUPPORT_INTEL_LOG";

#[derive(Parser)]
#[command(name = "support-intel")]
#[command(about = "Support ticket intelligence reports from operational tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Replace one source table with the rows of a CSV file
    Import {
        #[arg(long)]
        table: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run one report action and print the JSON response
    Query {
        /// getDashboard, getTrends, getQualityData, getMetrics or getKB
        #[arg(long)]
        action: String,
        /// Read tables from `<dir>/<table>.csv` instead of Postgres
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(settings.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

async fn query_postgres(settings: &Settings, action: &str, ctx: &RequestContext) -> Response {
    let Ok(parsed) = action.parse::<Action>() else {
        return report::respond(action, &MemoryTables::new(), ctx);
    };

    let snapshot = async {
        let pool = connect(settings).await?;
        db::load_snapshot(&pool, parsed.tables()).await
    };

    match snapshot.await {
        Ok(snapshot) => report::respond(action, &snapshot, ctx),
        Err(err) => {
            let message = format!("{err:#}");
            error!(action, error = %message, "failed to load table snapshot");
            Response::error(message)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let settings = Settings::load(None)?;
            let pool = connect(&settings).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import { table, csv } => {
            let settings = Settings::load(None)?;
            let pool = connect(&settings).await?;
            let imported = db::import_csv(&pool, &table, &csv).await?;
            println!("Imported {imported} rows into {table} from {}.", csv.display());
        }
        Commands::Query {
            action,
            data_dir,
            pretty,
        } => {
            let settings = Settings::load(data_dir)?;
            let ctx = settings.request_context(Utc::now());

            let response = match &settings.data_dir {
                Some(dir) => report::respond(&action, &CsvDirectory::new(dir), &ctx),
                None => query_postgres(&settings, &action, &ctx).await,
            };

            if response.is_error() {
                warn!(action = %action, "request answered with an error payload");
            }

            let body = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{body}");
        }
    }

    Ok(())
}
