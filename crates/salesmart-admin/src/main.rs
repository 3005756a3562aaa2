use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use salesmart_core::{
    config::PipelineConfig,
    db,
    entities::all_entity_descriptors,
    extract::{http_client, StoreApiClient},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Salesmart administrative tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tables available in the source database
    ListTables(ConfigArgs),
    /// Ask the store API how many stores it serves
    CountStores(ConfigArgs),
    /// Show the registered entities and their destination tables
    Entities,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Pipeline configuration file
    #[arg(long, default_value = "salesmart.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::ListTables(args) => handle_list_tables(args).await,
        Command::CountStores(args) => handle_count_stores(args).await,
        Command::Entities => {
            for descriptor in all_entity_descriptors() {
                println!(
                    "{:<12} {:<18} {:<15} {}",
                    descriptor.code,
                    descriptor.destination_table,
                    descriptor.source_kind,
                    descriptor.description
                );
            }
            Ok(())
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    dotenvy::dotenv().ok();
    let mut config = PipelineConfig::from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    config.apply_env_overrides();
    Ok(config)
}

async fn handle_list_tables(args: ConfigArgs) -> Result<()> {
    let config = load_config(&args)?;
    let database_url = config
        .source_database_url()
        .context("SALESMART_SOURCE_DATABASE_URL must be set")?;

    let pool = db::connect(database_url).await?;
    let tables = db::list_tables(&pool).await?;
    info!(count = tables.len(), "listed source tables");

    for table in tables {
        println!("{table}");
    }
    Ok(())
}

async fn handle_count_stores(args: ConfigArgs) -> Result<()> {
    let config = load_config(&args)?;
    let client = StoreApiClient::new(http_client()?, config.store_api()?.clone());

    let count = client.number_of_stores().await?;
    println!("{count}");
    Ok(())
}
