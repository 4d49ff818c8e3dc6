//! Seeder driver binary — walks a directory tree and indexes every
//! matching script into the remote store (C5, wired standalone).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use scriptdex::config::Config;
use scriptdex::embedding::EmbeddingClient;
use scriptdex::repository::Repository;
use scriptdex::seeder::Seeder;
use scriptdex::storage::StorageClient;

#[derive(Parser)]
#[command(name = "scriptdex-seed", version, about = "Index a script tree into scriptdex")]
struct Cli {
    /// Root directory to walk.
    root: PathBuf,

    /// Suffix a file must end with to be indexed.
    #[arg(long, default_value = ".ts")]
    suffix: String,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let storage = Arc::new(StorageClient::new(config.turso_url.clone(), config.turso_auth_token.clone())?);
    storage.connect().await?;
    let repository = Repository::new(storage.clone());
    let embedder = EmbeddingClient::new(
        config.openai_api_key.clone(),
        config.embedding_model.clone(),
        Some(config.embedding_dimensions),
    );
    let seeder = Seeder::new(repository, embedder).with_source_suffix(cli.suffix);

    seeder.initialize_schema().await?;
    let report = seeder
        .seed(&cli.root, |current, total| {
            println!("progress: {current}/{total}");
        })
        .await;
    storage.disconnect().await;

    info!(
        processed = report.processed,
        inserted = report.inserted,
        failed = report.failed,
        "seeding complete"
    );
    println!(
        "processed: {}, inserted: {}, failed: {}",
        report.processed, report.inserted, report.failed
    );
    for error in &report.errors {
        eprintln!("  {error}");
    }

    Ok(())
}
