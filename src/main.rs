//! CLI Front-end (C7) — parses argv, loads config, wires the Storage,
//! Embedding, Repository, and Vector Search components, and formats
//! results for a terminal.

use std::sync::Arc;

use clap::Parser;

use scriptdex::config::Config;
use scriptdex::embedding::EmbeddingClient;
use scriptdex::models::SearchOptions;
use scriptdex::repository::Repository;
use scriptdex::search::VectorSearch;
use scriptdex::storage::StorageClient;

/// Search the indexed script library by description similarity.
#[derive(Parser)]
#[command(name = "scriptdex", version, about)]
struct Cli {
    /// Search query; positional words are joined by single spaces.
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,

    /// Filter by category.
    #[arg(long)]
    category: Option<String>,

    /// Maximum number of results.
    #[arg(long)]
    limit: Option<i64>,

    /// Minimum similarity threshold in [-1, 1].
    #[arg(long = "min-similarity")]
    min_similarity: Option<f32>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let query = cli.query.join(" ");
    if query.trim().is_empty() {
        anyhow::bail!("missing query");
    }

    let limit = cli.limit.unwrap_or(10);
    if limit <= 0 {
        anyhow::bail!("--limit must be positive");
    }

    if let Some(threshold) = cli.min_similarity {
        if !(-1.0..=1.0).contains(&threshold) {
            anyhow::bail!("--min-similarity must be in [-1, 1]");
        }
    }

    let config = Config::from_env()?;

    let storage = Arc::new(StorageClient::new(config.turso_url.clone(), config.turso_auth_token.clone())?);
    storage.connect().await?;
    let repository = Repository::new(storage.clone());
    let embedder = EmbeddingClient::new(
        config.openai_api_key.clone(),
        config.embedding_model.clone(),
        Some(config.embedding_dimensions),
    );
    let search = VectorSearch::new(&repository, &embedder);

    let options = SearchOptions {
        top_n: limit as usize,
        category: cli.category,
        min_similarity: cli.min_similarity,
    };

    let results = search.search(&query, &options).await;
    storage.disconnect().await;
    let results = results?;

    print_results(&results);
    Ok(())
}

fn print_results(results: &[scriptdex::models::SearchResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for result in results {
        println!("[{:.2}] {}", result.similarity, result.record.name);
        println!("  Category: {}", result.record.category);
        if let Some(ref description) = result.record.description {
            if !description.is_empty() {
                println!("  {description}");
            }
        }
        if let Some(ref usage) = result.record.usage {
            if !usage.is_empty() {
                println!("  Usage: {usage}");
            }
        }
        println!();
    }
}
