//! Tool Server (C8) — JSON-RPC 2.0 over stdio. One request per line on
//! standard input, one response per line on standard output. Standard
//! error carries diagnostics only. The loop is single-threaded
//! cooperative: each request runs to completion before the next line is
//! read.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{error, warn};

use scriptdex::config::Config;
use scriptdex::embedding::EmbeddingClient;
use scriptdex::error::CoreError;
use scriptdex::models::SearchOptions;
use scriptdex::repository::Repository;
use scriptdex::search::VectorSearch;
use scriptdex::storage::StorageClient;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "scriptdex";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Backing clients, initialized lazily on the first `tools/call`.
struct Backend {
    storage: Arc<StorageClient>,
    repository: Repository,
    embedder: EmbeddingClient,
}

struct Server {
    backend: Mutex<Option<Backend>>,
}

impl Server {
    fn new() -> Self {
        Server { backend: Mutex::new(None) }
    }

    async fn ensure_backend(&self) -> anyhow::Result<()> {
        let mut guard = self.backend.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let config = Config::from_env()?;
        let storage = Arc::new(StorageClient::new(config.turso_url.clone(), config.turso_auth_token.clone())?);
        storage.connect().await?;
        let repository = Repository::new(storage.clone());
        repository.initialize_schema().await?;
        let embedder = EmbeddingClient::new(
        config.openai_api_key.clone(),
        config.embedding_model.clone(),
        Some(config.embedding_dimensions),
    );
        *guard = Some(Backend { storage, repository, embedder });
        Ok(())
    }

    async fn shutdown(&self) {
        let mut guard = self.backend.lock().await;
        if let Some(backend) = guard.take() {
            backend.storage.disconnect().await;
        }
    }

    async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);
        match self.dispatch(&request).await {
            Ok(result) => JsonRpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None },
            Err(e) => {
                error!(method = %request.method, error = %e, "request handler failed");
                JsonRpcResponse {
                    jsonrpc: "2.0",
                    id,
                    result: None,
                    error: Some(JsonRpcError { code: -32603, message: e.to_string() }),
                }
            }
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> anyhow::Result<Value> {
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
            })),
            "tools/list" => Ok(json!({ "tools": tool_catalog() })),
            "tools/call" => self.call_tool(&request.params).await,
            other => anyhow::bail!("unknown method: {other}"),
        }
    }

    async fn call_tool(&self, params: &Value) -> anyhow::Result<Value> {
        self.ensure_backend().await?;
        let guard = self.backend.lock().await;
        let backend = guard.as_ref().expect("backend initialized above");

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("tools/call requires a tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let payload = match name {
            "search_scripts" => search_scripts(backend, &arguments).await?,
            "list_scripts" => list_scripts(backend, &arguments).await?,
            "get_script" => get_script(backend, &arguments).await?,
            other => anyhow::bail!("unknown tool: {other}"),
        };

        Ok(json!({
            "content": [{ "type": "text", "text": serde_json::to_string(&payload)? }]
        }))
    }
}

fn tool_catalog() -> Value {
    json!([
        {
            "name": "search_scripts",
            "description": "Search indexed scripts by description similarity",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "category": { "type": "string" },
                    "limit": { "type": "number" },
                    "minSimilarity": { "type": "number" },
                },
                "required": ["query"],
            },
        },
        {
            "name": "list_scripts",
            "description": "List indexed scripts, optionally filtered by category",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "category": { "type": "string" },
                    "limit": { "type": "number" },
                },
            },
        },
        {
            "name": "get_script",
            "description": "Fetch a single script by exact name, falling back to a path substring match",
            "inputSchema": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"],
            },
        },
    ])
}

async fn search_scripts(backend: &Backend, arguments: &Value) -> anyhow::Result<Value> {
    let query = arguments
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("search_scripts requires 'query'"))?;
    let category = arguments.get("category").and_then(Value::as_str).map(str::to_string);
    let limit = arguments.get("limit").and_then(Value::as_u64).unwrap_or(5) as usize;
    let min_similarity = arguments.get("minSimilarity").and_then(Value::as_f64).unwrap_or(0.0) as f32;

    let search = VectorSearch::new(&backend.repository, &backend.embedder);
    let options = SearchOptions {
        top_n: limit.max(1),
        category,
        min_similarity: Some(min_similarity),
    };
    let results = search.search(query, &options).await?;

    Ok(json!({
        "found": results.len(),
        "results": results.into_iter().map(|r| json!({
            "name": r.record.name,
            "path": r.record.path,
            "category": r.record.category,
            "description": r.record.description,
            "usage": r.record.usage,
            "tags": r.record.tags,
            "similarity": format!("{:.3}", r.similarity).parse::<f64>().unwrap_or(0.0),
        })).collect::<Vec<_>>(),
    }))
}

async fn list_scripts(backend: &Backend, arguments: &Value) -> anyhow::Result<Value> {
    let category = arguments.get("category").and_then(Value::as_str).map(str::to_string);
    let limit = arguments.get("limit").and_then(Value::as_i64).unwrap_or(50);

    let records = backend
        .repository
        .list(&scriptdex::models::ListOptions { limit, offset: 0, category })
        .await?;

    Ok(json!({
        "count": records.len(),
        "scripts": records.into_iter().map(|r| json!({
            "name": r.name,
            "path": r.path,
            "category": r.category,
            "description": r.description,
            "usage": r.usage,
            "tags": r.tags,
        })).collect::<Vec<_>>(),
    }))
}

async fn get_script(backend: &Backend, arguments: &Value) -> anyhow::Result<Value> {
    let name = arguments
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("get_script requires 'name'"))?;

    let mut found = None;
    let records = backend
        .repository
        .list(&scriptdex::models::ListOptions { limit: 10_000, offset: 0, category: None })
        .await?;
    for record in &records {
        if record.name == name {
            found = Some(record.clone());
            break;
        }
    }
    if found.is_none() {
        for record in &records {
            if record.path.contains(name) {
                found = Some(record.clone());
                break;
            }
        }
    }

    match found {
        Some(record) => Ok(json!({
            "name": record.name,
            "path": record.path,
            "category": record.category,
            "description": record.description,
            "usage": record.usage,
            "tags": record.tags,
        })),
        None => Err(CoreError::NotFound(format!("Script not found: {name}")).into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let server = Server::new();
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "malformed JSON-RPC line, skipping");
                continue;
            }
        };
        let response = server.handle(request).await;
        let serialized = serde_json::to_string(&response)?;
        stdout.write_all(serialized.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    server.shutdown().await;
    Ok(())
}
