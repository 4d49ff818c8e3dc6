//! End-to-end pipeline: discover a tree of scripts, seed them into the
//! store, and search back by description similarity.
//!
//! Each seeding pass below walks a directory holding exactly one matching
//! file, so the embedding batch sent to the stub server always has exactly
//! one element — this keeps the stub's request matching unambiguous without
//! depending on directory traversal order.

use std::sync::Arc;

use scriptdex::embedding::EmbeddingClient;
use scriptdex::models::SearchOptions;
use scriptdex::repository::Repository;
use scriptdex::search::VectorSearch;
use scriptdex::seeder::Seeder;
use scriptdex::storage::StorageClient;

fn write_script(dir: &std::path::Path, rel: &str, contents: &str) {
    let full = dir.join(rel);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, contents).unwrap();
}

fn mock_server_with_fixed_vectors() -> httpmock::MockServer {
    let server = httpmock::MockServer::start();
    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/embeddings")
            .body_contains("PulseAudio");
        then.status(200).json_body(serde_json::json!({
            "model": "text-embedding-3-small",
            "data": [{ "embedding": [1.0, 0.0] }],
            "usage": { "total_tokens": 4 },
        }));
    });
    server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/embeddings")
            .body_contains("Restart the audio daemon");
        then.status(200).json_body(serde_json::json!({
            "model": "text-embedding-3-small",
            "data": [{ "embedding": [0.0, 1.0] }],
            "usage": { "total_tokens": 4 },
        }));
    });
    server
}

fn embedder_for(server: &httpmock::MockServer) -> EmbeddingClient {
    EmbeddingClient::new("key", "text-embedding-3-small", Some(2)).with_base_url(server.url("/embeddings"))
}

#[tokio::test]
async fn seed_then_search_round_trips_through_analyzer_and_repository() {
    let server = mock_server_with_fixed_vectors();
    let storage = Arc::new(StorageClient::new_in_memory_for_test().await.unwrap());
    Repository::new(storage.clone()).initialize_schema().await.unwrap();

    let audio_dir = tempfile::tempdir().unwrap();
    write_script(
        audio_dir.path(),
        "scripts/audio/configure-speakers.ts",
        r#"/**
 * Configure speakers via PulseAudio.
 *
 * Usage:
 *   run configure-speakers
 */
import { logger } from "./logger";
"#,
    );
    let audio_seeder = Seeder::new(Repository::new(storage.clone()), embedder_for(&server));
    let audio_report = audio_seeder.seed(audio_dir.path(), |_, _| {}).await;
    assert_eq!(audio_report.processed, 1);
    assert_eq!(audio_report.inserted, 1);
    assert!(audio_report.errors.is_empty());

    let system_dir = tempfile::tempdir().unwrap();
    write_script(
        system_dir.path(),
        "scripts/system/restart-audio.ts",
        "// description: Restart the audio daemon\nconst x = 1;\n",
    );
    write_script(system_dir.path(), "README.md", "not a script, ignored by suffix filter");
    let system_seeder = Seeder::new(Repository::new(storage.clone()), embedder_for(&server));
    let system_report = system_seeder.seed(system_dir.path(), |_, _| {}).await;
    assert_eq!(system_report.processed, 1, "README.md must be filtered out by suffix");
    assert_eq!(system_report.inserted, 1);

    let categories_repo = Repository::new(storage.clone());
    let categories = categories_repo.list_categories().await.unwrap();
    assert_eq!(categories, vec!["audio".to_string(), "system".to_string()]);

    let search_repo = Repository::new(storage);
    let search_embedder = embedder_for(&server);
    let search = VectorSearch::new(&search_repo, &search_embedder);

    let results = search
        .search(
            "Configure speakers via PulseAudio.",
            &SearchOptions { top_n: 1, category: None, min_similarity: None },
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.name, "configure-speakers");
    assert_eq!(results[0].record.category, "audio");
    assert!(results[0].record.tags.contains(&"pulseaudio".to_string()));
    assert!(results[0].similarity > 0.99);
}

#[tokio::test]
async fn seeding_twice_upserts_by_path_without_duplicating_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "scripts/system/restart-audio.ts",
        "// description: Restart the audio daemon\nconst x = 1;\n",
    );

    let server = mock_server_with_fixed_vectors();
    let storage = Arc::new(StorageClient::new_in_memory_for_test().await.unwrap());
    let repository = Repository::new(storage.clone());
    let seeder = Seeder::new(repository, embedder_for(&server));
    seeder.initialize_schema().await.unwrap();

    seeder.seed(dir.path(), |_, _| {}).await;
    let second = seeder.seed(dir.path(), |_, _| {}).await;
    assert_eq!(second.inserted, 1);

    let count_repo = Repository::new(storage);
    assert_eq!(count_repo.count(None).await.unwrap(), 1);
}
