//! Vector Search (C6) — cosine similarity over an in-memory candidate set
//! fetched from the Repository, with category filter, a similarity
//! threshold, and top-N ranking.

use crate::embedding::{cosine_similarity, EmbeddingClient};
use crate::error::CoreError;
use crate::models::{ListOptions, SearchOptions, SearchResult};
use crate::repository::Repository;

/// Candidate fetch is bounded at this limit; it must be high enough that
/// the full table under a single category can be scanned in one page.
/// Above this, a true vector-index back-end is required.
const CANDIDATE_LIMIT: i64 = 10_000;

pub struct VectorSearch<'a> {
    repository: &'a Repository,
    embedder: &'a EmbeddingClient,
}

impl<'a> VectorSearch<'a> {
    pub fn new(repository: &'a Repository, embedder: &'a EmbeddingClient) -> Self {
        VectorSearch { repository, embedder }
    }

    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, CoreError> {
        if query.trim().is_empty() {
            return Err(CoreError::InvalidInput("query must not be empty".into()));
        }
        if options.top_n == 0 {
            return Err(CoreError::InvalidInput("top_n must be positive".into()));
        }

        let query_embedding = self.embedder.embed(query).await?;

        let candidates = self
            .repository
            .list(&ListOptions {
                limit: CANDIDATE_LIMIT,
                offset: 0,
                category: options.category.clone(),
            })
            .await?;

        let mut results: Vec<SearchResult> = Vec::new();
        for record in candidates {
            let Some(ref embedding) = record.embedding else {
                continue;
            };
            if embedding.len() != query_embedding.vector.len() {
                return Err(CoreError::DimensionMismatch {
                    expected: query_embedding.vector.len(),
                    actual: embedding.len(),
                });
            }
            let similarity = cosine_similarity(&query_embedding.vector, embedding);
            if let Some(threshold) = options.min_similarity {
                if similarity < threshold {
                    continue;
                }
            }
            results.push(SearchResult { record, similarity });
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        results.truncate(options.top_n);

        Ok(results)
    }
}
