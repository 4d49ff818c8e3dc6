//! Repository (C4) — CRUD and pagination over the `scripts` table, on
//! top of the Storage Client. Maps rows to `ScriptRecord`s and back.

use std::sync::Arc;

use crate::error::CoreError;
use crate::models::{ListOptions, ScriptPatch, ScriptRecord};
use crate::storage::{Param, Row, StorageClient};

pub struct Repository {
    storage: Arc<StorageClient>,
}

impl Repository {
    pub fn new(storage: Arc<StorageClient>) -> Self {
        Repository { storage }
    }

    /// Create the `scripts` table and its indices if absent. Safe to call repeatedly.
    pub async fn initialize_schema(&self) -> Result<(), CoreError> {
        self.storage
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS scripts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    path TEXT UNIQUE NOT NULL,
                    category TEXT NOT NULL,
                    description TEXT,
                    usage TEXT,
                    tags TEXT,
                    dependencies TEXT,
                    embedding_text TEXT,
                    embedding TEXT,
                    tokens INTEGER,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
                )
                "#,
                &[],
            )
            .await?;
        self.storage
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_scripts_category ON scripts(category)",
                &[],
            )
            .await?;
        self.storage
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_scripts_path ON scripts(path)",
                &[],
            )
            .await?;
        Ok(())
    }

    /// Insert a record, or replace the existing row sharing its `path`.
    /// Returns the assigned id.
    pub async fn create(&self, record: &ScriptRecord) -> Result<i64, CoreError> {
        if record.name.is_empty() || record.path.is_empty() || record.category.is_empty() {
            return Err(CoreError::InvalidInput(
                "name, path, and category must not be empty".into(),
            ));
        }

        let tags_json = serde_json::to_string(&record.tags).unwrap_or_else(|_| "[]".into());
        let deps_json =
            serde_json::to_string(&record.dependencies).unwrap_or_else(|_| "[]".into());
        let embedding_json = record
            .embedding
            .as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".into()));

        self.storage
            .execute(
                r#"
                INSERT INTO scripts (name, path, category, description, usage, tags, dependencies, embedding_text, embedding, tokens, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(path) DO UPDATE SET
                    name = excluded.name,
                    category = excluded.category,
                    description = excluded.description,
                    usage = excluded.usage,
                    tags = excluded.tags,
                    dependencies = excluded.dependencies,
                    embedding_text = excluded.embedding_text,
                    embedding = excluded.embedding,
                    tokens = excluded.tokens,
                    updated_at = CURRENT_TIMESTAMP
                "#,
                &[
                    Param::from(record.name.clone()),
                    Param::from(record.path.clone()),
                    Param::from(record.category.clone()),
                    Param::from(record.description.clone()),
                    Param::from(record.usage.clone()),
                    Param::from(tags_json),
                    Param::from(deps_json),
                    Param::from(record.embedding_text.clone()),
                    Param::from(embedding_json),
                    Param::from(record.tokens),
                ],
            )
            .await?;

        match self.get_by_path(&record.path).await? {
            Some(row) => Ok(row.id),
            None => self.storage.last_insert_rowid().await,
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ScriptRecord>, CoreError> {
        let rows = self
            .storage
            .query(select_sql("WHERE id = ?"), &[Param::from(id)])
            .await?;
        Ok(rows.into_iter().next().map(row_to_record))
    }

    pub async fn get_by_path(&self, path: &str) -> Result<Option<ScriptRecord>, CoreError> {
        let rows = self
            .storage
            .query(select_sql("WHERE path = ?"), &[Param::from(path.to_string())])
            .await?;
        Ok(rows.into_iter().next().map(row_to_record))
    }

    /// Update only the fields present in `patch`. A call with no updatable
    /// fields is a no-op; `updated_at` is refreshed server-side on any write.
    pub async fn update(&self, id: i64, patch: &ScriptPatch) -> Result<(), CoreError> {
        if id <= 0 {
            return Err(CoreError::InvalidInput("id must be positive".into()));
        }
        if patch.is_empty() {
            return Ok(());
        }

        let mut sets = Vec::new();
        let mut params: Vec<Param> = Vec::new();

        if let Some(ref v) = patch.description {
            sets.push("description = ?");
            params.push(Param::from(v.clone()));
        }
        if let Some(ref v) = patch.usage {
            sets.push("usage = ?");
            params.push(Param::from(v.clone()));
        }
        if let Some(ref v) = patch.tags {
            sets.push("tags = ?");
            params.push(Param::from(serde_json::to_string(v).unwrap_or_else(|_| "[]".into())));
        }
        if let Some(ref v) = patch.dependencies {
            sets.push("dependencies = ?");
            params.push(Param::from(serde_json::to_string(v).unwrap_or_else(|_| "[]".into())));
        }
        if let Some(ref v) = patch.embedding_text {
            sets.push("embedding_text = ?");
            params.push(Param::from(v.clone()));
        }
        if let Some(ref v) = patch.embedding {
            sets.push("embedding = ?");
            params.push(Param::from(serde_json::to_string(v).unwrap_or_else(|_| "[]".into())));
        }
        if let Some(v) = patch.tokens {
            sets.push("tokens = ?");
            params.push(Param::from(v));
        }

        sets.push("updated_at = CURRENT_TIMESTAMP");
        let sql = format!("UPDATE scripts SET {} WHERE id = ?", sets.join(", "));
        params.push(Param::from(id));

        self.storage.execute(&sql, &params).await
    }

    /// Idempotent: deleting a missing row succeeds.
    pub async fn delete(&self, id: i64) -> Result<(), CoreError> {
        if id <= 0 {
            return Err(CoreError::InvalidInput("id must be positive".into()));
        }
        self.storage
            .execute("DELETE FROM scripts WHERE id = ?", &[Param::from(id)])
            .await
    }

    /// Ascending `id` order; category filter, when present, is an equality match.
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<ScriptRecord>, CoreError> {
        let (where_clause, mut params) = category_filter(&options.category);
        let sql = format!(
            "{} {} ORDER BY id ASC LIMIT ? OFFSET ?",
            select_sql(""),
            where_clause
        );
        params.push(Param::from(options.limit));
        params.push(Param::from(options.offset));

        let rows = self.storage.query(&sql, &params).await?;
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    pub async fn count(&self, category: Option<&str>) -> Result<i64, CoreError> {
        let (where_clause, params) = category_filter(&category.map(|s| s.to_string()));
        let sql = format!("SELECT COUNT(*) AS n FROM scripts {where_clause}");
        let rows = self.storage.query(&sql, &params).await?;
        Ok(rows.first().and_then(|r| r.get_i64("n")).unwrap_or(0))
    }

    /// Distinct categories, lexicographic order.
    pub async fn list_categories(&self) -> Result<Vec<String>, CoreError> {
        let rows = self
            .storage
            .query("SELECT DISTINCT category FROM scripts ORDER BY category ASC", &[])
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get_str("category").map(|s| s.to_string()))
            .collect())
    }
}

fn category_filter(category: &Option<String>) -> (String, Vec<Param>) {
    match category {
        Some(c) => ("WHERE category = ?".to_string(), vec![Param::from(c.clone())]),
        None => (String::new(), Vec::new()),
    }
}

fn select_sql(suffix: &str) -> &'static str {
    // suffix is appended by callers after this constant; kept as a free fn
    // so the column list lives in exactly one place.
    const BASE: &str = "SELECT id, name, path, category, description, usage, tags, dependencies, embedding_text, embedding, tokens, created_at, updated_at FROM scripts";
    let _ = suffix;
    BASE
}

fn row_to_record(row: Row) -> ScriptRecord {
    let tags: Vec<String> = row
        .get_str("tags")
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();
    let dependencies: Vec<String> = row
        .get_str("dependencies")
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();
    let embedding: Option<Vec<f32>> = row
        .get_str("embedding")
        .and_then(|s| serde_json::from_str(s).ok());

    ScriptRecord {
        id: row.get_i64("id").unwrap_or_default(),
        name: row.get_str("name").unwrap_or_default().to_string(),
        path: row.get_str("path").unwrap_or_default().to_string(),
        category: row.get_str("category").unwrap_or_default().to_string(),
        description: row.get_str("description").map(|s| s.to_string()),
        usage: row.get_str("usage").map(|s| s.to_string()),
        tags,
        dependencies,
        embedding_text: row.get_str("embedding_text").map(|s| s.to_string()),
        embedding,
        tokens: row.get_i64("tokens").unwrap_or(0),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
        updated_at: row.get_str("updated_at").unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_sql_has_every_column() {
        let sql = select_sql("");
        for column in [
            "id",
            "name",
            "path",
            "category",
            "description",
            "usage",
            "tags",
            "dependencies",
            "embedding_text",
            "embedding",
            "tokens",
            "created_at",
            "updated_at",
        ] {
            assert!(sql.contains(column), "missing column {column}");
        }
    }

    #[test]
    fn category_filter_empty_when_unset() {
        let (clause, params) = category_filter(&None);
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn category_filter_binds_equality() {
        let (clause, params) = category_filter(&Some("audio".to_string()));
        assert_eq!(clause, "WHERE category = ?");
        assert_eq!(params.len(), 1);
    }

    fn sample_record(path: &str, description: &str) -> ScriptRecord {
        ScriptRecord {
            id: 0,
            name: "sample".to_string(),
            path: path.to_string(),
            category: "audio".to_string(),
            description: Some(description.to_string()),
            usage: None,
            tags: vec!["audio".to_string(), "config".to_string()],
            dependencies: vec!["./logger".to_string()],
            embedding_text: Some(description.to_string()),
            embedding: Some(vec![0.1, 0.2, 0.3]),
            tokens: 12,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn create_then_get_by_path_round_trips() {
        let storage = Arc::new(StorageClient::new_in_memory_for_test().await.unwrap());
        let repo = Repository::new(storage);
        repo.initialize_schema().await.unwrap();

        let record = sample_record("/a.ts", "Configure speakers");
        repo.create(&record).await.unwrap();

        let fetched = repo.get_by_path("/a.ts").await.unwrap().unwrap();
        assert_eq!(fetched.name, record.name);
        assert_eq!(fetched.path, record.path);
        assert_eq!(fetched.category, record.category);
        assert_eq!(fetched.tags, record.tags);
        assert_eq!(fetched.dependencies, record.dependencies);
        assert_eq!(fetched.embedding, record.embedding);
    }

    #[tokio::test]
    async fn upsert_by_path_replaces_prior_row() {
        let storage = Arc::new(StorageClient::new_in_memory_for_test().await.unwrap());
        let repo = Repository::new(storage);
        repo.initialize_schema().await.unwrap();

        repo.create(&sample_record("/a.ts", "first description")).await.unwrap();
        repo.create(&sample_record("/a.ts", "second description")).await.unwrap();

        assert_eq!(repo.count(None).await.unwrap(), 1);
        let fetched = repo.get_by_path("/a.ts").await.unwrap().unwrap();
        assert_eq!(fetched.description.as_deref(), Some("second description"));
    }

    #[tokio::test]
    async fn list_categories_is_distinct_and_sorted() {
        let storage = Arc::new(StorageClient::new_in_memory_for_test().await.unwrap());
        let repo = Repository::new(storage);
        repo.initialize_schema().await.unwrap();

        let mut audio = sample_record("/a.ts", "a");
        audio.category = "system".to_string();
        repo.create(&audio).await.unwrap();
        let mut dev = sample_record("/b.ts", "b");
        dev.category = "dev".to_string();
        repo.create(&dev).await.unwrap();
        let mut audio2 = sample_record("/c.ts", "c");
        audio2.category = "system".to_string();
        repo.create(&audio2).await.unwrap();

        let categories = repo.list_categories().await.unwrap();
        assert_eq!(categories, vec!["dev".to_string(), "system".to_string()]);
    }
}
