//! Core domain types shared across the search core.

/// Closed set of script categories; unrecognized classifications fall back to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Audio,
    System,
    Dev,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Audio => "audio",
            Category::System => "system",
            Category::Dev => "dev",
            Category::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "audio" => Category::Audio,
            "system" => Category::System,
            "dev" => Category::Dev,
            _ => Category::Other,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical script record, as persisted in the `scripts` table.
#[derive(Debug, Clone)]
pub struct ScriptRecord {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub category: String,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
    pub embedding_text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub tokens: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Metadata extracted by the Analyzer, prior to embedding.
#[derive(Debug, Clone)]
pub struct AnalyzedScript {
    pub name: String,
    pub path: String,
    pub category: String,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
}

/// A script record paired with its similarity score against a query vector.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub record: ScriptRecord,
    pub similarity: f32,
}

/// Outcome of one `Seeder::seed` run.
#[derive(Debug, Clone, Default)]
pub struct SeedingReport {
    pub processed: usize,
    pub inserted: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl SeedingReport {
    pub fn record_error(&mut self, path: &str, cause: impl std::fmt::Display) {
        self.failed += 1;
        self.errors.push(format!("{path}: {cause}"));
    }
}

/// Optional fields accepted by `Repository::update`; unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ScriptPatch {
    pub description: Option<String>,
    pub usage: Option<String>,
    pub tags: Option<Vec<String>>,
    pub dependencies: Option<Vec<String>>,
    pub embedding_text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub tokens: Option<i64>,
}

impl ScriptPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.usage.is_none()
            && self.tags.is_none()
            && self.dependencies.is_none()
            && self.embedding_text.is_none()
            && self.embedding.is_none()
            && self.tokens.is_none()
    }
}

/// Filter/pagination options accepted by `Repository::list` and `count`.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: i64,
    pub offset: i64,
    pub category: Option<String>,
}

/// Options accepted by `VectorSearch::search`.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub top_n: usize,
    pub category: Option<String>,
    pub min_similarity: Option<f32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            top_n: 10,
            category: None,
            min_similarity: None,
        }
    }
}

/// Aggregate counters returned by `Seeder::stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub total_scripts: i64,
    pub total_categories: i64,
    pub avg_tokens: f64,
}
