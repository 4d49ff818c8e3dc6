//! # scriptdex
//!
//! Script discovery and semantic-search subsystem for an Ubuntu
//! system-administration script library.
//!
//! A metadata/embedding pipeline crawls a source tree, extracts
//! structured metadata from each script ([`analyzer`]), computes vector
//! embeddings for its description ([`embedding`]), and persists them in
//! a remote SQL database with vector support ([`storage`], [`repository`]).
//! A cosine-similarity retrieval layer ([`search`]) ranks candidates by
//! category and score. Two front-ends sit on top of the same retrieval
//! layer: a CLI (`scriptdex`) and a JSON-RPC stdio tool server
//! (`scriptdex-mcp`); a third binary (`scriptdex-seed`) drives indexing.
//!
//! ## Data flow
//!
//! Indexing: directory → [`analyzer`] → metadata → [`seeder`] batches
//! descriptions → [`embedding`] → vectors → [`seeder`] → [`repository`]
//! → [`storage`] → remote store.
//!
//! Retrieval: query → [`embedding`] → query vector; [`repository`] +
//! [`storage`] → candidates; [`search`] → ranked results.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | Typed error taxonomy shared by every component |
//! | [`config`] | Environment-variable configuration, loaded once per process |
//! | [`storage`] | Storage Client: thin adapter over a remote libSQL/Turso database |
//! | [`embedding`] | Embedding Client: remote OpenAI-compatible embeddings, retry/backoff |
//! | [`analyzer`] | Analyzer: description/usage/dependency/tag/category extraction |
//! | [`models`] | Core domain types: `ScriptRecord`, `SearchResult`, `SeedingReport` |
//! | [`repository`] | Repository: CRUD + pagination over the `scripts` table |
//! | [`seeder`] | Seeder: discover → analyze → batch-embed → upsert pipeline |
//! | [`search`] | Vector Search: cosine similarity, category filter, top-N ranking |

pub mod analyzer;
pub mod config;
pub mod embedding;
pub mod error;
pub mod models;
pub mod repository;
pub mod search;
pub mod seeder;
pub mod storage;
