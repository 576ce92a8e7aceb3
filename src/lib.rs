//! # code-indexer: structural code chunking and semantic retrieval
//!
//! Extracts functions, components and imports from TypeScript/JavaScript
//! sources, stores each as an embedded record, and answers similarity and
//! keyword queries over them.
//!
//! ## Architecture
//!
//! - **[`config`]**: JSON configuration loading and validation
//! - **[`db`]**: SQLite + sqlite-vec record store (append, KNN, keyword, stats)
//! - **[`embedder`]**: Embedding providers (OpenAI HTTP API, deterministic mock)
//! - **[`indexer`]**: Chunk extraction (Tree-sitter or line patterns), splitting,
//!   ids, descriptions and the indexing pipeline
//! - **[`retriever`]**: Cosine re-ranking with a threshold, keyword lookup

pub mod config;
pub mod db;
pub mod embedder;
pub mod indexer;
pub mod retriever;
