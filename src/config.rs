/// Configuration module for the code indexer.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::{DEFAULT_TABLE_NAME, StoreOptions, WritePolicy};
use crate::embedder::openai::{DEFAULT_API_BASE, DEFAULT_DIMENSIONS, DEFAULT_MODEL};
use crate::indexer::describe::EmbedText;
use crate::indexer::extractor::ExtractorKind;
use crate::indexer::splitter::{ChunkSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

pub const DEFAULT_CONFIG_PATH: &str = "code-indexer.json";

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ── Default value functions ──────────────────────────────────────────

fn default_db_path() -> String {
    "./code_database.db".to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx"].iter().map(|s| s.to_string()).collect()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_search_limit() -> usize {
    10
}

fn default_search_threshold() -> f32 {
    0.7
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Directory indexed when `index` is run without a path.
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// File extensions (without the dot) picked up during traversal.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Maximum characters per stored part.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default = "default_search_threshold")]
    pub search_threshold: f32,

    #[serde(default)]
    pub extractor: ExtractorKind,

    #[serde(default)]
    pub embed_text: EmbedText,

    #[serde(default)]
    pub write_policy: WritePolicy,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Openai,
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            table_name: default_table_name(),
            source_dir: default_source_dir(),
            extensions: default_extensions(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            search_limit: default_search_limit(),
            search_threshold: default_search_threshold(),
            extractor: ExtractorKind::default(),
            embed_text: EmbedText::default(),
            write_policy: WritePolicy::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            dimensions: default_dimensions(),
            api_base: default_api_base(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_PATH`].
    /// If the file does not exist, returns a default config and generates a
    /// template when the default path was used.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let mut cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");

        // Accept ".ts" as well as "ts"
        for ext in &mut cfg.extensions {
            *ext = ext.trim_start_matches('.').to_string();
        }

        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        anyhow::ensure!(self.search_limit > 0, "search_limit must be positive");
        anyhow::ensure!(
            (-1.0..=1.0).contains(&self.search_threshold),
            "search_threshold must be within [-1, 1]"
        );
        anyhow::ensure!(
            !self.extensions.is_empty(),
            "at least one file extension must be specified"
        );
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(
            !self.table_name.is_empty(),
            "table_name must not be empty"
        );
        Ok(())
    }

    #[must_use]
    pub fn splitter(&self) -> ChunkSplitter {
        ChunkSplitter::new(self.chunk_size, self.chunk_overlap)
    }

    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            table_name: self.table_name.clone(),
            dimensions: self.embedding.dimensions,
            embed_text: self.embed_text,
            write_policy: self.write_policy,
        }
    }

    /// API key from, in order: `cli_key`, the config file, `OPENAI_API_KEY`.
    /// Blank values are skipped.
    #[must_use]
    pub fn api_key(&self, cli_key: Option<&str>) -> Option<String> {
        let non_blank = |k: &String| !k.trim().is_empty();
        cli_key
            .map(str::to_string)
            .filter(non_blank)
            .or_else(|| self.embedding.api_key.clone().filter(non_blank))
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(non_blank))
    }
}
