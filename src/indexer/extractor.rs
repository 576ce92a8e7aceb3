//! Extraction contract shared by the grammar-based and pattern-based
//! strategies, plus file and directory drivers built on top of it.
use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::chunk::Chunk;
use super::pattern::PatternExtractor;
use super::syntax::SyntaxExtractor;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no grammar for file: {0}")]
    UnsupportedLanguage(String),

    #[error("grammar load failed: {0}")]
    Grammar(String),

    #[error("failed to parse {0}")]
    Parse(String),
}

/// Turns the content of one source file into an ordered list of chunks.
///
/// Implementations run one dedicated pass per category (functions,
/// components, imports) and concatenate the results in that order. A construct
/// that matches several categories is emitted once per category.
pub trait ChunkExtractor {
    /// Short strategy name for diagnostics.
    fn name(&self) -> &'static str;

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>, ExtractError>;
}

/// Which extraction strategy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Grammar-based when a grammar exists for the file, pattern-based otherwise.
    #[default]
    Auto,
    Syntax,
    Pattern,
}

impl ExtractorKind {
    pub fn build(self) -> Box<dyn ChunkExtractor> {
        match self {
            ExtractorKind::Auto => Box::new(PreferSyntax::default()),
            ExtractorKind::Syntax => Box::new(SyntaxExtractor),
            ExtractorKind::Pattern => Box::new(PatternExtractor::new()),
        }
    }
}

/// Runs the grammar-based extractor and falls back to the pattern-based one
/// when no grammar is available or parsing fails.
#[derive(Default)]
pub struct PreferSyntax {
    syntax: SyntaxExtractor,
    pattern: PatternExtractor,
}

impl ChunkExtractor for PreferSyntax {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>, ExtractError> {
        match self.syntax.extract(content, file_path) {
            Ok(chunks) => Ok(chunks),
            Err(e) => {
                debug!("{file_path}: {e}; falling back to pattern extraction");
                self.pattern.extract(content, file_path)
            }
        }
    }
}

/// Outcome of chunking a directory tree.
#[derive(Debug, Default)]
pub struct DirectoryChunks {
    pub files: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub chunks: Vec<Chunk>,
}

/// Read a file and extract its chunks.
pub fn chunk_file<P: AsRef<Path>>(
    extractor: &dyn ChunkExtractor,
    path: P,
) -> Result<Vec<Chunk>, ExtractError> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().replace('\\', "/");
    let content = fs::read_to_string(path).map_err(|source| ExtractError::Read {
        path: path_str.clone(),
        source,
    })?;
    extractor.extract(&content, &path_str)
}

/// Recursively list files under `root` whose extension is in `extensions`,
/// in lexical order. Ignore files (`.gitignore`, `.ignore`, git excludes)
/// are not consulted.
pub fn collect_source_files<P: AsRef<Path>>(root: P, extensions: &[String]) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root.as_ref())
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    walker
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| extensions.iter().any(|x| x == ext))
        })
        .collect()
}

/// Chunk every matching file under `root`.
///
/// A file that cannot be read or parsed contributes no chunks and is recorded
/// in [`DirectoryChunks::failed`]; traversal continues.
pub fn chunk_directory<P: AsRef<Path>>(
    extractor: &dyn ChunkExtractor,
    root: P,
    extensions: &[String],
) -> DirectoryChunks {
    let mut out = DirectoryChunks {
        files: collect_source_files(root, extensions),
        ..Default::default()
    };

    for path in &out.files {
        debug!("Chunking {} ({})", path.display(), extractor.name());
        match chunk_file(extractor, path) {
            Ok(chunks) => out.chunks.extend(chunks),
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                out.failed.push(path.clone());
            }
        }
    }

    out
}
